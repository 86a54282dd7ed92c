//! Error types for the rendering core
//!
//! CPU-side data errors are always reported through [`RenderError`] rather
//! than panics or sentinel values; callers decide whether to skip the
//! operation, retry next frame, or substitute a fallback.

use thiserror::Error;

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors produced by the rendering core
#[derive(Debug, Error)]
pub enum RenderError {
    /// A named vertex attribute does not exist in the buffer layout
    #[error("attribute {0:?} not found in vertex buffer")]
    AttributeNotFound(String),

    /// A source or destination array length does not match the buffer
    #[error("size mismatch for {name:?}: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Attribute or buffer name
        name: String,
        /// Element count the buffer requires
        expected: usize,
        /// Element count the caller supplied
        actual: usize,
    },

    /// Index element width other than 2 or 4 bytes
    #[error("invalid index size {0}, must be 2 or 4 bytes")]
    InvalidIndexSize(usize),

    /// A buffer's element count was set a second time with a new value
    #[error("cannot change size of buffer from {current} to {requested} elements")]
    AlreadySized {
        /// Count established at first allocation
        current: usize,
        /// Conflicting count requested later
        requested: usize,
    },

    /// A supplied source stride is smaller than the attribute it feeds
    #[error("stride {stride} too small for attribute {name:?} of size {required}")]
    StrideTooSmall {
        /// Attribute name
        name: String,
        /// Stride supplied by the caller, in elements
        stride: usize,
        /// Minimum stride the attribute requires, in elements
        required: usize,
    },

    /// The element type of a typed accessor does not match the buffer
    #[error("element type mismatch for {0:?}")]
    TypeMismatch(String),

    /// A vertex layout descriptor could not be parsed
    #[error("malformed layout descriptor: {0}")]
    BadDescriptor(String),

    /// A GPU handle was the zero sentinel or otherwise unusable
    #[error("invalid GPU handle")]
    InvalidHandle,

    /// Shader stage compilation failed; contains the driver's info log
    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    /// Program linking failed; contains the driver's info log
    #[error("program link failed: {0}")]
    ShaderLink(String),

    /// A resource is still loading; retry next frame, not an error to log
    #[error("resource not ready")]
    NotReady,

    /// A framebuffer did not reach completeness
    #[error("framebuffer incomplete: status {0:#x}")]
    FramebufferIncomplete(u32),

    /// The platform swap-chain allocation failed
    #[error("swap chain creation failed: {0}")]
    SwapChain(String),

    /// Bone data exceeded the limits of the skinning pipeline
    #[error("bone data invalid: {0}")]
    BoneData(String),

    /// Renderer configuration could not be parsed
    #[error("configuration error: {0}")]
    Config(String),
}
