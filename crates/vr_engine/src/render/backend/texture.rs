//! Texture handle wrapper with lazy realization
//!
//! Textures are constructed on loader threads before a GL context is
//! available to them, so the wrapper defers driver-object creation until the
//! first [`GlTexture::id`] call on the render thread. Dropping the wrapper on
//! any thread queues the handle with the deferred deleter.

use log::warn;

use super::api::{GlApi, TextureId, TextureTarget};
use super::deleter::DeleterHandle;

/// Minification and magnification filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Nearest texel
    Nearest,
    /// Bilinear
    Linear,
    /// Trilinear across mip levels
    LinearMipmapLinear,
}

/// Coordinate wrap behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    /// Clamp to the edge texel
    ClampToEdge,
    /// Tile
    Repeat,
    /// Tile with mirroring
    MirroredRepeat,
}

/// Sampling state applied to a texture object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureParameters {
    /// Minification filter
    pub min_filter: FilterMode,
    /// Magnification filter
    pub mag_filter: FilterMode,
    /// Horizontal wrap
    pub wrap_s: WrapMode,
    /// Vertical wrap
    pub wrap_t: WrapMode,
    /// Maximum anisotropy; 1.0 is the driver default, lower values are
    /// clamped up to it when the wrapper applies the state
    pub anisotropy: f32,
}

impl TextureParameters {
    fn sanitized(mut self) -> Self {
        if self.anisotropy < 1.0 {
            self.anisotropy = 1.0;
        }
        self
    }
}

impl Default for TextureParameters {
    fn default() -> Self {
        Self {
            min_filter: FilterMode::LinearMipmapLinear,
            mag_filter: FilterMode::Linear,
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
            anisotropy: 1.0,
        }
    }
}

enum PendingInit {
    /// Already realized, or wrapping an externally created object
    None,
    /// Generate and apply default sampling state on first use
    InitNoParam,
    /// Generate and apply caller-supplied sampling state on first use
    InitWithParam,
}

/// Owned GL texture object.
///
/// `id()` is the only way to reach the raw handle and performs the one-shot
/// deferred initialization, so a caller can never observe an unconfigured
/// texture.
pub struct GlTexture {
    target: TextureTarget,
    id: TextureId,
    pending: PendingInit,
    params: TextureParameters,
    deleter: DeleterHandle,
}

impl GlTexture {
    /// New texture with default sampling state, realized on first use
    pub fn new(target: TextureTarget, deleter: DeleterHandle) -> Self {
        Self {
            target,
            id: TextureId::NONE,
            pending: PendingInit::InitNoParam,
            params: TextureParameters::default(),
            deleter,
        }
    }

    /// New texture with explicit sampling state, realized on first use
    pub fn with_parameters(
        target: TextureTarget,
        params: TextureParameters,
        deleter: DeleterHandle,
    ) -> Self {
        Self {
            target,
            id: TextureId::NONE,
            pending: PendingInit::InitWithParam,
            params: params.sanitized(),
            deleter,
        }
    }

    /// Adopt an externally created texture object.
    ///
    /// Ownership transfers: the wrapper will queue the handle for deletion
    /// when dropped. No sampling state is touched.
    pub fn from_id(target: TextureTarget, id: TextureId, deleter: DeleterHandle) -> Self {
        if !id.is_valid() {
            warn!("adopting invalid texture handle, texture will never bind");
        }
        Self {
            target,
            id,
            pending: PendingInit::None,
            params: TextureParameters::default(),
            deleter,
        }
    }

    /// Binding target
    pub fn target(&self) -> TextureTarget {
        self.target
    }

    /// Current sampling state
    pub fn parameters(&self) -> &TextureParameters {
        &self.params
    }

    /// The raw handle, realizing the driver object on first call.
    ///
    /// Must run on the render thread.
    pub fn id(&mut self, gl: &dyn GlApi) -> TextureId {
        match self.pending {
            PendingInit::None => {}
            PendingInit::InitNoParam | PendingInit::InitWithParam => {
                self.id = gl.gen_texture();
                gl.bind_texture(self.target, self.id);
                gl.tex_parameters(self.target, &self.params);
                self.pending = PendingInit::None;
            }
        }
        self.id
    }

    /// Replace the sampling state on an already realized texture
    pub fn update_parameters(&mut self, gl: &dyn GlApi, params: TextureParameters) {
        self.params = params.sanitized();
        if matches!(self.pending, PendingInit::None) && self.id.is_valid() {
            gl.bind_texture(self.target, self.id);
            gl.tex_parameters(self.target, &self.params);
        }
    }
}

impl Drop for GlTexture {
    fn drop(&mut self) {
        if self.id.is_valid() {
            self.deleter.queue_texture(self.id);
        }
    }
}
