//! GPU backend abstraction
//!
//! Everything that touches the GL driver goes through the [`GlApi`] trait so
//! the resource-management layers above it can be exercised without a live
//! context. [`GpuContext`] bundles a driver binding with its deferred deleter
//! and is deliberately not `Send`: it must live and die on the thread that
//! owns the GL context.

pub mod api;
pub mod deleter;
pub mod framebuffer;
pub mod program;
pub mod texture;

#[cfg(test)]
pub(crate) mod recording;

pub use api::{
    ActiveAttribute, AttributeType, BufferId, BufferTarget, BufferUsage, DrawMode, FramebufferId,
    GlApi, ProgramId, RenderTextureFormat, RenderbufferId, ShaderId, ShaderKind, SwapChain,
    TextureId, TextureTarget, VertexArrayId,
};
pub use deleter::{DeleterHandle, GlDeleter};
pub use framebuffer::{FrameBufferObject, MsaaMode, RenderTextureInfo};
pub use program::GlProgram;
pub use texture::{FilterMode, GlTexture, TextureParameters, WrapMode};

use std::marker::PhantomData;

/// Owner of a live GL context: the driver binding plus its deferred deleter.
///
/// Not `Send` or `Sync`. Construct it on the render thread and pass it by
/// reference into every operation that issues GL calls. Off-thread owners of
/// GPU resources hold a [`DeleterHandle`] instead.
pub struct GpuContext {
    gl: Box<dyn GlApi>,
    deleter: GlDeleter,
    _not_send: PhantomData<*const ()>,
}

impl GpuContext {
    /// Wrap a driver binding together with a fresh deleter
    pub fn new(gl: Box<dyn GlApi>) -> Self {
        Self {
            gl,
            deleter: GlDeleter::new(),
            _not_send: PhantomData,
        }
    }

    /// The driver binding
    pub fn gl(&self) -> &dyn GlApi {
        self.gl.as_ref()
    }

    /// Cloneable handle for queueing deletions from any thread
    pub fn deleter_handle(&self) -> DeleterHandle {
        self.deleter.handle()
    }

    /// Drain all pending deletions into batched driver calls.
    ///
    /// Call once per frame, between frames, while no deleted handle can still
    /// be bound.
    pub fn process_deletions(&mut self) {
        self.deleter.process_queues(self.gl.as_ref());
    }
}
