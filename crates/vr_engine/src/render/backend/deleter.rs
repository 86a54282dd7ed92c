//! Deferred destruction of GPU objects
//!
//! GPU handles are owned by wrapper types that can be dropped on any thread,
//! but the driver only accepts delete calls on the thread that owns the
//! context. Drops therefore queue the raw handle on a channel through a
//! [`DeleterHandle`]; the render thread drains the channel once per frame
//! via [`GlDeleter::process_queues`], issuing at most one batched delete
//! call per object kind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use log::warn;

use super::api::{
    BufferId, FramebufferId, GlApi, ProgramId, RenderbufferId, ShaderId, TextureId, VertexArrayId,
};

enum Pending {
    Buffer(BufferId),
    VertexArray(VertexArrayId),
    Texture(TextureId),
    Program(ProgramId),
    Shader(ShaderId),
    Framebuffer(FramebufferId),
    Renderbuffer(RenderbufferId),
}

/// Cloneable, thread-safe queueing side of the deleter.
///
/// All `queue_*` methods reject the zero sentinel with a warning instead of
/// forwarding it; a zero handle in a drop path means the object was never
/// realized and there is nothing to free.
#[derive(Clone)]
pub struct DeleterHandle {
    tx: Sender<Pending>,
    dirty: Arc<AtomicBool>,
}

impl DeleterHandle {
    fn push(&self, pending: Pending) {
        // The receiver only disappears when the GL context is already gone,
        // at which point the driver has freed everything anyway.
        if self.tx.send(pending).is_ok() {
            self.dirty.store(true, Ordering::Release);
        }
    }

    /// Queue a buffer object for deletion
    pub fn queue_buffer(&self, id: BufferId) {
        if !id.is_valid() {
            warn!("ignoring request to delete invalid buffer handle");
            return;
        }
        self.push(Pending::Buffer(id));
    }

    /// Queue a vertex array object for deletion
    pub fn queue_vertex_array(&self, id: VertexArrayId) {
        if !id.is_valid() {
            warn!("ignoring request to delete invalid vertex array handle");
            return;
        }
        self.push(Pending::VertexArray(id));
    }

    /// Queue a texture object for deletion
    pub fn queue_texture(&self, id: TextureId) {
        if !id.is_valid() {
            warn!("ignoring request to delete invalid texture handle");
            return;
        }
        self.push(Pending::Texture(id));
    }

    /// Queue a linked program for deletion
    pub fn queue_program(&self, id: ProgramId) {
        if !id.is_valid() {
            warn!("ignoring request to delete invalid program handle");
            return;
        }
        self.push(Pending::Program(id));
    }

    /// Queue a shader stage for deletion
    pub fn queue_shader(&self, id: ShaderId) {
        if !id.is_valid() {
            warn!("ignoring request to delete invalid shader handle");
            return;
        }
        self.push(Pending::Shader(id));
    }

    /// Queue a framebuffer object for deletion
    pub fn queue_framebuffer(&self, id: FramebufferId) {
        if !id.is_valid() {
            warn!("ignoring request to delete invalid framebuffer handle");
            return;
        }
        self.push(Pending::Framebuffer(id));
    }

    /// Queue a renderbuffer object for deletion
    pub fn queue_renderbuffer(&self, id: RenderbufferId) {
        if !id.is_valid() {
            warn!("ignoring request to delete invalid renderbuffer handle");
            return;
        }
        self.push(Pending::Renderbuffer(id));
    }
}

/// Receiving side of the deferred deleter; lives on the render thread
pub struct GlDeleter {
    rx: Receiver<Pending>,
    handle: DeleterHandle,
    buffers: Vec<BufferId>,
    vertex_arrays: Vec<VertexArrayId>,
    textures: Vec<TextureId>,
    programs: Vec<ProgramId>,
    shaders: Vec<ShaderId>,
    framebuffers: Vec<FramebufferId>,
    renderbuffers: Vec<RenderbufferId>,
}

impl Default for GlDeleter {
    fn default() -> Self {
        Self::new()
    }
}

impl GlDeleter {
    /// Create a deleter with an empty queue
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            rx,
            handle: DeleterHandle {
                tx,
                dirty: Arc::new(AtomicBool::new(false)),
            },
            buffers: Vec::new(),
            vertex_arrays: Vec::new(),
            textures: Vec::new(),
            programs: Vec::new(),
            shaders: Vec::new(),
            framebuffers: Vec::new(),
            renderbuffers: Vec::new(),
        }
    }

    /// A cloneable queueing handle
    pub fn handle(&self) -> DeleterHandle {
        self.handle.clone()
    }

    /// Drain the queue into at most one batched delete call per kind.
    ///
    /// With nothing pending this is a single relaxed atomic load, cheap
    /// enough to sit in the per-frame loop unconditionally.
    pub fn process_queues(&mut self, gl: &dyn GlApi) {
        if !self.handle.dirty.load(Ordering::Acquire) {
            return;
        }
        self.handle.dirty.store(false, Ordering::Release);

        while let Ok(pending) = self.rx.try_recv() {
            match pending {
                Pending::Buffer(id) => self.buffers.push(id),
                Pending::VertexArray(id) => self.vertex_arrays.push(id),
                Pending::Texture(id) => self.textures.push(id),
                Pending::Program(id) => self.programs.push(id),
                Pending::Shader(id) => self.shaders.push(id),
                Pending::Framebuffer(id) => self.framebuffers.push(id),
                Pending::Renderbuffer(id) => self.renderbuffers.push(id),
            }
        }

        if !self.buffers.is_empty() {
            gl.delete_buffers(&self.buffers);
            self.buffers.clear();
        }
        if !self.vertex_arrays.is_empty() {
            gl.delete_vertex_arrays(&self.vertex_arrays);
            self.vertex_arrays.clear();
        }
        if !self.textures.is_empty() {
            gl.delete_textures(&self.textures);
            self.textures.clear();
        }
        if !self.programs.is_empty() {
            gl.delete_programs(&self.programs);
            self.programs.clear();
        }
        if !self.shaders.is_empty() {
            gl.delete_shaders(&self.shaders);
            self.shaders.clear();
        }
        if !self.framebuffers.is_empty() {
            gl.delete_framebuffers(&self.framebuffers);
            self.framebuffers.clear();
        }
        if !self.renderbuffers.is_empty() {
            gl.delete_renderbuffers(&self.renderbuffers);
            self.renderbuffers.clear();
        }
    }
}
