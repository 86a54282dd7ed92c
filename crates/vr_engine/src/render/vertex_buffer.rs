//! Interleaved vertex attribute storage
//!
//! CPU-side staging plus a lazily created GPU buffer. Scene threads fill
//! attributes by name through the `Mutex`-guarded interior; the render
//! thread calls [`VertexBuffer::update_gpu`] to upload when dirty. The
//! vertex count is established by the first store (or an explicit
//! [`VertexBuffer::set_vertex_count`]) and is immutable afterwards.
//!
//! All data lives in one interleaved 32-bit blob; float attributes are
//! stored as bit patterns so integer attributes such as bone indices can
//! share the same storage.

use std::sync::Mutex;

use crate::render::backend::{BufferId, BufferTarget, BufferUsage, DeleterHandle, GlApi};
use crate::render::error::{RenderError, RenderResult};
use crate::render::layout::VertexLayout;

struct State {
    layout: VertexLayout,
    data: Vec<u32>,
    vertex_count: Option<usize>,
    vbo: BufferId,
    dirty: bool,
}

/// Named, interleaved vertex attribute store
pub struct VertexBuffer {
    state: Mutex<State>,
    deleter: DeleterHandle,
}

impl VertexBuffer {
    /// Create an empty buffer with the given layout descriptor
    pub fn new(descriptor: &str, deleter: DeleterHandle) -> RenderResult<Self> {
        Ok(Self {
            state: Mutex::new(State {
                layout: VertexLayout::parse(descriptor)?,
                data: Vec::new(),
                vertex_count: None,
                vbo: BufferId::NONE,
                dirty: false,
            }),
            deleter,
        })
    }

    /// The descriptor the layout was parsed from
    pub fn descriptor(&self) -> String {
        self.lock().layout.descriptor().to_owned()
    }

    /// Established vertex count, or 0 before any data is stored
    pub fn vertex_count(&self) -> usize {
        self.lock().vertex_count.unwrap_or(0)
    }

    /// Whether the named attribute has been filled
    pub fn is_set(&self, name: &str) -> bool {
        self.lock().layout.find(name).is_some_and(|a| a.is_set)
    }

    /// Whether the layout declares the named attribute
    pub fn has_attribute(&self, name: &str) -> bool {
        self.lock().layout.find(name).is_some()
    }

    /// Fix the vertex count before any attribute data arrives.
    ///
    /// The count can be set exactly once; repeating the same value is a
    /// no-op, a different value is rejected.
    pub fn set_vertex_count(&self, count: usize) -> RenderResult<()> {
        let mut state = self.lock();
        Self::establish_count(&mut state, count)
    }

    fn establish_count(state: &mut State, count: usize) -> RenderResult<()> {
        match state.vertex_count {
            None => {
                state.vertex_count = Some(count);
                state.data = vec![0; count * state.layout.stride()];
                Ok(())
            }
            Some(current) if current == count => Ok(()),
            Some(current) => Err(RenderError::AlreadySized {
                current,
                requested: count,
            }),
        }
    }

    /// Store float data for an attribute.
    ///
    /// `src_stride` is the element distance between consecutive vertices in
    /// `src`; 0 means tightly packed. A stride larger than the attribute
    /// imports from interleaved source data, skipping the excess elements.
    pub fn set_float_vec(&self, name: &str, src: &[f32], src_stride: usize) -> RenderResult<()> {
        self.scatter(name, src.len(), src_stride, false, |i| src[i].to_bits())
    }

    /// Store integer data for an attribute declared with the `i` suffix
    pub fn set_int_vec(&self, name: &str, src: &[i32], src_stride: usize) -> RenderResult<()> {
        self.scatter(name, src.len(), src_stride, true, |i| src[i] as u32)
    }

    fn scatter(
        &self,
        name: &str,
        src_len: usize,
        src_stride: usize,
        want_int: bool,
        read: impl Fn(usize) -> u32,
    ) -> RenderResult<()> {
        let mut state = self.lock();
        let attr = state
            .layout
            .find(name)
            .ok_or_else(|| RenderError::AttributeNotFound(name.to_owned()))?;
        if attr.is_int != want_int {
            return Err(RenderError::TypeMismatch(name.to_owned()));
        }
        let (attr_index, offset, size) = (attr.index, attr.offset, attr.size);

        let stride = if src_stride == 0 { size } else { src_stride };
        if stride < size {
            return Err(RenderError::StrideTooSmall {
                name: name.to_owned(),
                stride,
                required: size,
            });
        }
        if src_len % stride != 0 {
            return Err(RenderError::SizeMismatch {
                name: name.to_owned(),
                expected: src_len - src_len % stride,
                actual: src_len,
            });
        }
        let count = src_len / stride;
        match Self::establish_count(&mut state, count) {
            Ok(()) => {}
            Err(RenderError::AlreadySized { current, .. }) => {
                return Err(RenderError::SizeMismatch {
                    name: name.to_owned(),
                    expected: current,
                    actual: count,
                });
            }
            Err(e) => return Err(e),
        }

        let layout_stride = state.layout.stride();
        for v in 0..count {
            let dst = v * layout_stride + offset;
            let src_base = v * stride;
            for c in 0..size {
                state.data[dst + c] = read(src_base + c);
            }
        }
        state.layout.mark_set(attr_index);
        state.dirty = true;
        Ok(())
    }

    /// Gather an attribute back out as floats
    pub fn get_float_vec(&self, name: &str) -> RenderResult<Vec<f32>> {
        self.gather(name, false).map(|raw| {
            raw.into_iter().map(f32::from_bits).collect()
        })
    }

    /// Gather an integer attribute back out
    pub fn get_int_vec(&self, name: &str) -> RenderResult<Vec<i32>> {
        self.gather(name, true)
            .map(|raw| raw.into_iter().map(|b| b as i32).collect())
    }

    fn gather(&self, name: &str, want_int: bool) -> RenderResult<Vec<u32>> {
        let state = self.lock();
        let attr = state
            .layout
            .find(name)
            .ok_or_else(|| RenderError::AttributeNotFound(name.to_owned()))?;
        if attr.is_int != want_int {
            return Err(RenderError::TypeMismatch(name.to_owned()));
        }
        let Some(count) = state.vertex_count else {
            return Err(RenderError::NotReady);
        };

        let stride = state.layout.stride();
        let mut out = Vec::with_capacity(count * attr.size);
        for v in 0..count {
            let base = v * stride + attr.offset;
            out.extend_from_slice(&state.data[base..base + attr.size]);
        }
        Ok(out)
    }

    /// Declaration position, element offset, and component count of an
    /// attribute
    pub fn get_info(&self, name: &str) -> Option<(usize, usize, usize)> {
        self.lock()
            .layout
            .find(name)
            .map(|a| (a.index, a.offset, a.size))
    }

    /// Visit a float attribute vertex by vertex.
    ///
    /// The callback receives the vertex index and that vertex's components.
    /// The lock is held for the whole walk; the callback must not call back
    /// into this buffer.
    pub fn for_each_vertex(
        &self,
        name: &str,
        mut f: impl FnMut(usize, &[f32]),
    ) -> RenderResult<()> {
        let state = self.lock();
        let attr = state
            .layout
            .find(name)
            .ok_or_else(|| RenderError::AttributeNotFound(name.to_owned()))?;
        if attr.is_int {
            return Err(RenderError::TypeMismatch(name.to_owned()));
        }
        let Some(count) = state.vertex_count else {
            return Err(RenderError::NotReady);
        };

        let stride = state.layout.stride();
        let mut scratch = [0.0f32; 4];
        for v in 0..count {
            let base = v * stride + attr.offset;
            for c in 0..attr.size {
                scratch[c] = f32::from_bits(state.data[base + c]);
            }
            f(v, &scratch[..attr.size]);
        }
        Ok(())
    }

    /// Upload pending data, creating the GPU buffer on first use.
    ///
    /// Returns the buffer handle for VAO construction. Render thread only.
    pub fn update_gpu(&self, gl: &dyn GlApi) -> RenderResult<BufferId> {
        let mut state = self.lock();
        if state.vertex_count.is_none() {
            return Err(RenderError::NotReady);
        }
        if !state.vbo.is_valid() {
            state.vbo = gl.gen_buffer();
        }
        if state.dirty {
            gl.bind_buffer(BufferTarget::Array, state.vbo);
            gl.buffer_data(
                BufferTarget::Array,
                bytemuck::cast_slice(&state.data),
                BufferUsage::Static,
            );
            state.dirty = false;
        }
        Ok(state.vbo)
    }

    /// Run `f` with the layout and established vertex count, for VAO setup
    pub(crate) fn with_layout<R>(&self, f: impl FnOnce(&VertexLayout) -> R) -> R {
        f(&self.lock().layout)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // Attribute stores never panic while holding the lock
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        let vbo = self.lock().vbo;
        if vbo.is_valid() {
            self.deleter.queue_buffer(vbo);
        }
    }
}
