//! Triangle index storage
//!
//! Indices are either 16-bit or 32-bit, fixed at construction; any other
//! width is rejected. Like the vertex store, the element count is
//! established by the first upload and immutable afterwards, and the GPU
//! buffer is created lazily on the render thread.

use std::sync::Mutex;

use crate::render::backend::{BufferId, BufferTarget, BufferUsage, DeleterHandle, GlApi};
use crate::render::error::{RenderError, RenderResult};

enum IndexData {
    Empty,
    Short(Vec<u16>),
    Int(Vec<u32>),
}

struct State {
    data: IndexData,
    ibo: BufferId,
    dirty: bool,
}

/// Index store backing indexed draws
pub struct IndexBuffer {
    bytes_per_index: usize,
    state: Mutex<State>,
    deleter: DeleterHandle,
}

impl IndexBuffer {
    /// Create an empty buffer; `bytes_per_index` must be 2 or 4
    pub fn new(bytes_per_index: usize, deleter: DeleterHandle) -> RenderResult<Self> {
        if bytes_per_index != 2 && bytes_per_index != 4 {
            return Err(RenderError::InvalidIndexSize(bytes_per_index));
        }
        Ok(Self {
            bytes_per_index,
            state: Mutex::new(State {
                data: IndexData::Empty,
                ibo: BufferId::NONE,
                dirty: false,
            }),
            deleter,
        })
    }

    /// Width of one index in bytes, 2 or 4
    pub fn bytes_per_index(&self) -> usize {
        self.bytes_per_index
    }

    /// Established index count, or 0 before any data is stored
    pub fn index_count(&self) -> usize {
        match &self.lock().data {
            IndexData::Empty => 0,
            IndexData::Short(v) => v.len(),
            IndexData::Int(v) => v.len(),
        }
    }

    /// Store 16-bit indices; the buffer must have been created 2 bytes wide
    pub fn set_short_vec(&self, indices: &[u16]) -> RenderResult<()> {
        if self.bytes_per_index != 2 {
            return Err(RenderError::TypeMismatch("indices".to_owned()));
        }
        let mut state = self.lock();
        Self::check_count(&state.data, indices.len())?;
        state.data = IndexData::Short(indices.to_vec());
        state.dirty = true;
        Ok(())
    }

    /// Store 32-bit indices; the buffer must have been created 4 bytes wide
    pub fn set_int_vec(&self, indices: &[u32]) -> RenderResult<()> {
        if self.bytes_per_index != 4 {
            return Err(RenderError::TypeMismatch("indices".to_owned()));
        }
        let mut state = self.lock();
        Self::check_count(&state.data, indices.len())?;
        state.data = IndexData::Int(indices.to_vec());
        state.dirty = true;
        Ok(())
    }

    fn check_count(data: &IndexData, requested: usize) -> RenderResult<()> {
        let current = match data {
            IndexData::Empty => return Ok(()),
            IndexData::Short(v) => v.len(),
            IndexData::Int(v) => v.len(),
        };
        if current == requested {
            Ok(())
        } else {
            Err(RenderError::AlreadySized { current, requested })
        }
    }

    /// Read 16-bit indices back
    pub fn get_short_vec(&self) -> RenderResult<Vec<u16>> {
        match &self.lock().data {
            IndexData::Short(v) => Ok(v.clone()),
            IndexData::Empty => Err(RenderError::NotReady),
            IndexData::Int(_) => Err(RenderError::TypeMismatch("indices".to_owned())),
        }
    }

    /// Read 32-bit indices back
    pub fn get_int_vec(&self) -> RenderResult<Vec<u32>> {
        match &self.lock().data {
            IndexData::Int(v) => Ok(v.clone()),
            IndexData::Empty => Err(RenderError::NotReady),
            IndexData::Short(_) => Err(RenderError::TypeMismatch("indices".to_owned())),
        }
    }

    /// Upload pending indices, creating the GPU buffer on first use.
    ///
    /// Returns the buffer handle for VAO construction. Render thread only.
    pub fn update_gpu(&self, gl: &dyn GlApi) -> RenderResult<BufferId> {
        let mut state = self.lock();
        if matches!(state.data, IndexData::Empty) {
            return Err(RenderError::NotReady);
        }
        if !state.ibo.is_valid() {
            state.ibo = gl.gen_buffer();
        }
        if state.dirty {
            gl.bind_buffer(BufferTarget::ElementArray, state.ibo);
            let bytes: &[u8] = match &state.data {
                IndexData::Short(v) => bytemuck::cast_slice(v),
                IndexData::Int(v) => bytemuck::cast_slice(v),
                IndexData::Empty => unreachable!(),
            };
            gl.buffer_data(BufferTarget::ElementArray, bytes, BufferUsage::Static);
            state.dirty = false;
        }
        Ok(state.ibo)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for IndexBuffer {
    fn drop(&mut self) {
        let ibo = self.lock().ibo;
        if ibo.is_valid() {
            self.deleter.queue_buffer(ibo);
        }
    }
}
