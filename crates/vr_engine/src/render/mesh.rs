//! Mesh geometry and per-program vertex array objects
//!
//! A mesh owns one interleaved vertex store, an optional index store, and
//! optional skinning data. Attribute locations differ between linked
//! programs, so the mesh keeps one VAO per program, all sharing the same
//! underlying buffer objects. Replacing the index store or adding bone data
//! bumps a generation counter that invalidates every cached VAO at once.
//!
//! Bone attributes live in their own buffer so re-uploading animated
//! weights never touches the static geometry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use log::warn;

use crate::foundation::math::{Mat4, Vec3};
use crate::render::backend::{
    AttributeType, BufferId, BufferTarget, BufferUsage, DeleterHandle, DrawMode, GlApi,
    GlProgram, ProgramId, VertexArrayId,
};
use crate::render::error::{RenderError, RenderResult};
use crate::render::index_buffer::IndexBuffer;
use crate::render::vertex_buffer::VertexBuffer;
use crate::spatial::BoundingVolume;

/// Bone influences per vertex
pub const BONES_PER_VERTEX: usize = 4;
/// Maximum bones addressable by one mesh
pub const MAX_BONES: usize = 60;

const BONE_INDICES_ATTR: &str = "a_bone_indices";
const BONE_WEIGHTS_ATTR: &str = "a_bone_weights";

struct BoneData {
    // Interleaved per vertex: 4 indices then 4 weights
    indices: Vec<i32>,
    weights: Vec<f32>,
    vbo: BufferId,
    allocated: bool,
    dirty: bool,
}

struct VaoCache {
    // Generation each VAO was built against
    vaos: HashMap<ProgramId, (VertexArrayId, u64)>,
}

/// Renderable geometry
pub struct Mesh {
    vertices: VertexBuffer,
    indices: Mutex<Option<IndexBuffer>>,
    bones: Mutex<Option<BoneData>>,
    cache: Mutex<VaoCache>,
    generation: AtomicU64,
    bounds: Mutex<Option<BoundingVolume>>,
    deleter: DeleterHandle,
}

impl Mesh {
    /// Create an empty mesh with the given vertex layout descriptor
    pub fn new(descriptor: &str, deleter: DeleterHandle) -> RenderResult<Self> {
        Ok(Self {
            vertices: VertexBuffer::new(descriptor, deleter.clone())?,
            indices: Mutex::new(None),
            bones: Mutex::new(None),
            cache: Mutex::new(VaoCache {
                vaos: HashMap::new(),
            }),
            generation: AtomicU64::new(0),
            bounds: Mutex::new(None),
            deleter,
        })
    }

    /// The vertex store
    pub fn vertices(&self) -> &VertexBuffer {
        &self.vertices
    }

    /// Store vertex positions (`a_position`, float3)
    pub fn set_positions(&self, positions: &[f32]) -> RenderResult<()> {
        self.set_float_vec("a_position", positions, 0)
    }

    /// Store vertex normals (`a_normal`, float3)
    pub fn set_normals(&self, normals: &[f32]) -> RenderResult<()> {
        self.set_float_vec("a_normal", normals, 0)
    }

    /// Store texture coordinates (`a_texcoord`, float2)
    pub fn set_tex_coords(&self, uvs: &[f32]) -> RenderResult<()> {
        self.set_float_vec("a_texcoord", uvs, 0)
    }

    /// Store float data for any declared attribute
    pub fn set_float_vec(&self, name: &str, src: &[f32], src_stride: usize) -> RenderResult<()> {
        self.vertices.set_float_vec(name, src, src_stride)?;
        if name == "a_position" {
            *self.lock(&self.bounds) = None;
        }
        Ok(())
    }

    /// Store integer data for any declared attribute
    pub fn set_int_vec(&self, name: &str, src: &[i32], src_stride: usize) -> RenderResult<()> {
        self.vertices.set_int_vec(name, src, src_stride)
    }

    /// Replace the triangle list with 32-bit indices.
    ///
    /// Invalidates every cached VAO since the element buffer binding is
    /// baked into them.
    pub fn set_triangles(&self, indices: &[u32]) -> RenderResult<()> {
        let ib = IndexBuffer::new(4, self.deleter.clone())?;
        ib.set_int_vec(indices)?;
        *self.lock(&self.indices) = Some(ib);
        self.generation.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Replace the triangle list with 16-bit indices
    pub fn set_triangles_short(&self, indices: &[u16]) -> RenderResult<()> {
        let ib = IndexBuffer::new(2, self.deleter.clone())?;
        ib.set_short_vec(indices)?;
        *self.lock(&self.indices) = Some(ib);
        self.generation.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Index count, or 0 for non-indexed meshes
    pub fn index_count(&self) -> usize {
        self.lock(&self.indices)
            .as_ref()
            .map_or(0, |ib| ib.index_count())
    }

    /// Elements submitted per draw: index count when indexed, vertex count
    /// otherwise
    pub fn draw_count(&self) -> usize {
        let indexed = self.index_count();
        if indexed > 0 {
            indexed
        } else {
            self.vertices.vertex_count()
        }
    }

    /// Attach skinning data: 4 bone indices and 4 weights per vertex.
    ///
    /// Bone indices must stay below [`MAX_BONES`]; unused influences use
    /// index 0 with weight 0.
    pub fn set_bones(&self, indices: &[i32], weights: &[f32]) -> RenderResult<()> {
        if indices.len() != weights.len() || indices.len() % BONES_PER_VERTEX != 0 {
            return Err(RenderError::BoneData(format!(
                "expected {BONES_PER_VERTEX} indices and weights per vertex, got {} and {}",
                indices.len(),
                weights.len()
            )));
        }
        let vertex_count = indices.len() / BONES_PER_VERTEX;
        let established = self.vertices.vertex_count();
        if established != 0 && vertex_count != established {
            return Err(RenderError::BoneData(format!(
                "bone data covers {vertex_count} vertices, mesh has {established}"
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i < 0 || i as usize >= MAX_BONES) {
            return Err(RenderError::BoneData(format!(
                "bone index {bad} out of range 0..{MAX_BONES}"
            )));
        }

        let mut bones = self.lock(&self.bones);
        let had_bones = bones.is_some();
        let (vbo, allocated) = bones
            .as_ref()
            .map_or((BufferId::NONE, false), |b| (b.vbo, b.allocated));
        *bones = Some(BoneData {
            indices: indices.to_vec(),
            weights: weights.to_vec(),
            vbo,
            allocated,
            dirty: true,
        });
        drop(bones);
        if !had_bones {
            // Existing VAOs lack the bone attribute bindings
            self.generation.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Whether skinning data is attached
    pub fn has_bones(&self) -> bool {
        self.lock(&self.bones).is_some()
    }

    /// Axis-aligned bounds of the position attribute, cached until positions
    /// change
    pub fn bounding_volume(&self) -> RenderResult<BoundingVolume> {
        let mut cached = self.lock(&self.bounds);
        if let Some(bv) = cached.as_ref() {
            return Ok(bv.clone());
        }
        let positions = self.vertices.get_float_vec("a_position")?;
        let mut bv = BoundingVolume::new();
        for p in positions.chunks_exact(3) {
            bv.expand_point(Vec3::new(p[0], p[1], p[2]));
        }
        *cached = Some(bv.clone());
        Ok(bv)
    }

    /// Names of every declared vertex attribute, in layout order
    pub fn attribute_names(&self) -> Vec<String> {
        self.vertices.with_layout(|layout| {
            layout
                .attributes()
                .iter()
                .map(|a| a.name.clone())
                .collect()
        })
    }

    /// Visit each triangle as three vertex indices.
    ///
    /// Indexed meshes walk the index list; non-indexed meshes walk vertices
    /// three at a time.
    pub fn for_each_triangle(&self, mut f: impl FnMut(usize, [u32; 3])) -> RenderResult<()> {
        let indices = self.lock(&self.indices);
        match indices.as_ref() {
            Some(ib) if ib.bytes_per_index() == 2 => {
                for (t, tri) in ib.get_short_vec()?.chunks_exact(3).enumerate() {
                    f(t, [u32::from(tri[0]), u32::from(tri[1]), u32::from(tri[2])]);
                }
            }
            Some(ib) => {
                for (t, tri) in ib.get_int_vec()?.chunks_exact(3).enumerate() {
                    f(t, [tri[0], tri[1], tri[2]]);
                }
            }
            None => {
                let count = self.vertices.vertex_count() as u32;
                for (t, base) in (0..count).step_by(3).enumerate() {
                    if base + 2 < count {
                        f(t, [base, base + 1, base + 2]);
                    }
                }
            }
        }
        Ok(())
    }

    /// Bounds of this mesh after an affine transform, conservatively
    /// re-aligned to the axes
    pub fn transformed_bounding_box(&self, matrix: &Mat4) -> RenderResult<BoundingVolume> {
        let local = self.bounding_volume()?;
        let mut world = BoundingVolume::new();
        world.transform(&local, matrix);
        Ok(world)
    }

    /// Build the 12-triangle box mesh covering this mesh's bounds, used for
    /// picking and debug visualization
    pub fn create_bounding_box(&self) -> RenderResult<Mesh> {
        let bv = self.bounding_volume()?;
        let (min, max) = (bv.min_corner(), bv.max_corner());

        let box_mesh = Mesh::new("a_position:3", self.deleter.clone())?;
        let corners = [
            [min.x, min.y, min.z],
            [max.x, min.y, min.z],
            [max.x, max.y, min.z],
            [min.x, max.y, min.z],
            [min.x, min.y, max.z],
            [max.x, min.y, max.z],
            [max.x, max.y, max.z],
            [min.x, max.y, max.z],
        ];
        box_mesh.set_positions(&corners.concat())?;
        box_mesh.set_triangles_short(&[
            0, 2, 1, 0, 3, 2, // back
            4, 5, 6, 4, 6, 7, // front
            0, 1, 5, 0, 5, 4, // bottom
            3, 6, 2, 3, 7, 6, // top
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
        ])?;
        Ok(box_mesh)
    }

    /// Bind the VAO for `program` and submit one draw.
    ///
    /// Render thread only.
    pub fn draw(&self, gl: &dyn GlApi, program: &GlProgram, mode: DrawMode) -> RenderResult<()> {
        self.bind_vao(gl, program)?;
        let indexed = self
            .lock(&self.indices)
            .as_ref()
            .map(|ib| (ib.index_count(), ib.bytes_per_index()));
        match indexed {
            Some((count, width)) => gl.draw_elements(mode, count, width),
            None => gl.draw_arrays(mode, self.vertices.vertex_count()),
        }
        Ok(())
    }

    /// Bind the VAO for `program` and submit one instanced draw, used by
    /// the batching path.
    ///
    /// Render thread only.
    pub fn draw_instanced(
        &self,
        gl: &dyn GlApi,
        program: &GlProgram,
        mode: DrawMode,
        instances: usize,
    ) -> RenderResult<()> {
        self.bind_vao(gl, program)?;
        let indexed = self
            .lock(&self.indices)
            .as_ref()
            .map(|ib| (ib.index_count(), ib.bytes_per_index()));
        match indexed {
            Some((count, width)) => gl.draw_elements_instanced(mode, count, width, instances),
            None => gl.draw_arrays(mode, self.vertices.vertex_count()),
        }
        Ok(())
    }

    /// Bind the VAO for `program`, building it on first use.
    ///
    /// Uploads any dirty buffer data first. Render thread only.
    pub fn bind_vao(&self, gl: &dyn GlApi, program: &GlProgram) -> RenderResult<VertexArrayId> {
        let vbo = self.vertices.update_gpu(gl)?;
        let indices = self.lock(&self.indices);
        let ibo = match indices.as_ref() {
            Some(ib) => Some(ib.update_gpu(gl)?),
            None => None,
        };
        self.upload_bones(gl);

        let generation = self.generation.load(Ordering::Relaxed);
        let mut cache = self.lock(&self.cache);
        if let Some(&(vao, built)) = cache.vaos.get(&program.id()) {
            if built == generation {
                gl.bind_vertex_array(vao);
                return Ok(vao);
            }
            self.deleter.queue_vertex_array(vao);
        }

        let vao = gl.gen_vertex_array();
        gl.bind_vertex_array(vao);
        gl.bind_buffer(BufferTarget::Array, vbo);
        self.bind_attributes(gl, program);
        if let Some(ibo) = ibo {
            gl.bind_buffer(BufferTarget::ElementArray, ibo);
        }
        cache.vaos.insert(program.id(), (vao, generation));
        Ok(vao)
    }

    fn bind_attributes(&self, gl: &dyn GlApi, program: &GlProgram) {
        let bones = self.lock(&self.bones);
        let stride = self.vertices.with_layout(|l| l.vertex_byte_size());

        for active in program.active_attributes(gl) {
            if active.name == BONE_INDICES_ATTR || active.name == BONE_WEIGHTS_ATTR {
                continue;
            }
            let found = self.vertices.with_layout(|layout| {
                layout
                    .find(&active.name)
                    .map(|a| (a.offset, a.size, a.is_int))
            });
            match found {
                Some((offset, size, is_int)) => {
                    gl.enable_vertex_attrib_array(active.location);
                    gl.vertex_attrib_pointer(
                        active.location,
                        size as u32,
                        is_int || active.ty == AttributeType::Int,
                        stride,
                        offset * 4,
                    );
                }
                None => {
                    warn!(
                        "shader attribute {:?} has no data in mesh layout {:?}",
                        active.name,
                        self.vertices.descriptor()
                    );
                }
            }
        }

        if let Some(bone_data) = bones.as_ref() {
            // 4 ints then 4 floats per vertex
            let bone_stride = BONES_PER_VERTEX * 8;
            gl.bind_buffer(BufferTarget::Array, bone_data.vbo);
            for active in program.active_attributes(gl) {
                if active.name == BONE_INDICES_ATTR {
                    gl.enable_vertex_attrib_array(active.location);
                    gl.vertex_attrib_pointer(
                        active.location,
                        BONES_PER_VERTEX as u32,
                        true,
                        bone_stride,
                        0,
                    );
                } else if active.name == BONE_WEIGHTS_ATTR {
                    gl.enable_vertex_attrib_array(active.location);
                    gl.vertex_attrib_pointer(
                        active.location,
                        BONES_PER_VERTEX as u32,
                        false,
                        bone_stride,
                        BONES_PER_VERTEX * 4,
                    );
                }
            }
        }
    }

    fn upload_bones(&self, gl: &dyn GlApi) {
        let mut bones = self.lock(&self.bones);
        if let Some(bone_data) = bones.as_mut() {
            if !bone_data.vbo.is_valid() {
                bone_data.vbo = gl.gen_buffer();
            }
            if bone_data.dirty {
                let vertex_count = bone_data.indices.len() / BONES_PER_VERTEX;
                let mut blob: Vec<u32> = Vec::with_capacity(vertex_count * BONES_PER_VERTEX * 2);
                for v in 0..vertex_count {
                    let base = v * BONES_PER_VERTEX;
                    for c in 0..BONES_PER_VERTEX {
                        blob.push(bone_data.indices[base + c] as u32);
                    }
                    for c in 0..BONES_PER_VERTEX {
                        blob.push(bone_data.weights[base + c].to_bits());
                    }
                }
                gl.bind_buffer(BufferTarget::Array, bone_data.vbo);
                if bone_data.allocated {
                    // Same vertex count since creation, reuse the storage
                    gl.buffer_sub_data(BufferTarget::Array, 0, bytemuck::cast_slice(&blob));
                } else {
                    gl.buffer_data(
                        BufferTarget::Array,
                        bytemuck::cast_slice(&blob),
                        BufferUsage::Dynamic,
                    );
                    bone_data.allocated = true;
                }
                bone_data.dirty = false;
            }
        }
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        for (vao, _) in self.lock(&self.cache).vaos.values() {
            self.deleter.queue_vertex_array(*vao);
        }
        if let Some(bones) = self.lock(&self.bones).as_ref() {
            if bones.vbo.is_valid() {
                self.deleter.queue_buffer(bones.vbo);
            }
        }
    }
}
