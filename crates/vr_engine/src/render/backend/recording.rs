//! Recording driver stub for tests
//!
//! Hands out sequential handles, records delete batches and interesting
//! call counts, and lets tests inject compile, link, and completeness
//! failures. No GL context required.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use super::api::{
    ActiveAttribute, BufferId, BufferTarget, BufferUsage, DrawMode, FramebufferId,
    FramebufferTarget, GlApi, ProgramId, RenderTextureFormat, RenderbufferId, ShaderId,
    ShaderKind, SwapChain, TextureId, VertexArrayId, FRAMEBUFFER_COMPLETE,
};
use super::texture::TextureParameters;
use crate::render::error::RenderResult;

#[derive(Default)]
pub(crate) struct RecordingGl {
    next_id: Cell<u32>,

    // delete batches, one inner vec per driver call
    pub deleted_buffers: RefCell<Vec<Vec<u32>>>,
    pub deleted_vertex_arrays: RefCell<Vec<Vec<u32>>>,
    pub deleted_textures: RefCell<Vec<Vec<u32>>>,
    pub deleted_programs: RefCell<Vec<Vec<u32>>>,
    pub deleted_shaders: RefCell<Vec<Vec<u32>>>,
    pub deleted_framebuffers: RefCell<Vec<Vec<u32>>>,
    pub deleted_renderbuffers: RefCell<Vec<Vec<u32>>>,

    pub gen_buffer_count: Cell<u32>,
    pub gen_vertex_array_count: Cell<u32>,
    pub gen_texture_count: Cell<u32>,
    pub buffer_data_count: Cell<u32>,
    pub buffer_sub_data_count: Cell<u32>,
    pub tex_parameter_count: Cell<u32>,
    pub last_tex_parameters: RefCell<Option<TextureParameters>>,
    pub bound_vaos: RefCell<Vec<u32>>,
    pub attrib_pointers: RefCell<Vec<(u32, u32, bool)>>,
    pub draws: RefCell<Vec<(DrawMode, usize, usize)>>,

    pub compile_count: Cell<u32>,
    pub link_count: Cell<u32>,
    pub fail_compile: Cell<bool>,
    pub fail_link: Cell<bool>,
    pub queried_uniforms: RefCell<Vec<String>>,
    uniform_locations: RefCell<HashMap<(u32, String), i32>>,
    pub active_attributes: RefCell<Vec<ActiveAttribute>>,

    pub framebuffer_status: Cell<u32>,
    pub has_msaa_rtt_ext: Cell<bool>,
    pub blit_count: Cell<u32>,
    pub depth_blit_count: Cell<u32>,
    pub invalidate_depth_count: Cell<u32>,
    pub invalidate_color_count: Cell<u32>,
    pub renderbuffer_formats: RefCell<Vec<RenderTextureFormat>>,
    pub created_swap_chains: RefCell<Vec<u64>>,
    pub destroyed_swap_chains: RefCell<Vec<u64>>,

    pub used_programs: RefCell<Vec<u32>>,
    pub bound_textures: RefCell<Vec<u32>>,
    pub active_texture_units: RefCell<Vec<u32>>,
    pub int_uniforms: RefCell<Vec<(i32, i32)>>,
    pub float_uniforms: RefCell<Vec<(i32, f32)>>,
    pub vec3_uniforms: RefCell<Vec<(i32, [f32; 3])>>,
    pub vec4_uniforms: RefCell<Vec<(i32, [f32; 4])>>,
    // (location, float count) per matrix upload
    pub matrix_uniforms: RefCell<Vec<(i32, usize)>>,
}

impl RecordingGl {
    pub fn new() -> Self {
        let gl = Self::default();
        gl.framebuffer_status.set(FRAMEBUFFER_COMPLETE);
        gl
    }

    fn next(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn make_chain(&self, buffer_count: usize) -> SwapChain {
        let handle = u64::from(self.next());
        self.created_swap_chains.borrow_mut().push(handle);
        SwapChain {
            handle,
            images: (0..buffer_count).map(|_| TextureId(self.next())).collect(),
        }
    }
}

impl GlApi for RecordingGl {
    fn gen_buffer(&self) -> BufferId {
        self.gen_buffer_count.set(self.gen_buffer_count.get() + 1);
        BufferId(self.next())
    }

    fn bind_buffer(&self, _target: BufferTarget, _buffer: BufferId) {}

    fn buffer_data(&self, _target: BufferTarget, _data: &[u8], _usage: BufferUsage) {
        self.buffer_data_count.set(self.buffer_data_count.get() + 1);
    }

    fn buffer_sub_data(&self, _target: BufferTarget, _offset: usize, _data: &[u8]) {
        self.buffer_sub_data_count
            .set(self.buffer_sub_data_count.get() + 1);
    }

    fn delete_buffers(&self, buffers: &[BufferId]) {
        self.deleted_buffers
            .borrow_mut()
            .push(buffers.iter().map(|b| b.0).collect());
    }

    fn gen_vertex_array(&self) -> VertexArrayId {
        self.gen_vertex_array_count
            .set(self.gen_vertex_array_count.get() + 1);
        VertexArrayId(self.next())
    }

    fn bind_vertex_array(&self, vao: VertexArrayId) {
        self.bound_vaos.borrow_mut().push(vao.0);
    }

    fn enable_vertex_attrib_array(&self, _location: u32) {}

    fn vertex_attrib_pointer(
        &self,
        location: u32,
        size: u32,
        integer: bool,
        _stride: usize,
        _offset: usize,
    ) {
        self.attrib_pointers
            .borrow_mut()
            .push((location, size, integer));
    }

    fn draw_arrays(&self, mode: DrawMode, count: usize) {
        self.draws.borrow_mut().push((mode, count, 1));
    }

    fn draw_elements(&self, mode: DrawMode, count: usize, _bytes_per_index: usize) {
        self.draws.borrow_mut().push((mode, count, 1));
    }

    fn draw_elements_instanced(
        &self,
        mode: DrawMode,
        count: usize,
        _bytes_per_index: usize,
        instances: usize,
    ) {
        self.draws.borrow_mut().push((mode, count, instances));
    }

    fn delete_vertex_arrays(&self, vaos: &[VertexArrayId]) {
        self.deleted_vertex_arrays
            .borrow_mut()
            .push(vaos.iter().map(|v| v.0).collect());
    }

    fn gen_texture(&self) -> TextureId {
        self.gen_texture_count.set(self.gen_texture_count.get() + 1);
        TextureId(self.next())
    }

    fn bind_texture(&self, _target: super::api::TextureTarget, texture: TextureId) {
        self.bound_textures.borrow_mut().push(texture.0);
    }

    fn active_texture(&self, unit: u32) {
        self.active_texture_units.borrow_mut().push(unit);
    }

    fn tex_parameters(&self, _target: super::api::TextureTarget, params: &TextureParameters) {
        self.tex_parameter_count
            .set(self.tex_parameter_count.get() + 1);
        *self.last_tex_parameters.borrow_mut() = Some(*params);
    }

    fn delete_textures(&self, textures: &[TextureId]) {
        self.deleted_textures
            .borrow_mut()
            .push(textures.iter().map(|t| t.0).collect());
    }

    fn create_shader(&self, _kind: ShaderKind) -> ShaderId {
        ShaderId(self.next())
    }

    fn shader_source(&self, _shader: ShaderId, _sources: &[&str]) {}

    fn compile_shader(&self, _shader: ShaderId) -> bool {
        self.compile_count.set(self.compile_count.get() + 1);
        !self.fail_compile.get()
    }

    fn shader_info_log(&self, _shader: ShaderId) -> String {
        "0:1: synthetic compile error".to_owned()
    }

    fn create_program(&self) -> ProgramId {
        ProgramId(self.next())
    }

    fn attach_shader(&self, _program: ProgramId, _shader: ShaderId) {}

    fn link_program(&self, _program: ProgramId) -> bool {
        self.link_count.set(self.link_count.get() + 1);
        !self.fail_link.get()
    }

    fn program_info_log(&self, _program: ProgramId) -> String {
        "synthetic link error".to_owned()
    }

    fn use_program(&self, program: ProgramId) {
        self.used_programs.borrow_mut().push(program.0);
    }

    fn uniform1i(&self, location: i32, value: i32) {
        self.int_uniforms.borrow_mut().push((location, value));
    }

    fn uniform1f(&self, location: i32, value: f32) {
        self.float_uniforms.borrow_mut().push((location, value));
    }

    fn uniform3f(&self, location: i32, x: f32, y: f32, z: f32) {
        self.vec3_uniforms.borrow_mut().push((location, [x, y, z]));
    }

    fn uniform4f(&self, location: i32, x: f32, y: f32, z: f32, w: f32) {
        self.vec4_uniforms
            .borrow_mut()
            .push((location, [x, y, z, w]));
    }

    fn uniform_matrix4(&self, location: i32, values: &[f32]) {
        self.matrix_uniforms
            .borrow_mut()
            .push((location, values.len()));
    }

    fn get_uniform_location(&self, program: ProgramId, name: &str) -> i32 {
        self.queried_uniforms.borrow_mut().push(name.to_owned());
        let mut map = self.uniform_locations.borrow_mut();
        let len = map.len() as i32;
        *map.entry((program.0, name.to_owned())).or_insert(len)
    }

    fn get_active_attributes(&self, _program: ProgramId) -> Vec<ActiveAttribute> {
        self.active_attributes.borrow().clone()
    }

    fn delete_programs(&self, programs: &[ProgramId]) {
        self.deleted_programs
            .borrow_mut()
            .push(programs.iter().map(|p| p.0).collect());
    }

    fn delete_shaders(&self, shaders: &[ShaderId]) {
        self.deleted_shaders
            .borrow_mut()
            .push(shaders.iter().map(|s| s.0).collect());
    }

    fn gen_framebuffer(&self) -> FramebufferId {
        FramebufferId(self.next())
    }

    fn bind_framebuffer(&self, _target: FramebufferTarget, _fbo: FramebufferId) {}

    fn framebuffer_color_texture(&self, _texture: TextureId, _layer: u32) {}

    fn framebuffer_color_texture_multisample(
        &self,
        _texture: TextureId,
        _layer: u32,
        _samples: u32,
    ) {
    }

    fn framebuffer_depth_texture(&self, _texture: TextureId, _layer: u32) {}

    fn gen_renderbuffer(&self) -> RenderbufferId {
        RenderbufferId(self.next())
    }

    fn renderbuffer_storage_multisample(
        &self,
        _rb: RenderbufferId,
        format: RenderTextureFormat,
        _width: u32,
        _height: u32,
        _samples: u32,
    ) {
        self.renderbuffer_formats.borrow_mut().push(format);
    }

    fn framebuffer_color_renderbuffer(&self, _rb: RenderbufferId) {}

    fn framebuffer_depth_renderbuffer(&self, _rb: RenderbufferId) {}

    fn check_framebuffer_status(&self) -> u32 {
        self.framebuffer_status.get()
    }

    fn blit_framebuffer(&self, _width: u32, _height: u32, include_depth: bool) {
        self.blit_count.set(self.blit_count.get() + 1);
        if include_depth {
            self.depth_blit_count.set(self.depth_blit_count.get() + 1);
        }
    }

    fn invalidate_depth(&self) {
        self.invalidate_depth_count
            .set(self.invalidate_depth_count.get() + 1);
    }

    fn invalidate_color(&self) {
        self.invalidate_color_count
            .set(self.invalidate_color_count.get() + 1);
    }

    fn viewport(&self, _width: u32, _height: u32) {}

    fn delete_framebuffers(&self, fbos: &[FramebufferId]) {
        self.deleted_framebuffers
            .borrow_mut()
            .push(fbos.iter().map(|f| f.0).collect());
    }

    fn delete_renderbuffers(&self, rbs: &[RenderbufferId]) {
        self.deleted_renderbuffers
            .borrow_mut()
            .push(rbs.iter().map(|r| r.0).collect());
    }

    fn has_multisampled_render_to_texture(&self) -> bool {
        self.has_msaa_rtt_ext.get()
    }

    fn create_color_swap_chain(
        &self,
        _format: RenderTextureFormat,
        _width: u32,
        _height: u32,
        _layers: u32,
        buffer_count: usize,
    ) -> RenderResult<SwapChain> {
        Ok(self.make_chain(buffer_count))
    }

    fn create_depth_swap_chain(
        &self,
        _format: RenderTextureFormat,
        _width: u32,
        _height: u32,
        _layers: u32,
        buffer_count: usize,
    ) -> RenderResult<SwapChain> {
        Ok(self.make_chain(buffer_count))
    }

    fn destroy_swap_chain(&self, handle: u64) {
        self.destroyed_swap_chains.borrow_mut().push(handle);
    }
}
