//! Driver-facing trait and handle types
//!
//! [`GlApi`] is the single seam between the engine and the GL driver. It is
//! intentionally narrow: only the entry points the resource layers actually
//! use, with typed handles instead of raw `GLuint`s so a buffer name can
//! never be passed where a texture name is expected. Zero is the invalid
//! sentinel for every handle kind, matching the driver's convention.

use super::texture::TextureParameters;
use crate::render::error::RenderResult;

macro_rules! gl_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub u32);

        impl $name {
            /// The zero sentinel, never a live object
            pub const NONE: Self = Self(0);

            /// True for any handle other than the zero sentinel
            pub fn is_valid(self) -> bool {
                self.0 != 0
            }

            /// Raw driver name
            pub fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

gl_handle!(
    /// Vertex or index buffer object name
    BufferId
);
gl_handle!(
    /// Vertex array object name
    VertexArrayId
);
gl_handle!(
    /// Texture object name
    TextureId
);
gl_handle!(
    /// Linked shader program name
    ProgramId
);
gl_handle!(
    /// Single shader stage name
    ShaderId
);
gl_handle!(
    /// Framebuffer object name
    FramebufferId
);
gl_handle!(
    /// Renderbuffer object name
    RenderbufferId
);

/// Binding point for buffer objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    /// Vertex attribute data
    Array,
    /// Index data
    ElementArray,
}

/// Expected update frequency for buffer storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Uploaded once, drawn many times
    Static,
    /// Re-uploaded frequently
    Dynamic,
}

/// Texture binding targets used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureTarget {
    /// Plain 2D texture
    Tex2d,
    /// Layered 2D array, used for multiview eye buffers
    Tex2dArray,
    /// Cube map
    CubeMap,
    /// Platform external image (camera, video decoder)
    External,
}

/// Shader stage kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
}

/// Framebuffer binding points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferTarget {
    /// Draw binding only
    Draw,
    /// Read binding only
    Read,
    /// Both bindings
    Both,
}

/// Color formats accepted by the platform swap-chain allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTextureFormat {
    /// 8-bit RGBA, the default eye-buffer format
    Rgba8,
    /// sRGB-encoded 8-bit RGBA
    Srgb8Alpha8,
    /// Half-float RGBA for HDR pipelines
    Rgba16f,
    /// 24-bit depth
    Depth24,
    /// 24-bit depth with 8-bit stencil
    Depth24Stencil8,
}

/// Primitive assembly mode for draw calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// Scalar type of a program's active vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    /// `float`, `vecN`
    Float,
    /// `int`, `ivecN`
    Int,
}

/// One active attribute reflected out of a linked program
#[derive(Debug, Clone)]
pub struct ActiveAttribute {
    /// Attribute name as spelled in the shader source
    pub name: String,
    /// Bound location
    pub location: u32,
    /// Component count, 1 to 4
    pub size: u32,
    /// Scalar type
    pub ty: AttributeType,
}

/// A platform-allocated ring of eye-buffer textures.
///
/// The compositor owns the texture storage; the engine only cycles through
/// the ring and renders into the current entry.
#[derive(Debug)]
pub struct SwapChain {
    /// Opaque platform handle, released through
    /// [`GlApi::destroy_swap_chain`]
    pub handle: u64,
    /// Texture for each ring slot, in order
    pub images: Vec<TextureId>,
}

impl SwapChain {
    /// Number of ring slots
    pub fn length(&self) -> usize {
        self.images.len()
    }
}

/// Completeness status returned by [`GlApi::check_framebuffer_status`]
pub const FRAMEBUFFER_COMPLETE: u32 = 0x8CD5;

/// The driver seam.
///
/// Implementations wrap a live GL context; tests substitute a recording
/// stub. Methods take `&self` because the underlying C API is free-threaded
/// per context and implementations keep their own interior state.
pub trait GlApi {
    // --- buffers ---

    /// Generate one buffer object
    fn gen_buffer(&self) -> BufferId;
    /// Bind a buffer to a target; `BufferId::NONE` unbinds
    fn bind_buffer(&self, target: BufferTarget, buffer: BufferId);
    /// Allocate and fill the bound buffer's storage
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    /// Overwrite a range of the bound buffer
    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]);
    /// Delete a batch of buffers in one driver call
    fn delete_buffers(&self, buffers: &[BufferId]);

    // --- vertex arrays ---

    /// Generate one vertex array object
    fn gen_vertex_array(&self) -> VertexArrayId;
    /// Bind a vertex array; `VertexArrayId::NONE` unbinds
    fn bind_vertex_array(&self, vao: VertexArrayId);
    /// Enable an attribute slot on the bound vertex array
    fn enable_vertex_attrib_array(&self, location: u32);
    /// Describe an attribute's layout within the bound array buffer.
    ///
    /// `integer` selects the non-normalizing integer pointer variant.
    fn vertex_attrib_pointer(
        &self,
        location: u32,
        size: u32,
        integer: bool,
        stride: usize,
        offset: usize,
    );
    /// Delete a batch of vertex arrays in one driver call
    fn delete_vertex_arrays(&self, vaos: &[VertexArrayId]);

    // --- draws ---

    /// Non-indexed draw over the bound vertex array
    fn draw_arrays(&self, mode: DrawMode, count: usize);
    /// Indexed draw over the bound vertex array
    fn draw_elements(&self, mode: DrawMode, count: usize, bytes_per_index: usize);
    /// Instanced indexed draw, used by the batching path
    fn draw_elements_instanced(
        &self,
        mode: DrawMode,
        count: usize,
        bytes_per_index: usize,
        instances: usize,
    );

    // --- textures ---

    /// Generate one texture object
    fn gen_texture(&self) -> TextureId;
    /// Bind a texture to a target
    fn bind_texture(&self, target: TextureTarget, texture: TextureId);
    /// Select the texture unit subsequent binds attach to
    fn active_texture(&self, unit: u32);
    /// Apply filter, wrap, and anisotropy state to the bound texture
    fn tex_parameters(&self, target: TextureTarget, params: &TextureParameters);
    /// Delete a batch of textures in one driver call
    fn delete_textures(&self, textures: &[TextureId]);

    // --- shaders and programs ---

    /// Create an empty shader stage object
    fn create_shader(&self, kind: ShaderKind) -> ShaderId;
    /// Replace a stage's source strings
    fn shader_source(&self, shader: ShaderId, sources: &[&str]);
    /// Compile a stage; false on failure
    fn compile_shader(&self, shader: ShaderId) -> bool;
    /// Driver info log for a stage
    fn shader_info_log(&self, shader: ShaderId) -> String;
    /// Create an empty program object
    fn create_program(&self) -> ProgramId;
    /// Attach a compiled stage to a program
    fn attach_shader(&self, program: ProgramId, shader: ShaderId);
    /// Link a program; false on failure
    fn link_program(&self, program: ProgramId) -> bool;
    /// Driver info log for a program
    fn program_info_log(&self, program: ProgramId) -> String;
    /// Make a program current
    fn use_program(&self, program: ProgramId);
    /// Uniform location within a program, or -1 when inactive
    fn get_uniform_location(&self, program: ProgramId, name: &str) -> i32;
    /// Set an integer or sampler uniform on the current program
    fn uniform1i(&self, location: i32, value: i32);
    /// Set a float uniform on the current program
    fn uniform1f(&self, location: i32, value: f32);
    /// Set a vec3 uniform on the current program
    fn uniform3f(&self, location: i32, x: f32, y: f32, z: f32);
    /// Set a vec4 uniform on the current program
    fn uniform4f(&self, location: i32, x: f32, y: f32, z: f32, w: f32);
    /// Upload one or more column-major mat4s starting at `location`.
    ///
    /// `values` holds 16 floats per matrix.
    fn uniform_matrix4(&self, location: i32, values: &[f32]);
    /// Reflect the program's active vertex attributes
    fn get_active_attributes(&self, program: ProgramId) -> Vec<ActiveAttribute>;
    /// Delete a batch of programs in one driver call
    fn delete_programs(&self, programs: &[ProgramId]);
    /// Delete a batch of shader stages in one driver call
    fn delete_shaders(&self, shaders: &[ShaderId]);

    // --- framebuffers ---

    /// Generate one framebuffer object
    fn gen_framebuffer(&self) -> FramebufferId;
    /// Bind a framebuffer; `FramebufferId::NONE` restores the default
    fn bind_framebuffer(&self, target: FramebufferTarget, fbo: FramebufferId);
    /// Attach one layer of a texture as the color attachment
    fn framebuffer_color_texture(&self, texture: TextureId, layer: u32);
    /// Attach one layer of a texture as color, rendered with implicit
    /// multisampling (requires [`GlApi::has_multisampled_render_to_texture`])
    fn framebuffer_color_texture_multisample(&self, texture: TextureId, layer: u32, samples: u32);
    /// Attach one layer of a texture as the depth attachment
    fn framebuffer_depth_texture(&self, texture: TextureId, layer: u32);
    /// Generate one renderbuffer object
    fn gen_renderbuffer(&self) -> RenderbufferId;
    /// Allocate multisampled renderbuffer storage
    fn renderbuffer_storage_multisample(
        &self,
        rb: RenderbufferId,
        format: RenderTextureFormat,
        width: u32,
        height: u32,
        samples: u32,
    );
    /// Attach a renderbuffer as the color attachment
    fn framebuffer_color_renderbuffer(&self, rb: RenderbufferId);
    /// Attach a renderbuffer as the depth attachment
    fn framebuffer_depth_renderbuffer(&self, rb: RenderbufferId);
    /// Completeness status of the bound draw framebuffer
    fn check_framebuffer_status(&self) -> u32;
    /// Copy the read framebuffer into the draw framebuffer, resolving
    /// samples. `include_depth` adds the depth attachment to the copy.
    fn blit_framebuffer(&self, width: u32, height: u32, include_depth: bool);
    /// Hint that the bound framebuffer's depth contents may be discarded
    fn invalidate_depth(&self);
    /// Hint that the bound read framebuffer's color contents may be
    /// discarded
    fn invalidate_color(&self);
    /// Set the viewport to cover the render target
    fn viewport(&self, width: u32, height: u32);
    /// Delete a batch of framebuffers in one driver call
    fn delete_framebuffers(&self, fbos: &[FramebufferId]);
    /// Delete a batch of renderbuffers in one driver call
    fn delete_renderbuffers(&self, rbs: &[RenderbufferId]);

    // --- platform swap chains ---

    /// Whether the implicit multisampled-render-to-texture extension is
    /// available
    fn has_multisampled_render_to_texture(&self) -> bool;
    /// Allocate a compositor-owned ring of color textures
    fn create_color_swap_chain(
        &self,
        format: RenderTextureFormat,
        width: u32,
        height: u32,
        layers: u32,
        buffer_count: usize,
    ) -> RenderResult<SwapChain>;
    /// Allocate a compositor-owned ring of depth textures
    fn create_depth_swap_chain(
        &self,
        format: RenderTextureFormat,
        width: u32,
        height: u32,
        layers: u32,
        buffer_count: usize,
    ) -> RenderResult<SwapChain>;
    /// Release a ring allocated by the compositor
    fn destroy_swap_chain(&self, handle: u64);
}
