//! Rendering core: GPU resource lifecycle and draw-state management

pub mod backend;
pub mod config;
pub mod error;
pub mod index_buffer;
pub mod layout;
pub mod mesh;
pub mod render_data;
pub mod shader;
pub mod vertex_buffer;

pub use backend::{DeleterHandle, FrameBufferObject, GlApi, GlDeleter, GpuContext, MsaaMode};
pub use config::{ColorFormat, DepthFormat, RendererConfig};
pub use error::{RenderError, RenderResult};
pub use index_buffer::IndexBuffer;
pub use layout::VertexLayout;
pub use mesh::Mesh;
pub use render_data::{RenderData, RenderMask, RenderPass};
pub use shader::{DrawUniforms, ShaderFeatures, ShaderManager, ShaderSource};
pub use vertex_buffer::VertexBuffer;
