//! Native render core for a mobile VR scene-graph engine.
//!
//! The crate covers the GPU-facing half of such an engine: vertex and index
//! stores with named attribute layouts, per-program vertex array caching,
//! feature-keyed shader variant compilation, per-node render state with
//! sortable draw queues, swap-chain-backed eye buffers, and deferred,
//! thread-safe destruction of every GPU object.
//!
//! Driver access goes through the [`render::backend::GlApi`] trait; a
//! [`render::backend::GpuContext`] owns the binding and must stay on the
//! render thread, while the cloneable deleter handle lets resources be
//! dropped anywhere.

pub mod foundation;
pub mod render;
pub mod spatial;

pub use render::backend::GpuContext;
pub use render::config::RendererConfig;
pub use render::error::{RenderError, RenderResult};
pub use render::mesh::Mesh;
pub use render::render_data::RenderData;
pub use render::shader::ShaderManager;
pub use spatial::BoundingVolume;
