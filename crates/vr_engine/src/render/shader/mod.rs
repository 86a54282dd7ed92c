//! Shader sources, feature-keyed variants, and the shader registry

pub mod draw;
pub mod features;
pub mod manager;
pub mod source;
pub mod variant;

pub use draw::{DrawUniforms, LightState, MaterialLighting};
pub use features::ShaderFeatures;
pub use manager::{ShaderKey, ShaderManager};
pub use source::ShaderSource;
pub use variant::{LightLocations, ShaderVariant, UniformTable, VariantCache};
