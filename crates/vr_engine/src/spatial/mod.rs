//! Spatial primitives for culling and picking

pub mod bounding_volume;

pub use bounding_volume::BoundingVolume;
