//! Shader registry
//!
//! Scene code registers shader sources from any thread and refers to them
//! by [`ShaderKey`] afterwards; keys stay valid until the shader is removed
//! and are never reused for a different shader. Variant compilation happens
//! through [`ShaderManager::with_variant`] on the render thread.

use std::sync::Mutex;

use slotmap::SlotMap;

use super::features::ShaderFeatures;
use super::source::ShaderSource;
use super::variant::{ShaderVariant, VariantCache};
use crate::render::backend::{DeleterHandle, GlApi};
use crate::render::error::{RenderError, RenderResult};

slotmap::new_key_type! {
    /// Stable handle to a registered shader
    pub struct ShaderKey;
}

struct Entry {
    source: ShaderSource,
    variants: VariantCache,
}

/// Thread-safe registry of shader sources and their compiled variants
#[derive(Default)]
pub struct ShaderManager {
    shaders: Mutex<SlotMap<ShaderKey, Entry>>,
}

impl ShaderManager {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shader source and get its key
    pub fn add_shader(&self, source: ShaderSource) -> ShaderKey {
        self.lock().insert(Entry {
            source,
            variants: VariantCache::new(),
        })
    }

    /// Drop a shader and all its compiled variants.
    ///
    /// The programs are released through their wrappers, so deletion is
    /// deferred as usual.
    pub fn remove_shader(&self, key: ShaderKey) {
        self.lock().remove(key);
    }

    /// Number of registered shaders
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run `f` against the variant for `(key, features)`, compiling it
    /// first if needed. Render thread only.
    pub fn with_variant<R>(
        &self,
        gl: &dyn GlApi,
        deleter: &DeleterHandle,
        key: ShaderKey,
        features: ShaderFeatures,
        f: impl FnOnce(&ShaderVariant) -> R,
    ) -> RenderResult<R> {
        let mut shaders = self.lock();
        let entry = shaders.get_mut(key).ok_or(RenderError::InvalidHandle)?;
        let variant = entry
            .variants
            .get_or_compile(gl, deleter, &entry.source, features)?;
        Ok(f(variant))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotMap<ShaderKey, Entry>> {
        self.shaders.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::recording::RecordingGl;
    use crate::render::backend::GlDeleter;

    fn source(name: &str) -> ShaderSource {
        ShaderSource::new(name, "v", "f")
    }

    #[test]
    fn test_keys_are_stable_across_removal() {
        let manager = ShaderManager::new();
        let a = manager.add_shader(source("a"));
        let b = manager.add_shader(source("b"));
        manager.remove_shader(a);

        let c = manager.add_shader(source("c"));
        assert_ne!(a, c);
        assert_ne!(b, c);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_variant_access_through_key() {
        let gl = RecordingGl::new();
        let deleter = GlDeleter::new();
        let manager = ShaderManager::new();
        let key = manager.add_shader(source("unlit"));

        let id = manager
            .with_variant(&gl, &deleter.handle(), key, ShaderFeatures::empty(), |v| {
                v.program().id()
            })
            .unwrap();
        assert!(id.is_valid());

        // Second access hits the cache
        manager
            .with_variant(&gl, &deleter.handle(), key, ShaderFeatures::empty(), |_| ())
            .unwrap();
        assert_eq!(gl.link_count.get(), 1);
    }

    #[test]
    fn test_stale_key_is_rejected() {
        let gl = RecordingGl::new();
        let deleter = GlDeleter::new();
        let manager = ShaderManager::new();
        let key = manager.add_shader(source("gone"));
        manager.remove_shader(key);

        let err = manager
            .with_variant(&gl, &deleter.handle(), key, ShaderFeatures::empty(), |_| ())
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidHandle));
    }

    #[test]
    fn test_removal_releases_programs_deferred() {
        let gl = RecordingGl::new();
        let mut deleter = GlDeleter::new();
        let manager = ShaderManager::new();
        let key = manager.add_shader(source("temp"));
        manager
            .with_variant(&gl, &deleter.handle(), key, ShaderFeatures::LIGHT, |_| ())
            .unwrap();

        manager.remove_shader(key);
        deleter.process_queues(&gl);
        assert_eq!(gl.deleted_programs.borrow().len(), 1);
    }
}
