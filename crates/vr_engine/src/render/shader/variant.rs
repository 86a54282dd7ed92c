//! Compiled shader variants and their uniform tables
//!
//! The cache maps a feature set to an already linked program. Compilation
//! happens at most once per feature set; a failed compile leaves the cache
//! untouched so the next request retries instead of serving a dead entry.

use std::collections::HashMap;

use log::debug;

use super::features::ShaderFeatures;
use super::source::ShaderSource;
use crate::render::backend::{DeleterHandle, GlApi, GlProgram};
use crate::render::error::RenderResult;

/// Locations of the lighting uniforms, reflected only for lit variants
#[derive(Debug, Default)]
pub struct LightLocations {
    /// Model-view matrix, lighting runs in view space
    pub model_view: Option<i32>,
    /// Inverse-transpose model-view for normals
    pub model_view_it: Option<i32>,
    /// Light position in world space
    pub position: Option<i32>,
    /// Ambient light intensity
    pub ambient_intensity: Option<i32>,
    /// Diffuse light intensity
    pub diffuse_intensity: Option<i32>,
    /// Specular light intensity
    pub specular_intensity: Option<i32>,
    /// Material ambient reflectance
    pub material_ambient: Option<i32>,
    /// Material diffuse reflectance
    pub material_diffuse: Option<i32>,
    /// Material specular reflectance
    pub material_specular: Option<i32>,
    /// Material specular exponent
    pub material_specular_exponent: Option<i32>,
}

impl LightLocations {
    fn reflect(gl: &dyn GlApi, program: &GlProgram) -> Self {
        Self {
            model_view: program.uniform_location(gl, "u_mv"),
            model_view_it: program.uniform_location(gl, "u_mv_it"),
            position: program.uniform_location(gl, "u_light_pos"),
            ambient_intensity: program.uniform_location(gl, "u_light_ambient_intensity"),
            diffuse_intensity: program.uniform_location(gl, "u_light_diffuse_intensity"),
            specular_intensity: program.uniform_location(gl, "u_light_specular_intensity"),
            material_ambient: program.uniform_location(gl, "u_material_ambient_color"),
            material_diffuse: program.uniform_location(gl, "u_material_diffuse_color"),
            material_specular: program.uniform_location(gl, "u_material_specular_color"),
            material_specular_exponent: program
                .uniform_location(gl, "u_material_specular_exponent"),
        }
    }
}

/// Uniform locations resolved once after link.
///
/// The transform uniform names depend on the feature set: multiview
/// variants expose per-view arrays and batched variants take their model
/// matrices from an instance array, so the table is reflected per variant,
/// never shared.
#[derive(Debug, Default)]
pub struct UniformTable {
    /// Model matrix, or first element of the batching array
    pub model: Option<i32>,
    /// View matrix, per-view array under multiview
    pub view: Option<i32>,
    /// Projection matrix
    pub projection: Option<i32>,
    /// Premultiplied model-view-projection, per-view array under multiview
    pub mvp: Option<i32>,
    /// Material base color
    pub color: Option<i32>,
    /// Material opacity
    pub opacity: Option<i32>,
    /// First bone matrix, skinning variants only
    pub bone_matrices: Option<i32>,
    /// Diffuse sampler
    pub diffuse_texture: Option<i32>,
    /// Specular sampler
    pub specular_texture: Option<i32>,
    /// Lighting block, lit variants only
    pub light: Option<LightLocations>,
}

impl UniformTable {
    fn reflect(gl: &dyn GlApi, program: &GlProgram, features: ShaderFeatures) -> Self {
        let multiview = features.contains(ShaderFeatures::MULTIVIEW);
        let view_name = if multiview { "u_view_[0]" } else { "u_view" };
        let mvp_name = if multiview { "u_mvp_[0]" } else { "u_mvp" };
        let model_name = if features.contains(ShaderFeatures::BATCHING) {
            "u_matrices[0]"
        } else {
            "u_model"
        };

        Self {
            model: program.uniform_location(gl, model_name),
            view: program.uniform_location(gl, view_name),
            projection: program.uniform_location(gl, "u_proj"),
            mvp: program.uniform_location(gl, mvp_name),
            color: program.uniform_location(gl, "u_color"),
            opacity: program.uniform_location(gl, "u_opacity"),
            bone_matrices: features
                .contains(ShaderFeatures::SKINNING)
                .then(|| program.uniform_location(gl, "u_bone_matrix[0]"))
                .flatten(),
            diffuse_texture: features
                .contains(ShaderFeatures::DIFFUSE_TEXTURE)
                .then(|| program.uniform_location(gl, "u_texture"))
                .flatten(),
            specular_texture: features
                .contains(ShaderFeatures::SPECULAR_TEXTURE)
                .then(|| program.uniform_location(gl, "u_specular_texture"))
                .flatten(),
            light: features
                .contains(ShaderFeatures::LIGHT)
                .then(|| LightLocations::reflect(gl, program)),
        }
    }
}

/// One linked program with its reflected uniforms
pub struct ShaderVariant {
    features: ShaderFeatures,
    program: GlProgram,
    uniforms: UniformTable,
}

impl ShaderVariant {
    /// Feature set this variant was compiled for
    pub fn features(&self) -> ShaderFeatures {
        self.features
    }

    /// The linked program
    pub fn program(&self) -> &GlProgram {
        &self.program
    }

    /// Uniform locations
    pub fn uniforms(&self) -> &UniformTable {
        &self.uniforms
    }
}

/// Feature-keyed variant cache for one shader source
#[derive(Default)]
pub struct VariantCache {
    variants: HashMap<ShaderFeatures, ShaderVariant>,
}

impl VariantCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of compiled variants
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Whether nothing has been compiled yet
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Fetch the variant for `features`, compiling it on first request.
    ///
    /// The entry is inserted only after a successful link; compile and link
    /// errors propagate and the key stays vacant.
    pub fn get_or_compile(
        &mut self,
        gl: &dyn GlApi,
        deleter: &DeleterHandle,
        source: &ShaderSource,
        features: ShaderFeatures,
    ) -> RenderResult<&ShaderVariant> {
        if !self.variants.contains_key(&features) {
            debug!("compiling shader {:?} for {:?}", source.name(), features);
            let vertex = source.vertex_sources(features);
            let fragment = source.fragment_sources(features);
            let program = GlProgram::compile(
                gl,
                deleter,
                &vertex.iter().map(String::as_str).collect::<Vec<_>>(),
                &fragment.iter().map(String::as_str).collect::<Vec<_>>(),
            )?;
            let uniforms = UniformTable::reflect(gl, &program, features);
            self.variants.insert(
                features,
                ShaderVariant {
                    features,
                    program,
                    uniforms,
                },
            );
        }
        Ok(&self.variants[&features])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::recording::RecordingGl;
    use crate::render::backend::GlDeleter;
    use crate::render::error::RenderError;

    fn source() -> ShaderSource {
        ShaderSource::new("phong", "void main(){}", "void main(){}")
    }

    #[test]
    fn test_each_feature_set_compiles_once() {
        let gl = RecordingGl::new();
        let deleter = GlDeleter::new();
        let mut cache = VariantCache::new();
        let src = source();

        let key = ShaderFeatures::LIGHT;
        let first = cache
            .get_or_compile(&gl, &deleter.handle(), &src, key)
            .unwrap()
            .program()
            .id();
        let second = cache
            .get_or_compile(&gl, &deleter.handle(), &src, key)
            .unwrap()
            .program()
            .id();

        assert_eq!(first, second);
        assert_eq!(gl.link_count.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_feature_sets_get_distinct_programs() {
        // Scenario: LIGHT|MULTIVIEW and LIGHT are independent variants
        let gl = RecordingGl::new();
        let deleter = GlDeleter::new();
        let mut cache = VariantCache::new();
        let src = source();

        let plain = cache
            .get_or_compile(&gl, &deleter.handle(), &src, ShaderFeatures::LIGHT)
            .unwrap()
            .program()
            .id();
        let multiview = cache
            .get_or_compile(
                &gl,
                &deleter.handle(),
                &src,
                ShaderFeatures::LIGHT | ShaderFeatures::MULTIVIEW,
            )
            .unwrap()
            .program()
            .id();

        assert_ne!(plain, multiview);
        assert_eq!(gl.link_count.get(), 2);

        // Uniform reflection used the per-view names for the multiview one
        let queried = gl.queried_uniforms.borrow();
        assert!(queried.iter().any(|n| n == "u_view"));
        assert!(queried.iter().any(|n| n == "u_view_[0]"));
    }

    #[test]
    fn test_batching_reflects_instance_array() {
        let gl = RecordingGl::new();
        let deleter = GlDeleter::new();
        let mut cache = VariantCache::new();
        cache
            .get_or_compile(&gl, &deleter.handle(), &source(), ShaderFeatures::BATCHING)
            .unwrap();
        assert!(gl
            .queried_uniforms
            .borrow()
            .iter()
            .any(|n| n == "u_matrices[0]"));
    }

    #[test]
    fn test_lit_variants_reflect_the_lighting_block() {
        let gl = RecordingGl::new();
        let deleter = GlDeleter::new();
        let mut cache = VariantCache::new();
        let src = source();

        let lit = cache
            .get_or_compile(&gl, &deleter.handle(), &src, ShaderFeatures::LIGHT)
            .unwrap();
        assert!(lit.uniforms().light.is_some());

        let queried = gl.queried_uniforms.borrow().clone();
        assert!(queried.iter().any(|n| n == "u_light_pos"));
        assert!(queried.iter().any(|n| n == "u_material_specular_exponent"));

        let unlit = cache
            .get_or_compile(&gl, &deleter.handle(), &src, ShaderFeatures::empty())
            .unwrap();
        assert!(unlit.uniforms().light.is_none());
    }

    #[test]
    fn test_failed_compile_is_not_cached() {
        let gl = RecordingGl::new();
        let deleter = GlDeleter::new();
        let mut cache = VariantCache::new();
        let src = source();

        gl.fail_link.set(true);
        let err = cache
            .get_or_compile(&gl, &deleter.handle(), &src, ShaderFeatures::LIGHT)
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, RenderError::ShaderLink(_)));
        assert!(cache.is_empty());

        // Retry succeeds once the driver stops failing
        gl.fail_link.set(false);
        cache
            .get_or_compile(&gl, &deleter.handle(), &src, ShaderFeatures::LIGHT)
            .unwrap();
        assert_eq!(cache.len(), 1);
    }
}
