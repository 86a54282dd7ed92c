//! Shader source templates
//!
//! A [`ShaderSource`] holds one vertex and one fragment template. Variants
//! are produced by prepending the version line, the multiview preamble when
//! requested, and the feature define block; the template bodies are never
//! edited. The pieces are handed to the driver as separate source strings,
//! concatenated at compile time.

use super::features::ShaderFeatures;

const VERSION_LINE: &str = "#version 300 es\n";
const MULTIVIEW_PREAMBLE: &str =
    "#extension GL_OVR_multiview2 : require\nlayout(num_views = 2) in;\n";

/// Named pair of stage templates
#[derive(Debug, Clone)]
pub struct ShaderSource {
    name: String,
    vertex: String,
    fragment: String,
}

impl ShaderSource {
    /// Wrap raw template bodies under a registry name
    pub fn new(
        name: impl Into<String>,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Registry name, used in logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source strings for the vertex stage of a variant, in compile order
    pub fn vertex_sources(&self, features: ShaderFeatures) -> Vec<String> {
        let mut sources = vec![VERSION_LINE.to_owned()];
        if features.contains(ShaderFeatures::MULTIVIEW) {
            sources.push(MULTIVIEW_PREAMBLE.to_owned());
        }
        sources.push(features.defines());
        sources.push(self.vertex.clone());
        sources
    }

    /// Source strings for the fragment stage of a variant, in compile order
    pub fn fragment_sources(&self, features: ShaderFeatures) -> Vec<String> {
        vec![
            VERSION_LINE.to_owned(),
            features.defines(),
            self.fragment.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_line_comes_first() {
        let source = ShaderSource::new("unlit", "void main(){}", "void main(){}");
        let vs = source.vertex_sources(ShaderFeatures::empty());
        assert!(vs[0].starts_with("#version"));
        assert_eq!(vs.last().unwrap(), "void main(){}");
    }

    #[test]
    fn test_multiview_preamble_only_on_vertex_stage() {
        let source = ShaderSource::new("unlit", "v", "f");
        let vs = source.vertex_sources(ShaderFeatures::MULTIVIEW);
        assert!(vs.iter().any(|s| s.contains("GL_OVR_multiview2")));
        let fs = source.fragment_sources(ShaderFeatures::MULTIVIEW);
        assert!(!fs.iter().any(|s| s.contains("GL_OVR_multiview2")));
        assert!(fs.iter().any(|s| s.contains("#define HAS_MULTIVIEW 1")));
    }
}
