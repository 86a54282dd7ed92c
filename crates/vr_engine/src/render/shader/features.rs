//! Shader feature keys
//!
//! A variant of a shader is identified by the set of features compiled into
//! it. The set doubles as the preprocessor interface: every feature maps to
//! a `HAS_*` symbol that is defined or undefined at the top of each stage,
//! so templates stay branch-free at runtime.

use bitflags::bitflags;

bitflags! {
    /// Feature set a shader variant is compiled for
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderFeatures: u32 {
        /// Per-pixel lighting
        const LIGHT = 1 << 0;
        /// Single-pass stereo through `OVR_multiview2`
        const MULTIVIEW = 1 << 1;
        /// Instanced transform arrays for draw-call batching
        const BATCHING = 1 << 2;
        /// Diffuse texture sampling
        const DIFFUSE_TEXTURE = 1 << 3;
        /// Specular texture sampling
        const SPECULAR_TEXTURE = 1 << 4;
        /// GPU skinning with bone matrices
        const SKINNING = 1 << 5;
    }
}

const SYMBOLS: [(ShaderFeatures, &str); 6] = [
    (ShaderFeatures::LIGHT, "HAS_LIGHT"),
    (ShaderFeatures::MULTIVIEW, "HAS_MULTIVIEW"),
    (ShaderFeatures::BATCHING, "HAS_BATCHING"),
    (ShaderFeatures::DIFFUSE_TEXTURE, "HAS_DIFFUSE_TEXTURE"),
    (ShaderFeatures::SPECULAR_TEXTURE, "HAS_SPECULAR_TEXTURE"),
    (ShaderFeatures::SKINNING, "HAS_SKINNING"),
];

impl ShaderFeatures {
    /// Preprocessor block defining or undefining every feature symbol.
    ///
    /// Symbols are emitted in a fixed order so identical feature sets always
    /// produce identical source text.
    pub fn defines(self) -> String {
        let mut out = String::new();
        for (flag, symbol) in SYMBOLS {
            if self.contains(flag) {
                out.push_str("#define ");
                out.push_str(symbol);
                out.push_str(" 1\n");
            } else {
                out.push_str("#undef ");
                out.push_str(symbol);
                out.push('\n');
            }
        }
        out
    }
}
