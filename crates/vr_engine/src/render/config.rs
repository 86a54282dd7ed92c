//! Renderer configuration
//!
//! Loaded from TOML at startup or assembled in code through the `with_*`
//! builders. Every field has a sensible mobile default, so a partial file
//! or an empty one is valid.

use serde::{Deserialize, Serialize};

use crate::render::backend::{RenderTextureFormat, RenderTextureInfo};
use crate::render::error::{RenderError, RenderResult};

/// Color format names accepted in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorFormat {
    /// 8-bit RGBA
    Rgba8,
    /// sRGB-encoded 8-bit RGBA
    Srgb8Alpha8,
    /// Half-float RGBA
    Rgba16f,
}

impl From<ColorFormat> for RenderTextureFormat {
    fn from(format: ColorFormat) -> Self {
        match format {
            ColorFormat::Rgba8 => RenderTextureFormat::Rgba8,
            ColorFormat::Srgb8Alpha8 => RenderTextureFormat::Srgb8Alpha8,
            ColorFormat::Rgba16f => RenderTextureFormat::Rgba16f,
        }
    }
}

/// Depth format names accepted in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthFormat {
    /// 24-bit depth
    Depth24,
    /// 24-bit depth with 8-bit stencil
    Depth24Stencil8,
}

impl From<DepthFormat> for RenderTextureFormat {
    fn from(format: DepthFormat) -> Self {
        match format {
            DepthFormat::Depth24 => RenderTextureFormat::Depth24,
            DepthFormat::Depth24Stencil8 => RenderTextureFormat::Depth24Stencil8,
        }
    }
}

/// Renderer startup options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Eye buffer width in pixels
    pub eye_width: u32,
    /// Eye buffer height in pixels
    pub eye_height: u32,
    /// Requested MSAA sample count; 0 or 1 disables multisampling
    pub multisamples: u32,
    /// Keep depth readable after the eye-buffer resolve
    pub resolve_depth: bool,
    /// Eye buffer color format
    pub color_format: ColorFormat,
    /// Eye buffer depth format
    pub depth_format: DepthFormat,
    /// Render both eyes in one pass through layered eye buffers
    pub multiview: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            eye_width: 1024,
            eye_height: 1024,
            multisamples: 4,
            resolve_depth: false,
            color_format: ColorFormat::Rgba8,
            depth_format: DepthFormat::Depth24,
            multiview: false,
        }
    }
}

impl RendererConfig {
    /// Defaults for a mobile headset
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    pub fn from_toml(text: &str) -> RenderResult<Self> {
        toml::from_str(text).map_err(|e| RenderError::Config(e.to_string()))
    }

    /// Serialize to TOML text
    pub fn to_toml(&self) -> RenderResult<String> {
        toml::to_string_pretty(self).map_err(|e| RenderError::Config(e.to_string()))
    }

    /// Set the eye buffer dimensions
    pub fn with_eye_buffer_size(mut self, width: u32, height: u32) -> Self {
        self.eye_width = width;
        self.eye_height = height;
        self
    }

    /// Set the MSAA sample count
    pub fn with_multisamples(mut self, samples: u32) -> Self {
        self.multisamples = samples;
        self
    }

    /// Keep depth readable after the resolve
    pub fn with_resolve_depth(mut self, resolve: bool) -> Self {
        self.resolve_depth = resolve;
        self
    }

    /// Set the eye buffer color format
    pub fn with_color_format(mut self, format: ColorFormat) -> Self {
        self.color_format = format;
        self
    }

    /// Set the eye buffer depth format
    pub fn with_depth_format(mut self, format: DepthFormat) -> Self {
        self.depth_format = format;
        self
    }

    /// Enable or disable single-pass stereo
    pub fn with_multiview(mut self, multiview: bool) -> Self {
        self.multiview = multiview;
        self
    }

    /// Creation parameters for the per-eye render targets
    pub fn render_texture_info(&self) -> RenderTextureInfo {
        RenderTextureInfo {
            width: self.eye_width,
            height: self.eye_height,
            multisamples: self.multisamples,
            resolve_depth: self.resolve_depth,
            format: self.color_format.into(),
            depth_format: self.depth_format.into(),
            layers: if self.multiview { 2 } else { 1 },
        }
    }
}
