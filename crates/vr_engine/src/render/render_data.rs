//! Per-node render state
//!
//! A [`RenderData`] ties a mesh to one or more [`RenderPass`]es plus the
//! fixed-function state the draw needs. Every setter compares before it
//! writes and marks the data dirty only on a real change, so the renderer
//! can skip state rebuilds for untouched nodes. Sorting the opaque and
//! transparent queues goes through the free comparator functions at the
//! bottom of this module.

use std::cmp::Ordering;
use std::sync::Arc;

use bitflags::bitflags;
use slotmap::Key;

use crate::render::mesh::Mesh;
use crate::render::shader::{ShaderFeatures, ShaderKey};

pub use crate::render::backend::DrawMode;

/// Drawn before everything else, writes the stencil mask
pub const RENDERING_ORDER_STENCIL: i32 = 0;
/// Sky and environment geometry
pub const RENDERING_ORDER_BACKGROUND: i32 = 1000;
/// Default bucket for opaque geometry
pub const RENDERING_ORDER_GEOMETRY: i32 = 2000;
/// Alpha-blended geometry, sorted back to front
pub const RENDERING_ORDER_TRANSPARENT: i32 = 3000;
/// Drawn last, on top of the scene
pub const RENDERING_ORDER_OVERLAY: i32 = 4000;

bitflags! {
    /// Which eyes a node is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RenderMask: u32 {
        /// Left eye
        const LEFT = 1;
        /// Right eye
        const RIGHT = 2;
    }
}

/// Opaque reference to a material owned by the application layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u64);

/// Face culling state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullFace {
    /// Cull back faces
    Back,
    /// Cull front faces
    Front,
    /// Draw both sides
    None,
}

/// One material application over the owning node's mesh
#[derive(Debug, Clone)]
pub struct RenderPass {
    material: MaterialHandle,
    cull_face: CullFace,
    shader: Option<ShaderKey>,
    features: ShaderFeatures,
    dirty: bool,
}

impl RenderPass {
    /// New pass over a material, back-face culled by default
    pub fn new(material: MaterialHandle) -> Self {
        Self {
            material,
            cull_face: CullFace::Back,
            shader: None,
            features: ShaderFeatures::empty(),
            dirty: true,
        }
    }

    /// Material drawn by this pass
    pub fn material(&self) -> MaterialHandle {
        self.material
    }

    /// Replace the material
    pub fn set_material(&mut self, material: MaterialHandle) {
        if self.material != material {
            self.material = material;
            self.dirty = true;
        }
    }

    /// Culling state
    pub fn cull_face(&self) -> CullFace {
        self.cull_face
    }

    /// Change the culling state
    pub fn set_cull_face(&mut self, cull_face: CullFace) {
        if self.cull_face != cull_face {
            self.cull_face = cull_face;
            self.dirty = true;
        }
    }

    /// Shader this pass draws with, once assigned
    pub fn shader(&self) -> Option<ShaderKey> {
        self.shader
    }

    /// Feature set the pass requests from its shader
    pub fn features(&self) -> ShaderFeatures {
        self.features
    }

    /// Assign the shader and feature set
    pub fn set_shader(&mut self, shader: ShaderKey, features: ShaderFeatures) {
        if self.shader != Some(shader) || self.features != features {
            self.shader = Some(shader);
            self.features = features;
            self.dirty = true;
        }
    }
}

/// Everything the renderer needs to draw one scene node
pub struct RenderData {
    mesh: Option<Arc<Mesh>>,
    passes: Vec<RenderPass>,
    render_mask: RenderMask,
    rendering_order: i32,
    offset: bool,
    offset_factor: f32,
    offset_units: f32,
    depth_test: bool,
    alpha_blend: bool,
    alpha_to_coverage: bool,
    stencil_test: bool,
    draw_mode: DrawMode,
    camera_distance: f32,
    dirty: bool,
}

impl Default for RenderData {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderData {
    /// Render state with library defaults: both eyes, opaque geometry
    /// bucket, depth-tested triangles
    pub fn new() -> Self {
        Self {
            mesh: None,
            passes: Vec::new(),
            render_mask: RenderMask::LEFT | RenderMask::RIGHT,
            rendering_order: RENDERING_ORDER_GEOMETRY,
            offset: false,
            offset_factor: 0.0,
            offset_units: 0.0,
            depth_test: true,
            alpha_blend: false,
            alpha_to_coverage: false,
            stencil_test: false,
            draw_mode: DrawMode::Triangles,
            camera_distance: 0.0,
            dirty: true,
        }
    }

    /// The mesh drawn by every pass
    pub fn mesh(&self) -> Option<&Arc<Mesh>> {
        self.mesh.as_ref()
    }

    /// Attach the mesh
    pub fn set_mesh(&mut self, mesh: Arc<Mesh>) {
        self.mesh = Some(mesh);
        self.dirty = true;
    }

    /// Append a pass; passes draw in insertion order
    pub fn add_pass(&mut self, pass: RenderPass) {
        self.passes.push(pass);
        self.dirty = true;
    }

    /// All passes
    pub fn passes(&self) -> &[RenderPass] {
        &self.passes
    }

    /// Mutable access to one pass
    pub fn pass_mut(&mut self, index: usize) -> Option<&mut RenderPass> {
        self.dirty = true;
        self.passes.get_mut(index)
    }

    /// Eye visibility mask
    pub fn render_mask(&self) -> RenderMask {
        self.render_mask
    }

    /// Restrict or widen eye visibility
    pub fn set_render_mask(&mut self, mask: RenderMask) {
        if self.render_mask != mask {
            self.render_mask = mask;
            self.dirty = true;
        }
    }

    /// Sort bucket
    pub fn rendering_order(&self) -> i32 {
        self.rendering_order
    }

    /// Move the node to another sort bucket
    pub fn set_rendering_order(&mut self, order: i32) {
        if self.rendering_order != order {
            self.rendering_order = order;
            self.dirty = true;
        }
    }

    /// Polygon offset state
    pub fn offset(&self) -> bool {
        self.offset
    }

    /// Enable polygon offset with the given factor and units
    pub fn set_offset(&mut self, enabled: bool, factor: f32, units: f32) {
        if self.offset != enabled || self.offset_factor != factor || self.offset_units != units {
            self.offset = enabled;
            self.offset_factor = factor;
            self.offset_units = units;
            self.dirty = true;
        }
    }

    /// Polygon offset factor
    pub fn offset_factor(&self) -> f32 {
        self.offset_factor
    }

    /// Polygon offset units
    pub fn offset_units(&self) -> f32 {
        self.offset_units
    }

    /// Depth test state
    pub fn depth_test(&self) -> bool {
        self.depth_test
    }

    /// Toggle depth testing
    pub fn set_depth_test(&mut self, enabled: bool) {
        if self.depth_test != enabled {
            self.depth_test = enabled;
            self.dirty = true;
        }
    }

    /// Alpha blending state
    pub fn alpha_blend(&self) -> bool {
        self.alpha_blend
    }

    /// Toggle alpha blending
    pub fn set_alpha_blend(&mut self, enabled: bool) {
        if self.alpha_blend != enabled {
            self.alpha_blend = enabled;
            self.dirty = true;
        }
    }

    /// Alpha-to-coverage state
    pub fn alpha_to_coverage(&self) -> bool {
        self.alpha_to_coverage
    }

    /// Toggle alpha-to-coverage
    pub fn set_alpha_to_coverage(&mut self, enabled: bool) {
        if self.alpha_to_coverage != enabled {
            self.alpha_to_coverage = enabled;
            self.dirty = true;
        }
    }

    /// Stencil test state
    pub fn stencil_test(&self) -> bool {
        self.stencil_test
    }

    /// Toggle stencil testing
    pub fn set_stencil_test(&mut self, enabled: bool) {
        if self.stencil_test != enabled {
            self.stencil_test = enabled;
            self.dirty = true;
        }
    }

    /// Primitive mode
    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    /// Change the primitive mode
    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        if self.draw_mode != mode {
            self.draw_mode = mode;
            self.dirty = true;
        }
    }

    /// Eye-space distance used by the transparency sort
    pub fn camera_distance(&self) -> f32 {
        self.camera_distance
    }

    /// Update the eye-space distance. Does not dirty the state hash; the
    /// distance changes every frame and only feeds sorting.
    pub fn set_camera_distance(&mut self, distance: f32) {
        self.camera_distance = distance;
    }

    /// Whether any state changed since the last successful validation
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Check the data is drawable and settle the dirty flag.
    ///
    /// Returns whether the data was already clean going in, so callers can
    /// tell "valid and unchanged" from "valid but needs a state rebuild".
    /// The flag clears only when a mesh is attached, at least one pass
    /// exists, and every pass has a shader assigned; incomplete data stays
    /// dirty.
    pub fn validate(&mut self) -> bool {
        let was_clean = !self.dirty && !self.passes.iter().any(|p| p.dirty);
        let drawable = self.mesh.is_some()
            && !self.passes.is_empty()
            && self.passes.iter().all(|p| p.shader.is_some());
        if drawable {
            self.dirty = false;
            for pass in &mut self.passes {
                pass.dirty = false;
            }
        }
        was_clean
    }
}

/// Bucket comparator: stencil, background, geometry, transparent, overlay
pub fn compare_rendering_order(a: &RenderData, b: &RenderData) -> Ordering {
    a.rendering_order.cmp(&b.rendering_order)
}

/// Back-to-front by camera distance, for the transparent queue
pub fn compare_back_to_front(a: &RenderData, b: &RenderData) -> Ordering {
    b.camera_distance
        .partial_cmp(&a.camera_distance)
        .unwrap_or(Ordering::Equal)
}

/// Front-to-back by camera distance, for early-z in the opaque queue
pub fn compare_front_to_back(a: &RenderData, b: &RenderData) -> Ordering {
    a.camera_distance
        .partial_cmp(&b.camera_distance)
        .unwrap_or(Ordering::Equal)
}

/// Full queue ordering: bucket first, then the first pass's shader and
/// material to limit state changes, then front to back
pub fn compare_state_then_distance(a: &RenderData, b: &RenderData) -> Ordering {
    compare_rendering_order(a, b)
        .then_with(|| {
            let sa = a.passes.first().and_then(|p| p.shader).map(|k| k.data().as_ffi());
            let sb = b.passes.first().and_then(|p| p.shader).map(|k| k.data().as_ffi());
            sa.cmp(&sb)
        })
        .then_with(|| {
            let ma = a.passes.first().map(|p| p.material.0);
            let mb = b.passes.first().map(|p| p.material.0);
            ma.cmp(&mb)
        })
        .then_with(|| compare_front_to_back(a, b))
}
