//! Draw submission through a compiled variant
//!
//! [`ShaderVariant::draw`] is the one place uniform state meets geometry:
//! it binds the program, feeds every location the variant's table resolved,
//! and submits the mesh. Texture-dependent draws are skipped with
//! [`RenderError::NotReady`] until the texture has a live handle, so a
//! frame never samples an unconfigured unit.

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::backend::{DrawMode, GlApi, GlTexture};
use crate::render::error::{RenderError, RenderResult};
use crate::render::mesh::Mesh;

use super::features::ShaderFeatures;
use super::variant::{LightLocations, ShaderVariant};

/// Runtime state of the scene light fed to lit variants
#[derive(Debug, Clone)]
pub struct LightState {
    /// Light position in world space
    pub position: Vec3,
    /// Ambient intensity
    pub ambient_intensity: Vec4,
    /// Diffuse intensity
    pub diffuse_intensity: Vec4,
    /// Specular intensity
    pub specular_intensity: Vec4,
}

/// Material reflectance terms for lit variants
#[derive(Debug, Clone)]
pub struct MaterialLighting {
    /// Ambient reflectance
    pub ambient: Vec4,
    /// Diffuse reflectance
    pub diffuse: Vec4,
    /// Specular reflectance
    pub specular: Vec4,
    /// Specular exponent
    pub specular_exponent: f32,
}

/// Everything one draw call reads.
///
/// `model` holds one matrix, or the whole batch for batched variants;
/// `view` and `mvp` hold one entry per rendered view, two under multiview.
pub struct DrawUniforms<'a> {
    /// Model matrices, one per instance
    pub model: &'a [Mat4],
    /// View matrices, one per rendered view
    pub view: &'a [Mat4],
    /// Projection matrix
    pub projection: &'a Mat4,
    /// Premultiplied model-view-projection, one per rendered view
    pub mvp: &'a [Mat4],
    /// Material base color
    pub color: Vec3,
    /// Material opacity
    pub opacity: f32,
    /// Bone matrices for skinned variants
    pub bones: &'a [Mat4],
    /// Diffuse texture, required when the variant samples one
    pub diffuse_texture: Option<&'a mut GlTexture>,
    /// Specular texture, required when the variant samples one
    pub specular_texture: Option<&'a mut GlTexture>,
    /// Scene light for lit variants
    pub light: Option<LightState>,
    /// Material reflectance for lit variants
    pub material_lighting: Option<MaterialLighting>,
}

impl<'a> DrawUniforms<'a> {
    /// Transforms plus opaque white material defaults
    pub fn new(
        model: &'a [Mat4],
        view: &'a [Mat4],
        projection: &'a Mat4,
        mvp: &'a [Mat4],
    ) -> Self {
        Self {
            model,
            view,
            projection,
            mvp,
            color: Vec3::new(1.0, 1.0, 1.0),
            opacity: 1.0,
            bones: &[],
            diffuse_texture: None,
            specular_texture: None,
            light: None,
            material_lighting: None,
        }
    }
}

impl ShaderVariant {
    /// Bind this variant's program, upload `uniforms`, and submit `mesh`.
    ///
    /// Batched variants with more than one model matrix draw instanced.
    /// Render thread only.
    pub fn draw(
        &self,
        gl: &dyn GlApi,
        mesh: &Mesh,
        mode: DrawMode,
        uniforms: &mut DrawUniforms,
    ) -> RenderResult<()> {
        let table = self.uniforms();
        self.program().bind(gl);

        // Textures first: a texture without a live handle skips the draw
        bind_texture_unit(gl, table.diffuse_texture, uniforms.diffuse_texture.as_deref_mut(), 0)?;
        bind_texture_unit(
            gl,
            table.specular_texture,
            uniforms.specular_texture.as_deref_mut(),
            1,
        )?;

        if let Some(loc) = table.color {
            let c = uniforms.color;
            gl.uniform3f(loc, c.x, c.y, c.z);
        }
        if let Some(loc) = table.opacity {
            gl.uniform1f(loc, uniforms.opacity);
        }
        if let Some(loc) = table.model {
            gl.uniform_matrix4(loc, &flatten(uniforms.model));
        }
        if let Some(loc) = table.view {
            gl.uniform_matrix4(loc, &flatten(uniforms.view));
        }
        if let Some(loc) = table.projection {
            gl.uniform_matrix4(loc, uniforms.projection.as_slice());
        }
        if let Some(loc) = table.mvp {
            gl.uniform_matrix4(loc, &flatten(uniforms.mvp));
        }
        if let Some(light_locs) = &table.light {
            upload_lighting(gl, light_locs, uniforms);
        }
        if let Some(loc) = table.bone_matrices {
            if !uniforms.bones.is_empty() {
                gl.uniform_matrix4(loc, &flatten(uniforms.bones));
            }
        }

        if self.features().contains(ShaderFeatures::BATCHING) && uniforms.model.len() > 1 {
            mesh.draw_instanced(gl, self.program(), mode, uniforms.model.len())
        } else {
            mesh.draw(gl, self.program(), mode)
        }
    }
}

fn bind_texture_unit(
    gl: &dyn GlApi,
    location: Option<i32>,
    texture: Option<&mut GlTexture>,
    unit: u32,
) -> RenderResult<()> {
    let Some(location) = location else {
        return Ok(());
    };
    let texture = texture.ok_or(RenderError::NotReady)?;
    let id = texture.id(gl);
    if !id.is_valid() {
        return Err(RenderError::NotReady);
    }
    gl.active_texture(unit);
    gl.bind_texture(texture.target(), id);
    gl.uniform1i(location, unit as i32);
    Ok(())
}

fn upload_lighting(gl: &dyn GlApi, locs: &LightLocations, uniforms: &DrawUniforms) {
    if let (Some(model), Some(view)) = (uniforms.model.first(), uniforms.view.first()) {
        let mv = view * model;
        if let Some(loc) = locs.model_view {
            gl.uniform_matrix4(loc, mv.as_slice());
        }
        if let (Some(loc), Some(inverse)) = (locs.model_view_it, mv.try_inverse()) {
            gl.uniform_matrix4(loc, inverse.transpose().as_slice());
        }
    }
    if let Some(light) = &uniforms.light {
        set_vec3(gl, locs.position, light.position);
        set_vec4(gl, locs.ambient_intensity, light.ambient_intensity);
        set_vec4(gl, locs.diffuse_intensity, light.diffuse_intensity);
        set_vec4(gl, locs.specular_intensity, light.specular_intensity);
    }
    if let Some(material) = &uniforms.material_lighting {
        set_vec4(gl, locs.material_ambient, material.ambient);
        set_vec4(gl, locs.material_diffuse, material.diffuse);
        set_vec4(gl, locs.material_specular, material.specular);
        if let Some(loc) = locs.material_specular_exponent {
            gl.uniform1f(loc, material.specular_exponent);
        }
    }
}

fn set_vec3(gl: &dyn GlApi, location: Option<i32>, v: Vec3) {
    if let Some(loc) = location {
        gl.uniform3f(loc, v.x, v.y, v.z);
    }
}

fn set_vec4(gl: &dyn GlApi, location: Option<i32>, v: Vec4) {
    if let Some(loc) = location {
        gl.uniform4f(loc, v.x, v.y, v.z, v.w);
    }
}

fn flatten(matrices: &[Mat4]) -> Vec<f32> {
    matrices
        .iter()
        .flat_map(|m| m.as_slice().iter().copied())
        .collect()
}
