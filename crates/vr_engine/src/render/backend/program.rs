//! Compiled shader program wrapper
//!
//! Compilation is all-or-nothing: [`GlProgram::compile`] either returns a
//! fully linked program or an error carrying the driver's info log, with
//! every partially created driver object queued for deletion. Callers never
//! see a half-built program.

use log::error;

use super::api::{ActiveAttribute, GlApi, ProgramId, ShaderKind};
use super::deleter::DeleterHandle;
use crate::render::error::{RenderError, RenderResult};

/// Owned, linked GL shader program
pub struct GlProgram {
    id: ProgramId,
    deleter: DeleterHandle,
}

impl GlProgram {
    /// Compile both stages from concatenated source fragments and link them.
    ///
    /// Each stage receives its `sources` slice in order, letting callers
    /// prepend version and `#define` blocks without string assembly.
    pub fn compile(
        gl: &dyn GlApi,
        deleter: &DeleterHandle,
        vertex_sources: &[&str],
        fragment_sources: &[&str],
    ) -> RenderResult<GlProgram> {
        let vertex = Self::compile_stage(gl, deleter, ShaderKind::Vertex, vertex_sources)?;
        let fragment = match Self::compile_stage(gl, deleter, ShaderKind::Fragment, fragment_sources)
        {
            Ok(id) => id,
            Err(e) => {
                deleter.queue_shader(vertex);
                return Err(e);
            }
        };

        let program = gl.create_program();
        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        let linked = gl.link_program(program);

        // Stages are no longer needed once link has been attempted; the
        // driver keeps the linked binary alive independently.
        deleter.queue_shader(vertex);
        deleter.queue_shader(fragment);

        if !linked {
            let info = gl.program_info_log(program);
            error!("program link failed: {info}");
            deleter.queue_program(program);
            return Err(RenderError::ShaderLink(info));
        }

        Ok(GlProgram {
            id: program,
            deleter: deleter.clone(),
        })
    }

    fn compile_stage(
        gl: &dyn GlApi,
        deleter: &DeleterHandle,
        kind: ShaderKind,
        sources: &[&str],
    ) -> RenderResult<super::api::ShaderId> {
        let shader = gl.create_shader(kind);
        gl.shader_source(shader, sources);
        if gl.compile_shader(shader) {
            return Ok(shader);
        }
        let info = gl.shader_info_log(shader);
        error!("{kind:?} shader compilation failed: {info}");
        deleter.queue_shader(shader);
        Err(RenderError::ShaderCompile(info))
    }

    /// The linked program handle
    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// Make this program current
    pub fn bind(&self, gl: &dyn GlApi) {
        gl.use_program(self.id);
    }

    /// Location of a uniform, or `None` when the linker optimized it out
    pub fn uniform_location(&self, gl: &dyn GlApi, name: &str) -> Option<i32> {
        let loc = gl.get_uniform_location(self.id, name);
        (loc >= 0).then_some(loc)
    }

    /// Reflect the vertex attributes the linker kept active
    pub fn active_attributes(&self, gl: &dyn GlApi) -> Vec<ActiveAttribute> {
        gl.get_active_attributes(self.id)
    }
}

impl Drop for GlProgram {
    fn drop(&mut self) {
        self.deleter.queue_program(self.id);
    }
}
