//! Shader Program
//!
//! Compiles a vertex and a fragment WGSL source, links them into a program
//! and caches the reflected attribute and uniform locations by name.

use rustc_hash::FxHashMap;

use crate::errors::{GlintError, Result};
use crate::renderer::device::{ActiveVariable, GraphicsDevice, ProgramId, ShaderId, ShaderStage, UniformValue};

#[derive(Debug)]
pub struct ShaderProgram {
    program: Option<ProgramId>,
    attributes: FxHashMap<String, ActiveVariable>,
    uniforms: FxHashMap<String, ActiveVariable>,
}

impl ShaderProgram {
    /// Compiles both stages and links them.
    ///
    /// Every intermediate object is released on failure. On success the
    /// shader objects are released too, only the program stays alive.
    pub fn new(device: &mut dyn GraphicsDevice, vertex_source: &str, fragment_source: &str) -> Result<Self> {
        let vertex = compile_stage(device, ShaderStage::Vertex, vertex_source)?;
        let fragment = match compile_stage(device, ShaderStage::Fragment, fragment_source) {
            Ok(fragment) => fragment,
            Err(e) => {
                device.delete_shader(vertex);
                return Err(e);
            }
        };

        let program = device.create_program();
        let linked = device.link_program(program, vertex, fragment);
        device.delete_shader(vertex);
        device.delete_shader(fragment);

        match linked {
            Ok(true) => {}
            Ok(false) => {
                let log = device.program_info_log(program).unwrap_or_default();
                log::error!("Program link failed:\n{log}");
                device.delete_program(program);
                return Err(GlintError::ProgramLink { log });
            }
            Err(e) => {
                device.delete_program(program);
                return Err(e);
            }
        }

        let attributes = by_name(device.active_attributes(program)?);
        let uniforms = by_name(device.active_uniforms(program)?);
        log::debug!(
            "Linked program {program:?}: {} attributes, {} uniforms",
            attributes.len(),
            uniforms.len()
        );

        Ok(Self {
            program: Some(program),
            attributes,
            uniforms,
        })
    }

    /// The program handle, or `None` once disposed.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<ProgramId> {
        self.program
    }

    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.program.is_none()
    }

    pub fn attribute_location(&self, name: &str) -> Result<u32> {
        self.attributes
            .get(name)
            .map(|a| a.location)
            .ok_or_else(|| GlintError::AttributeNotFound(name.to_string()))
    }

    /// Binding index of uniform `name`.
    pub fn uniform_location(&self, name: &str) -> Result<u32> {
        self.uniform(name).map(|u| u.location)
    }

    pub fn uniform(&self, name: &str) -> Result<&ActiveVariable> {
        self.uniforms
            .get(name)
            .ok_or_else(|| GlintError::UniformNotFound(name.to_string()))
    }

    pub fn attributes(&self) -> impl Iterator<Item = &ActiveVariable> {
        self.attributes.values()
    }

    pub fn uniforms(&self) -> impl Iterator<Item = &ActiveVariable> {
        self.uniforms.values()
    }

    /// Makes this program current.
    pub fn use_program(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let program = self.program.ok_or(GlintError::ProgramUnavailable)?;
        device.use_program(Some(program))
    }

    /// Uploads `value` to uniform `name`, making this program current first
    /// if another one is in use.
    pub fn set_uniform(&self, device: &mut dyn GraphicsDevice, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        let program = self.program.ok_or(GlintError::ProgramUnavailable)?;
        let value = value.into();
        let uniform = self.uniform(name)?;
        if uniform.kind != value.kind() {
            return Err(GlintError::UniformTypeMismatch {
                name: name.to_string(),
                expected: uniform.kind.wgsl_name(),
                actual: value.kind().wgsl_name(),
            });
        }
        if device.objects().current_program() != Some(program) {
            device.use_program(Some(program))?;
        }
        device.set_uniform(uniform.location, value)
    }

    /// Releases the program. Later calls do nothing.
    pub fn dispose(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(program) = self.program.take() {
            device.delete_program(program);
            self.attributes.clear();
            self.uniforms.clear();
        }
    }
}

fn compile_stage(device: &mut dyn GraphicsDevice, stage: ShaderStage, source: &str) -> Result<ShaderId> {
    let shader = device.create_shader(stage, source);
    match device.compile_shader(shader) {
        Ok(true) => Ok(shader),
        Ok(false) => {
            let log = device.shader_info_log(shader).unwrap_or_default();
            log::error!("{stage:?} shader compilation failed:\n{log}");
            device.delete_shader(shader);
            Err(GlintError::ShaderCompilation { stage, log })
        }
        Err(e) => {
            device.delete_shader(shader);
            Err(e)
        }
    }
}

fn by_name(variables: Vec<ActiveVariable>) -> FxHashMap<String, ActiveVariable> {
    variables.into_iter().map(|v| (v.name.clone(), v)).collect()
}
