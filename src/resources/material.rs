//! Material
//!
//! A material is a [`MaterialDescriptor`] (shader sources plus default
//! uniform values) and, once compiled, the [`ShaderProgram`] built from it.
//! Presets such as [`basic_lit`] are plain functions returning descriptors.
//!
//! Uniform values are not tracked by the material: setting one uploads it
//! through the program immediately.

use glam::{Mat4, Vec3};

use crate::errors::{GlintError, Result};
use crate::renderer::device::{GraphicsDevice, UniformValue};
use crate::resources::shader_program::ShaderProgram;

/// Declarations prepended to vertex bodies when the header is enabled.
pub const VERTEX_HEADER: &str = r"struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}
";

/// Declarations prepended to fragment bodies when the header is enabled.
pub const FRAGMENT_HEADER: &str = r"struct FragmentOutput {
    @location(0) color: vec4<f32>,
}
";

#[derive(Debug, Clone)]
pub struct MaterialDescriptor {
    pub vertex_shader: String,
    pub fragment_shader: String,
    /// Prepend [`VERTEX_HEADER`] / [`FRAGMENT_HEADER`] to the sources.
    pub include_header: bool,
    /// Applied once, right after the program is linked.
    pub uniforms: Vec<(String, UniformValue)>,
}

impl MaterialDescriptor {
    /// Shader bodies written against the standard header.
    pub fn new(vertex_shader: impl Into<String>, fragment_shader: impl Into<String>) -> Self {
        Self {
            vertex_shader: vertex_shader.into(),
            fragment_shader: fragment_shader.into(),
            include_header: true,
            uniforms: Vec::new(),
        }
    }

    /// Complete shader sources, used as given.
    pub fn raw(vertex_shader: impl Into<String>, fragment_shader: impl Into<String>) -> Self {
        Self {
            include_header: false,
            ..Self::new(vertex_shader, fragment_shader)
        }
    }

    #[must_use]
    pub fn with_uniform(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.uniforms.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.uniforms.push((name, value)),
        }
        self
    }

    #[must_use]
    pub fn vertex_source(&self) -> String {
        with_header(self.include_header, VERTEX_HEADER, &self.vertex_shader)
    }

    #[must_use]
    pub fn fragment_source(&self) -> String {
        with_header(self.include_header, FRAGMENT_HEADER, &self.fragment_shader)
    }
}

fn with_header(include: bool, header: &str, body: &str) -> String {
    if include {
        format!("{header}\n{body}")
    } else {
        body.to_string()
    }
}

#[derive(Debug)]
pub struct Material {
    descriptor: MaterialDescriptor,
    program: Option<ShaderProgram>,
}

impl Material {
    #[must_use]
    pub fn new(descriptor: MaterialDescriptor) -> Self {
        Self {
            descriptor,
            program: None,
        }
    }

    /// Shorthand for a [`basic_lit`] material.
    #[must_use]
    pub fn basic_lit(color: Vec3) -> Self {
        Self::new(basic_lit(color))
    }

    #[must_use]
    pub fn descriptor(&self) -> &MaterialDescriptor {
        &self.descriptor
    }

    #[inline]
    #[must_use]
    pub fn is_compiled(&self) -> bool {
        self.program.is_some()
    }

    /// Builds the program and applies the default uniforms. Does nothing if
    /// already compiled.
    pub fn compile(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if self.program.is_some() {
            return Ok(());
        }
        let mut program = ShaderProgram::new(
            device,
            &self.descriptor.vertex_source(),
            &self.descriptor.fragment_source(),
        )?;
        let applied = program.use_program(device).and_then(|()| {
            self.descriptor
                .uniforms
                .iter()
                .try_for_each(|(name, value)| program.set_uniform(device, name, *value))
        });
        if let Err(e) = applied {
            program.dispose(device);
            return Err(e);
        }
        self.program = Some(program);
        Ok(())
    }

    pub fn program(&self) -> Result<&ShaderProgram> {
        self.program.as_ref().ok_or(GlintError::ProgramUnavailable)
    }

    /// Makes the material's program current.
    pub fn activate(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        self.program()?.use_program(device)
    }

    pub fn set_uniform(&self, device: &mut dyn GraphicsDevice, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        self.program()?.set_uniform(device, name, value)
    }

    pub fn set_matrix4(&self, device: &mut dyn GraphicsDevice, name: &str, value: Mat4) -> Result<()> {
        self.set_uniform(device, name, value)
    }

    pub fn set_vector3(&self, device: &mut dyn GraphicsDevice, name: &str, value: Vec3) -> Result<()> {
        self.set_uniform(device, name, value)
    }

    pub fn set_float(&self, device: &mut dyn GraphicsDevice, name: &str, value: f32) -> Result<()> {
        self.set_uniform(device, name, value)
    }

    pub fn set_int(&self, device: &mut dyn GraphicsDevice, name: &str, value: i32) -> Result<()> {
        self.set_uniform(device, name, value)
    }

    /// Releases the program. The descriptor is kept, so the material can be
    /// compiled again.
    pub fn dispose(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(mut program) = self.program.take() {
            program.dispose(device);
        }
    }
}

const BASIC_LIT_VERTEX: &str = r"@group(0) @binding(0) var<uniform> modelMatrix: mat4x4<f32>;
@group(0) @binding(1) var<uniform> viewMatrix: mat4x4<f32>;
@group(0) @binding(2) var<uniform> projectionMatrix: mat4x4<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) world_position: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    let world = modelMatrix * vec4<f32>(input.position, 1.0);
    let normal_matrix = mat3x3<f32>(modelMatrix[0].xyz, modelMatrix[1].xyz, modelMatrix[2].xyz);

    var out: VertexOutput;
    out.clip_position = projectionMatrix * viewMatrix * world;
    out.normal = normal_matrix * input.normal;
    out.uv = input.uv;
    out.world_position = world.xyz;
    return out;
}
";

const BASIC_LIT_FRAGMENT: &str = r"@group(0) @binding(3) var<uniform> color: vec3<f32>;
@group(0) @binding(4) var<uniform> lightPosition: vec3<f32>;

struct FragmentInput {
    @location(0) normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) world_position: vec3<f32>,
}

@fragment
fn fs_main(input: FragmentInput) -> FragmentOutput {
    let n = normalize(input.normal);
    let l = normalize(lightPosition - input.world_position);
    let diffuse = max(dot(n, l), 0.0);

    var out: FragmentOutput;
    out.color = vec4<f32>(color * (0.2 + diffuse), 1.0);
    return out;
}
";

/// Default light position of [`basic_lit`].
pub const DEFAULT_LIGHT_POSITION: Vec3 = Vec3::new(5.0, 5.0, 5.0);

/// Flat `color` lit by one point light at [`DEFAULT_LIGHT_POSITION`]:
/// ambient 0.2 plus Lambert diffuse.
#[must_use]
pub fn basic_lit(color: Vec3) -> MaterialDescriptor {
    MaterialDescriptor::new(BASIC_LIT_VERTEX, BASIC_LIT_FRAGMENT)
        .with_uniform("color", color)
        .with_uniform("lightPosition", DEFAULT_LIGHT_POSITION)
}
