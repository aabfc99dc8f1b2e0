//! Device seam.
//!
//! [`GraphicsDevice`] is the handle every resource-owning component issues
//! GPU work through. Its shape follows a classic immediate-mode API: objects
//! are created and released explicitly, vertex layouts record which buffer
//! feeds which attribute slot, programs carry their own uniform state, and
//! draw calls consume whatever layout and program are currently bound.
//!
//! Object bookkeeping lives in [`ObjectTable`] and is shared by every backend.
//! Backends only supply buffer storage and the frame operations.

use std::any::Any;

use glam::{Mat4, Vec3};

use crate::errors::Result;
use crate::renderer::objects::{DeviceStats, ObjectTable};

slotmap::new_key_type! {
    /// Vertex layout object handle.
    pub struct VertexLayoutId;
    /// GPU buffer handle.
    pub struct BufferId;
    /// Shader object handle.
    pub struct ShaderId;
    /// Linked program handle.
    pub struct ProgramId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Type of an active attribute or uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl VariableKind {
    #[must_use]
    pub fn components(self) -> u32 {
        match self {
            Self::Float | Self::Int => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
            Self::Mat4 => 16,
        }
    }

    #[must_use]
    pub fn wgsl_name(self) -> &'static str {
        match self {
            Self::Float => "f32",
            Self::Int => "i32",
            Self::Vec2 => "vec2<f32>",
            Self::Vec3 => "vec3<f32>",
            Self::Vec4 => "vec4<f32>",
            Self::Mat4 => "mat4x4<f32>",
        }
    }

    /// Bytes a uniform of this kind occupies in a uniform binding.
    pub(crate) fn uniform_size(self) -> u64 {
        match self {
            Self::Float | Self::Int => 4,
            Self::Vec2 => 8,
            Self::Vec3 | Self::Vec4 => 16,
            Self::Mat4 => 64,
        }
    }

    pub(crate) fn is_attribute_kind(self) -> bool {
        matches!(self, Self::Float | Self::Vec2 | Self::Vec3 | Self::Vec4)
    }

    pub(crate) fn is_uniform_kind(self) -> bool {
        matches!(self, Self::Float | Self::Int | Self::Vec3 | Self::Mat4)
    }
}

/// An attribute or uniform reported by a linked program.
///
/// For attributes `location` is the vertex input slot; for uniforms it is
/// the binding index inside bind group 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVariable {
    pub name: String,
    pub location: u32,
    pub kind: VariableKind,
}

/// A typed uniform upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec3(Vec3),
    Float(f32),
    Int(i32),
}

impl UniformValue {
    #[must_use]
    pub fn kind(&self) -> VariableKind {
        match self {
            Self::Mat4(_) => VariableKind::Mat4,
            Self::Vec3(_) => VariableKind::Vec3,
            Self::Float(_) => VariableKind::Float,
            Self::Int(_) => VariableKind::Int,
        }
    }

    /// Appends the std140-compatible bytes of this value.
    pub(crate) fn write_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Self::Mat4(m) => out.extend_from_slice(bytemuck::cast_slice(&m.to_cols_array())),
            Self::Vec3(v) => out.extend_from_slice(bytemuck::cast_slice(&[v.x, v.y, v.z, 0.0])),
            Self::Float(f) => out.extend_from_slice(bytemuck::bytes_of(f)),
            Self::Int(i) => out.extend_from_slice(bytemuck::bytes_of(i)),
        }
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        Self::Mat4(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

/// Fixed-function state applied to subsequent draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderState {
    /// Depth test with a less-or-equal comparison.
    pub depth_test: bool,
    /// Cull back faces (counter-clockwise front faces).
    pub cull_back_faces: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            depth_test: true,
            cull_back_faces: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// The device handle all GPU operations are issued through.
///
/// Object-management methods have default implementations over
/// [`ObjectTable`]; a backend overrides them only when it keeps extra
/// per-object GPU state.
pub trait GraphicsDevice: Any {
    fn objects(&self) -> &ObjectTable;
    fn objects_mut(&mut self) -> &mut ObjectTable;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Current surface size in pixels.
    fn size(&self) -> (u32, u32);

    fn stats(&self) -> DeviceStats {
        self.objects().stats()
    }

    // ------------------------------------------------------------------
    // Vertex layouts
    // ------------------------------------------------------------------

    fn create_vertex_layout(&mut self) -> VertexLayoutId {
        self.objects_mut().create_vertex_layout()
    }

    fn bind_vertex_layout(&mut self, layout: Option<VertexLayoutId>) -> Result<()> {
        self.objects_mut().bind_vertex_layout(layout)
    }

    fn delete_vertex_layout(&mut self, layout: VertexLayoutId) -> bool {
        self.objects_mut().delete_vertex_layout(layout)
    }

    /// Feeds attribute `location` of the bound layout from `buffer`,
    /// `components` tightly packed 32-bit floats per vertex.
    fn vertex_attribute(&mut self, location: u32, buffer: BufferId, components: u32) -> Result<()> {
        self.objects_mut().vertex_attribute(location, buffer, components)
    }

    fn disable_vertex_attribute(&mut self, location: u32) -> Result<()> {
        self.objects_mut().disable_vertex_attribute(location)
    }

    fn element_buffer(&mut self, buffer: BufferId, format: wgpu::IndexFormat) -> Result<()> {
        self.objects_mut().element_buffer(buffer, format)
    }

    // ------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------

    /// Allocates a buffer and uploads `contents` with static usage.
    fn create_buffer(&mut self, target: BufferTarget, contents: &[u8]) -> BufferId;

    /// Releases a buffer. Returns `false` if the handle was not live.
    fn delete_buffer(&mut self, buffer: BufferId) -> bool;

    // ------------------------------------------------------------------
    // Shaders and programs
    // ------------------------------------------------------------------

    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> ShaderId {
        self.objects_mut().create_shader(stage, source)
    }

    /// Compiles a shader. `Ok(false)` means the source was rejected; read
    /// [`shader_info_log`](Self::shader_info_log) for the diagnostic.
    fn compile_shader(&mut self, shader: ShaderId) -> Result<bool> {
        self.objects_mut().compile_shader(shader)
    }

    fn shader_info_log(&self, shader: ShaderId) -> Result<String> {
        self.objects().shader_info_log(shader)
    }

    fn delete_shader(&mut self, shader: ShaderId) -> bool {
        self.objects_mut().delete_shader(shader)
    }

    fn create_program(&mut self) -> ProgramId {
        self.objects_mut().create_program()
    }

    /// Links two compiled shaders. `Ok(false)` means linking failed; read
    /// [`program_info_log`](Self::program_info_log) for the diagnostic.
    fn link_program(&mut self, program: ProgramId, vertex: ShaderId, fragment: ShaderId) -> Result<bool> {
        self.objects_mut().link_program(program, vertex, fragment)
    }

    fn program_info_log(&self, program: ProgramId) -> Result<String> {
        self.objects().program_info_log(program)
    }

    fn active_attributes(&self, program: ProgramId) -> Result<Vec<ActiveVariable>> {
        self.objects().active_attributes(program)
    }

    fn active_uniforms(&self, program: ProgramId) -> Result<Vec<ActiveVariable>> {
        self.objects().active_uniforms(program)
    }

    fn use_program(&mut self, program: Option<ProgramId>) -> Result<()> {
        self.objects_mut().use_program(program)
    }

    fn delete_program(&mut self, program: ProgramId) -> bool {
        self.objects_mut().delete_program(program)
    }

    /// Sets a uniform of the program in use.
    fn set_uniform(&mut self, location: u32, value: UniformValue) -> Result<()> {
        self.objects_mut().set_uniform(location, value)
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    fn set_render_state(&mut self, state: RenderState);

    fn set_viewport(&mut self, viewport: Viewport);

    /// Clears color and depth at the start of the frame.
    fn clear(&mut self, color: wgpu::Color);

    /// Non-indexed triangle-list draw of `count` vertices.
    fn draw_arrays(&mut self, count: u32) -> Result<()>;

    /// Indexed triangle-list draw of `count` indices.
    fn draw_elements(&mut self, count: u32, format: wgpu::IndexFormat) -> Result<()>;

    fn resize_surface(&mut self, width: u32, height: u32);

    /// Submits the frame's work and presents it.
    fn present(&mut self) -> Result<()>;
}

impl dyn GraphicsDevice {
    /// Downcasts to a concrete backend.
    #[must_use]
    pub fn downcast_ref<T: GraphicsDevice>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    #[must_use]
    pub fn downcast_mut<T: GraphicsDevice>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}
