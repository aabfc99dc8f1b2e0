//! Device object bookkeeping shared by every backend.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::errors::{GlintError, Result};
use crate::renderer::device::{
    ActiveVariable, BufferId, BufferTarget, ProgramId, ShaderId, ShaderStage, UniformValue,
    VertexLayoutId,
};
use crate::renderer::shader_reflect::{self, LinkedProgram};

/// One attribute slot of a vertex layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeBinding {
    pub buffer: BufferId,
    pub components: u32,
}

#[derive(Debug, Default)]
pub struct VertexLayout {
    pub(crate) attributes: BTreeMap<u32, AttributeBinding>,
    pub(crate) elements: Option<(BufferId, wgpu::IndexFormat)>,
}

impl VertexLayout {
    #[must_use]
    pub fn attribute(&self, location: u32) -> Option<AttributeBinding> {
        self.attributes.get(&location).copied()
    }
}

#[derive(Debug)]
pub struct BufferObject {
    pub target: BufferTarget,
    pub byte_len: u64,
}

#[derive(Debug)]
pub struct ShaderObject {
    pub(crate) stage: ShaderStage,
    pub(crate) source: String,
    pub(crate) module: Option<naga::Module>,
    pub(crate) info_log: String,
}

#[derive(Debug, Default)]
pub struct ProgramObject {
    pub(crate) linked: Option<LinkedProgram>,
    pub(crate) info_log: String,
    pub(crate) uniform_values: FxHashMap<u32, UniformValue>,
}

/// Live object counts and release history.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStats {
    pub live_layouts: usize,
    pub live_buffers: usize,
    pub live_shaders: usize,
    pub live_programs: usize,
    pub released_layouts: usize,
    pub released_buffers: usize,
    pub released_shaders: usize,
    pub released_programs: usize,
    /// Release calls on handles that were not live.
    pub stale_releases: usize,
}

/// A validated snapshot of everything a draw call consumes.
#[derive(Debug, Clone)]
pub struct DrawCall {
    pub program: ProgramId,
    /// Program attributes in location order, with the feeding buffer if bound.
    pub attributes: Vec<(ActiveVariable, Option<AttributeBinding>)>,
    pub elements: Option<(BufferId, wgpu::IndexFormat)>,
    /// Program uniforms in binding order, with their current value if set.
    pub uniforms: Vec<(ActiveVariable, Option<UniformValue>)>,
}

/// What shaders may use on a device: the naga capabilities implied by its
/// features and the number of uniforms one program may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub capabilities: naga::valid::Capabilities,
    pub max_uniforms: u32,
}

impl DeviceLimits {
    #[must_use]
    pub fn new(features: wgpu::Features, limits: &wgpu::Limits) -> Self {
        use naga::valid::Capabilities as Caps;

        let mut capabilities = Caps::empty();
        capabilities.set(Caps::FLOAT64, features.contains(wgpu::Features::SHADER_F64));
        capabilities.set(Caps::SHADER_FLOAT16, features.contains(wgpu::Features::SHADER_F16));
        capabilities.set(Caps::SHADER_INT64, features.contains(wgpu::Features::SHADER_INT64));
        capabilities.set(
            Caps::PRIMITIVE_INDEX,
            features.contains(wgpu::Features::SHADER_PRIMITIVE_INDEX),
        );
        capabilities.set(
            Caps::EARLY_DEPTH_TEST,
            features.contains(wgpu::Features::SHADER_EARLY_DEPTH_TEST),
        );

        // Uniform bindings are dynamic and visible to both stages.
        let max_uniforms = limits
            .max_dynamic_uniform_buffers_per_pipeline_layout
            .min(limits.max_uniform_buffers_per_shader_stage);
        Self {
            capabilities,
            max_uniforms,
        }
    }
}

impl Default for DeviceLimits {
    /// No optional shader features, WebGPU default limits.
    fn default() -> Self {
        Self::new(wgpu::Features::empty(), &wgpu::Limits::default())
    }
}

/// Vertex layouts, buffers, shaders and programs plus the binding state
/// (bound layout, program in use) of one device.
#[derive(Debug, Default)]
pub struct ObjectTable {
    limits: DeviceLimits,
    layouts: SlotMap<VertexLayoutId, VertexLayout>,
    buffers: SlotMap<BufferId, BufferObject>,
    shaders: SlotMap<ShaderId, ShaderObject>,
    programs: SlotMap<ProgramId, ProgramObject>,
    bound_layout: Option<VertexLayoutId>,
    current_program: Option<ProgramId>,
    stats: DeviceStats,
}

impl ObjectTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn limits(&self) -> DeviceLimits {
        self.limits
    }

    #[must_use]
    pub fn stats(&self) -> DeviceStats {
        DeviceStats {
            live_layouts: self.layouts.len(),
            live_buffers: self.buffers.len(),
            live_shaders: self.shaders.len(),
            live_programs: self.programs.len(),
            ..self.stats
        }
    }

    #[must_use]
    pub fn bound_layout(&self) -> Option<VertexLayoutId> {
        self.bound_layout
    }

    #[must_use]
    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    #[must_use]
    pub fn buffer(&self, id: BufferId) -> Option<&BufferObject> {
        self.buffers.get(id)
    }

    #[must_use]
    pub fn layout(&self, id: VertexLayoutId) -> Option<&VertexLayout> {
        self.layouts.get(id)
    }

    pub(crate) fn linked_program(&self, id: ProgramId) -> Option<&LinkedProgram> {
        self.programs.get(id).and_then(|p| p.linked.as_ref())
    }

    #[must_use]
    pub fn uniform_value(&self, program: ProgramId, location: u32) -> Option<UniformValue> {
        self.programs
            .get(program)
            .and_then(|p| p.uniform_values.get(&location).copied())
    }

    // ------------------------------------------------------------------
    // Vertex layouts
    // ------------------------------------------------------------------

    pub fn create_vertex_layout(&mut self) -> VertexLayoutId {
        let id = self.layouts.insert(VertexLayout::default());
        log::debug!("Created vertex layout {id:?}");
        id
    }

    pub fn bind_vertex_layout(&mut self, layout: Option<VertexLayoutId>) -> Result<()> {
        if let Some(id) = layout
            && !self.layouts.contains_key(id)
        {
            return Err(GlintError::InvalidHandle { kind: "vertex layout" });
        }
        self.bound_layout = layout;
        Ok(())
    }

    pub fn delete_vertex_layout(&mut self, layout: VertexLayoutId) -> bool {
        if self.layouts.remove(layout).is_none() {
            self.stats.stale_releases += 1;
            return false;
        }
        if self.bound_layout == Some(layout) {
            self.bound_layout = None;
        }
        self.stats.released_layouts += 1;
        log::debug!("Released vertex layout {layout:?}");
        true
    }

    fn bound_layout_mut(&mut self, what: &str) -> Result<&mut VertexLayout> {
        let id = self
            .bound_layout
            .ok_or_else(|| GlintError::NoActiveLayout(what.to_string()))?;
        self.layouts
            .get_mut(id)
            .ok_or(GlintError::InvalidHandle { kind: "vertex layout" })
    }

    pub fn vertex_attribute(&mut self, location: u32, buffer: BufferId, components: u32) -> Result<()> {
        if !(1..=4).contains(&components) {
            return Err(GlintError::InvalidVertexData(format!(
                "attribute {location} has {components} components, expected 1..=4"
            )));
        }
        match self.buffers.get(buffer) {
            Some(b) if b.target == BufferTarget::Vertex => {}
            _ => return Err(GlintError::InvalidHandle { kind: "vertex buffer" }),
        }
        let layout = self.bound_layout_mut(&format!("attribute {location}"))?;
        layout.attributes.insert(location, AttributeBinding { buffer, components });
        Ok(())
    }

    /// Detaches whatever buffer feeds `location` in the bound layout.
    pub fn disable_vertex_attribute(&mut self, location: u32) -> Result<()> {
        let layout = self.bound_layout_mut(&format!("attribute {location}"))?;
        layout.attributes.remove(&location);
        Ok(())
    }

    pub fn element_buffer(&mut self, buffer: BufferId, format: wgpu::IndexFormat) -> Result<()> {
        match self.buffers.get(buffer) {
            Some(b) if b.target == BufferTarget::Index => {}
            _ => return Err(GlintError::InvalidHandle { kind: "index buffer" }),
        }
        let layout = self.bound_layout_mut("index")?;
        layout.elements = Some((buffer, format));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------

    pub fn insert_buffer(&mut self, target: BufferTarget, byte_len: u64) -> BufferId {
        let id = self.buffers.insert(BufferObject { target, byte_len });
        log::debug!("Created {target:?} buffer {id:?} ({byte_len} bytes)");
        id
    }

    /// Removes a buffer. Layouts still referencing it fail validation at draw time.
    pub fn remove_buffer(&mut self, buffer: BufferId) -> bool {
        if self.buffers.remove(buffer).is_none() {
            self.stats.stale_releases += 1;
            return false;
        }
        self.stats.released_buffers += 1;
        log::debug!("Released buffer {buffer:?}");
        true
    }

    // ------------------------------------------------------------------
    // Shaders
    // ------------------------------------------------------------------

    pub fn create_shader(&mut self, stage: ShaderStage, source: &str) -> ShaderId {
        self.shaders.insert(ShaderObject {
            stage,
            source: source.to_string(),
            module: None,
            info_log: String::new(),
        })
    }

    pub fn compile_shader(&mut self, shader: ShaderId) -> Result<bool> {
        let object = self
            .shaders
            .get_mut(shader)
            .ok_or(GlintError::InvalidHandle { kind: "shader" })?;
        match shader_reflect::compile(object.stage, &object.source, self.limits.capabilities) {
            Ok(module) => {
                object.module = Some(module);
                object.info_log.clear();
                Ok(true)
            }
            Err(log) => {
                object.module = None;
                object.info_log = log;
                Ok(false)
            }
        }
    }

    pub fn shader_info_log(&self, shader: ShaderId) -> Result<String> {
        self.shaders
            .get(shader)
            .map(|s| s.info_log.clone())
            .ok_or(GlintError::InvalidHandle { kind: "shader" })
    }

    pub fn delete_shader(&mut self, shader: ShaderId) -> bool {
        if self.shaders.remove(shader).is_none() {
            self.stats.stale_releases += 1;
            return false;
        }
        self.stats.released_shaders += 1;
        true
    }

    // ------------------------------------------------------------------
    // Programs
    // ------------------------------------------------------------------

    pub fn create_program(&mut self) -> ProgramId {
        self.programs.insert(ProgramObject::default())
    }

    pub fn link_program(&mut self, program: ProgramId, vertex: ShaderId, fragment: ShaderId) -> Result<bool> {
        let vs = self
            .shaders
            .get(vertex)
            .ok_or(GlintError::InvalidHandle { kind: "shader" })?;
        let fs = self
            .shaders
            .get(fragment)
            .ok_or(GlintError::InvalidHandle { kind: "shader" })?;
        let outcome = shader_reflect::link(vs, fs, self.limits.max_uniforms);

        let object = self
            .programs
            .get_mut(program)
            .ok_or(GlintError::InvalidHandle { kind: "program" })?;
        object.uniform_values.clear();
        match outcome {
            Ok(linked) => {
                object.linked = Some(linked);
                object.info_log.clear();
                Ok(true)
            }
            Err(log) => {
                object.linked = None;
                object.info_log = log;
                Ok(false)
            }
        }
    }

    pub fn program_info_log(&self, program: ProgramId) -> Result<String> {
        self.programs
            .get(program)
            .map(|p| p.info_log.clone())
            .ok_or(GlintError::InvalidHandle { kind: "program" })
    }

    fn linked(&self, program: ProgramId) -> Result<&LinkedProgram> {
        let object = self
            .programs
            .get(program)
            .ok_or(GlintError::InvalidHandle { kind: "program" })?;
        object.linked.as_ref().ok_or(GlintError::ProgramUnavailable)
    }

    pub fn active_attributes(&self, program: ProgramId) -> Result<Vec<ActiveVariable>> {
        Ok(self.linked(program)?.attributes.clone())
    }

    pub fn active_uniforms(&self, program: ProgramId) -> Result<Vec<ActiveVariable>> {
        Ok(self.linked(program)?.uniforms.clone())
    }

    pub fn use_program(&mut self, program: Option<ProgramId>) -> Result<()> {
        if let Some(id) = program {
            self.linked(id)?;
        }
        self.current_program = program;
        Ok(())
    }

    pub fn delete_program(&mut self, program: ProgramId) -> bool {
        if self.programs.remove(program).is_none() {
            self.stats.stale_releases += 1;
            return false;
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.stats.released_programs += 1;
        log::debug!("Released program {program:?}");
        true
    }

    pub fn set_uniform(&mut self, location: u32, value: UniformValue) -> Result<()> {
        let program = self.current_program.ok_or(GlintError::NoActiveProgram)?;
        let uniform = self
            .linked(program)?
            .uniforms
            .iter()
            .find(|u| u.location == location)
            .ok_or_else(|| GlintError::UniformNotFound(format!("binding {location}")))?;
        if uniform.kind != value.kind() {
            return Err(GlintError::UniformTypeMismatch {
                name: uniform.name.clone(),
                expected: uniform.kind.wgsl_name(),
                actual: value.kind().wgsl_name(),
            });
        }
        if let Some(object) = self.programs.get_mut(program) {
            object.uniform_values.insert(location, value);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Draw validation
    // ------------------------------------------------------------------

    /// Validates the bound state for a draw of `count` vertices (or indices
    /// when `indexed` is set) and snapshots it.
    pub fn draw_call(&self, count: u32, indexed: Option<wgpu::IndexFormat>) -> Result<DrawCall> {
        let program = self.current_program.ok_or(GlintError::NoActiveProgram)?;
        let linked = self.linked(program)?;
        let layout_id = self
            .bound_layout
            .ok_or_else(|| GlintError::NoActiveLayout("draw".to_string()))?;
        let layout = self
            .layouts
            .get(layout_id)
            .ok_or(GlintError::InvalidHandle { kind: "vertex layout" })?;

        let mut attributes = Vec::with_capacity(linked.attributes.len());
        for attribute in &linked.attributes {
            let binding = layout.attributes.get(&attribute.location).copied();
            if let Some(binding) = binding {
                let buffer = self
                    .buffers
                    .get(binding.buffer)
                    .ok_or(GlintError::InvalidHandle { kind: "vertex buffer" })?;
                if indexed.is_none() {
                    let needed = u64::from(count) * u64::from(binding.components) * 4;
                    if buffer.byte_len < needed {
                        return Err(GlintError::InvalidVertexData(format!(
                            "attribute `{}` holds {} bytes, draw of {count} vertices reads {needed}",
                            attribute.name, buffer.byte_len
                        )));
                    }
                }
            }
            attributes.push((attribute.clone(), binding));
        }

        let elements = match indexed {
            Some(format) => {
                let (buffer, bound_format) = layout.elements.ok_or_else(|| {
                    GlintError::InvalidVertexData("indexed draw with no index buffer bound".to_string())
                })?;
                if bound_format != format {
                    return Err(GlintError::InvalidVertexData(format!(
                        "indexed draw as {format:?} but index buffer holds {bound_format:?}"
                    )));
                }
                let object = self
                    .buffers
                    .get(buffer)
                    .ok_or(GlintError::InvalidHandle { kind: "index buffer" })?;
                let needed = u64::from(count) * index_size(format);
                if object.byte_len < needed {
                    return Err(GlintError::InvalidVertexData(format!(
                        "index buffer holds {} bytes, draw of {count} indices reads {needed}",
                        object.byte_len
                    )));
                }
                Some((buffer, format))
            }
            None => None,
        };

        let values = self.programs.get(program).map(|p| &p.uniform_values);
        let uniforms = linked
            .uniforms
            .iter()
            .map(|u| {
                let value = values.and_then(|v| v.get(&u.location).copied());
                (u.clone(), value)
            })
            .collect();

        Ok(DrawCall {
            program,
            attributes,
            elements,
            uniforms,
        })
    }
}

fn index_size(format: wgpu::IndexFormat) -> u64 {
    match format {
        wgpu::IndexFormat::Uint16 => 2,
        wgpu::IndexFormat::Uint32 => 4,
    }
}
