//! Render pipeline cache for the wgpu backend.
//!
//! A pipeline is fully described by the program it runs, the vertex layout
//! feeding it and the fixed-function state in effect at draw time. Shader
//! modules and layouts are built once per program; pipelines once per key.

use rustc_hash::FxHashMap;
use slotmap::SecondaryMap;

use crate::renderer::device::{ProgramId, RenderState};
use crate::renderer::shader_reflect::LinkedProgram;

/// One vertex buffer slot of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct AttributeKey {
    pub location: u32,
    pub components: u32,
    /// `false` when the layout has no buffer for this location and the
    /// zeroed default attribute is read instead.
    pub bound: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    pub program: ProgramId,
    pub attributes: Vec<AttributeKey>,
    pub render_state: RenderState,
}

struct ProgramResources {
    vertex_module: wgpu::ShaderModule,
    fragment_module: wgpu::ShaderModule,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    pipeline_layout: wgpu::PipelineLayout,
}

impl ProgramResources {
    fn new(device: &wgpu::Device, linked: &LinkedProgram) -> Self {
        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glint vertex shader"),
            source: wgpu::ShaderSource::Wgsl(linked.vertex_source.as_str().into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glint fragment shader"),
            source: wgpu::ShaderSource::Wgsl(linked.fragment_source.as_str().into()),
        });

        let bind_group_layout = (!linked.uniforms.is_empty()).then(|| {
            let entries: Vec<wgpu::BindGroupLayoutEntry> = linked
                .uniforms
                .iter()
                .map(|u| wgpu::BindGroupLayoutEntry {
                    binding: u.location,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(u.kind.uniform_size()),
                    },
                    count: None,
                })
                .collect();
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("glint uniforms layout"),
                entries: &entries,
            })
        });

        let group_layouts: Vec<&wgpu::BindGroupLayout> = bind_group_layout.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glint pipeline layout"),
            bind_group_layouts: &group_layouts,
            immediate_size: 0,
        });

        Self {
            vertex_module,
            fragment_module,
            bind_group_layout,
            pipeline_layout,
        }
    }
}

fn vertex_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

#[derive(Default)]
pub(crate) struct PipelineCache {
    programs: SecondaryMap<ProgramId, ProgramResources>,
    pipelines: FxHashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub fn get(&self, key: &PipelineKey) -> Option<wgpu::RenderPipeline> {
        self.pipelines.get(key).cloned()
    }

    /// Builds and caches the pipeline for `key`, plus the program's shader
    /// modules and layouts if this is its first pipeline.
    ///
    /// wgpu reports invalid descriptors through the device error scopes, so
    /// callers run this inside one and [`evict`](Self::evict) on error.
    pub fn create(
        &mut self,
        device: &wgpu::Device,
        linked: &LinkedProgram,
        key: PipelineKey,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        if !self.programs.contains_key(key.program) {
            self.programs
                .insert(key.program, ProgramResources::new(device, linked));
        }
        let resources = &self.programs[key.program];

        let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
            .attributes
            .iter()
            .map(|a| {
                [wgpu::VertexAttribute {
                    format: vertex_format(a.components),
                    offset: 0,
                    shader_location: a.location,
                }]
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout> = key
            .attributes
            .iter()
            .zip(&attributes)
            .map(|(a, attrs)| wgpu::VertexBufferLayout {
                array_stride: if a.bound { u64::from(a.components) * 4 } else { 0 },
                step_mode: if a.bound {
                    wgpu::VertexStepMode::Vertex
                } else {
                    wgpu::VertexStepMode::Instance
                },
                attributes: attrs,
            })
            .collect();

        let state = key.render_state;
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("glint pipeline"),
            layout: Some(&resources.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &resources.vertex_module,
                entry_point: Some(linked.vertex_entry.as_str()),
                buffers: &buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &resources.fragment_module,
                entry_point: Some(linked.fragment_entry.as_str()),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: state.cull_back_faces.then_some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: state.depth_test,
                depth_compare: if state.depth_test {
                    wgpu::CompareFunction::LessEqual
                } else {
                    wgpu::CompareFunction::Always
                },
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("Created pipeline for program {:?} ({} attributes)", key.program, key.attributes.len());
        self.pipelines.insert(key, pipeline.clone());
        pipeline
    }

    pub fn bind_group_layout(&self, program: ProgramId) -> Option<&wgpu::BindGroupLayout> {
        self.programs
            .get(program)
            .and_then(|r| r.bind_group_layout.as_ref())
    }

    /// Drops every cached object built for `program`.
    pub fn evict(&mut self, program: ProgramId) {
        self.programs.remove(program);
        self.pipelines.retain(|key, _| key.program != program);
    }
}
