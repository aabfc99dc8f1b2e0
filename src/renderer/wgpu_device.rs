//! wgpu backend.
//!
//! [`WgpuDevice`] owns the device, queue, window surface and depth buffer.
//! Draw calls are validated and recorded immediately; `present` encodes the
//! recorded frame into one render pass, submits it and presents the surface.

use std::any::Any;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashMap;
use slotmap::SecondaryMap;
use wgpu::util::DeviceExt;

use crate::errors::{GlintError, Result};
use crate::renderer::device::{
    BufferId, BufferTarget, GraphicsDevice, ProgramId, RenderState, Viewport,
};
use crate::renderer::dynamic_buffer::DynamicUniformBuffer;
use crate::renderer::objects::{DeviceLimits, ObjectTable};
use crate::renderer::pipeline::{AttributeKey, PipelineCache, PipelineKey};
use crate::renderer::settings::WgpuSettings;

/// Uniform binding of one recorded draw.
struct DrawUniforms {
    program: ProgramId,
    layout: wgpu::BindGroupLayout,
    /// (binding, size) in binding order.
    bindings: Vec<(u32, u64)>,
    offsets: Vec<u32>,
}

struct RecordedDraw {
    pipeline: wgpu::RenderPipeline,
    vertex_buffers: Vec<wgpu::Buffer>,
    index: Option<(wgpu::Buffer, wgpu::IndexFormat)>,
    count: u32,
    uniforms: Option<DrawUniforms>,
    viewport: Viewport,
}

/// Draws and uniform bytes recorded since the last clear.
struct Frame {
    draws: Vec<RecordedDraw>,
    uniforms: DynamicUniformBuffer,
}

impl Frame {
    fn new(uniform_alignment: u32) -> Self {
        Self {
            draws: Vec::new(),
            uniforms: DynamicUniformBuffer::new(uniform_alignment),
        }
    }

    fn reset(&mut self) {
        self.draws.clear();
        self.uniforms.clear();
    }
}

pub struct WgpuDevice {
    objects: ObjectTable,

    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    size: (u32, u32),

    depth_format: wgpu::TextureFormat,
    depth_view: wgpu::TextureView,

    buffers: SecondaryMap<BufferId, wgpu::Buffer>,
    /// 16 zero bytes read by attributes a layout does not feed.
    default_attribute: wgpu::Buffer,
    pipelines: PipelineCache,

    render_state: RenderState,
    viewport: Viewport,
    clear_color: wgpu::Color,
    frame: Frame,
}

impl WgpuDevice {
    pub async fn new<W>(
        window: W,
        width: u32,
        height: u32,
        settings: &WgpuSettings,
        transparent: bool,
    ) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let instance = match settings.backends {
            Some(backends) => wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends,
                ..Default::default()
            }),
            None => wgpu::Instance::default(),
        };
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: settings.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| GlintError::AdapterRequestFailed(e.to_string()))?;
        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("glint device"),
                required_features: settings.required_features,
                required_limits: settings.required_limits.clone(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        let width = width.max(1);
        let height = height.max(1);
        let mut config = surface
            .get_default_config(&adapter, width, height)
            .ok_or(GlintError::SurfaceUnsupported)?;

        let caps = surface.get_capabilities(&adapter);
        // Shader output is written as-is, without an sRGB encode.
        if let Some(format) = caps.formats.iter().copied().find(|f| !f.is_srgb()) {
            config.format = format;
        }
        if transparent {
            let blended = caps.alpha_modes.iter().copied().find(|m| {
                matches!(
                    m,
                    wgpu::CompositeAlphaMode::PreMultiplied | wgpu::CompositeAlphaMode::PostMultiplied
                )
            });
            match blended {
                Some(mode) => config.alpha_mode = mode,
                None => log::warn!("Surface offers no blended alpha mode, transparency unavailable"),
            }
        }
        config.present_mode = if settings.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        surface.configure(&device, &config);
        log::info!(
            "Configured surface {}x{} ({:?}, {:?})",
            config.width,
            config.height,
            config.format,
            config.alpha_mode
        );

        let depth_view = Self::create_depth_texture(&device, &config, settings.depth_format);
        let default_attribute = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("glint default attribute"),
            contents: &[0u8; 16],
            usage: wgpu::BufferUsages::VERTEX,
        });
        let limits = device.limits();
        let objects = ObjectTable::with_limits(DeviceLimits::new(device.features(), &limits));

        Ok(Self {
            objects,
            device,
            queue,
            surface,
            config,
            size: (width, height),
            depth_format: settings.depth_format,
            depth_view,
            buffers: SecondaryMap::new(),
            default_attribute,
            pipelines: PipelineCache::default(),
            render_state: RenderState::default(),
            viewport: Viewport::full(width, height),
            clear_color: wgpu::Color::BLACK,
            frame: Frame::new(limits.min_uniform_buffer_offset_alignment),
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        format: wgpu::TextureFormat,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glint depth texture"),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns the surface color format.
    #[inline]
    #[must_use]
    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    fn gpu_buffer(&self, id: BufferId) -> Result<wgpu::Buffer> {
        self.buffers
            .get(id)
            .cloned()
            .ok_or(GlintError::InvalidHandle { kind: "buffer" })
    }

    fn record_draw(&mut self, count: u32, indexed: Option<wgpu::IndexFormat>) -> Result<()> {
        let call = self.objects.draw_call(count, indexed)?;
        let linked = self
            .objects
            .linked_program(call.program)
            .ok_or(GlintError::ProgramUnavailable)?;

        let key = PipelineKey {
            program: call.program,
            attributes: call
                .attributes
                .iter()
                .map(|(var, binding)| AttributeKey {
                    location: var.location,
                    components: binding.map_or(var.kind.components(), |b| b.components),
                    bound: binding.is_some(),
                })
                .collect(),
            render_state: self.render_state,
        };
        let pipeline = match self.pipelines.get(&key) {
            Some(pipeline) => pipeline,
            None => {
                let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
                let pipeline = self.pipelines.create(
                    &self.device,
                    linked,
                    key,
                    self.config.format,
                    self.depth_format,
                );
                if let Some(error) = pollster::block_on(scope.pop()) {
                    self.pipelines.evict(call.program);
                    log::error!("Pipeline creation failed for program {:?}: {error}", call.program);
                    return Err(GlintError::PipelineCreation(error.to_string()));
                }
                pipeline
            }
        };

        let mut vertex_buffers = Vec::with_capacity(call.attributes.len());
        for (_, binding) in &call.attributes {
            vertex_buffers.push(match binding {
                Some(b) => self.gpu_buffer(b.buffer)?,
                None => self.default_attribute.clone(),
            });
        }
        let index = match call.elements {
            Some((id, format)) => Some((self.gpu_buffer(id)?, format)),
            None => None,
        };

        let uniforms = if call.uniforms.is_empty() {
            None
        } else {
            let layout = self
                .pipelines
                .bind_group_layout(call.program)
                .cloned()
                .ok_or(GlintError::ProgramUnavailable)?;
            let mut bindings = Vec::with_capacity(call.uniforms.len());
            let mut offsets = Vec::with_capacity(call.uniforms.len());
            for (var, value) in &call.uniforms {
                let size = var.kind.uniform_size();
                offsets.push(self.frame.uniforms.push(value.as_ref(), size));
                bindings.push((var.location, size));
            }
            Some(DrawUniforms {
                program: call.program,
                layout,
                bindings,
                offsets,
            })
        };

        self.frame.draws.push(RecordedDraw {
            pipeline,
            vertex_buffers,
            index,
            count,
            uniforms,
            viewport: self.viewport,
        });
        Ok(())
    }

    fn create_bind_group(&self, uniforms: &DrawUniforms, buffer: &wgpu::Buffer) -> wgpu::BindGroup {
        let entries: Vec<wgpu::BindGroupEntry> = uniforms
            .bindings
            .iter()
            .map(|&(binding, size)| wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(size),
                }),
            })
            .collect();
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("glint frame uniforms"),
            layout: &uniforms.layout,
            entries: &entries,
        })
    }
}

/// Clips a viewport to the target; `None` when nothing remains visible.
fn clip_viewport(viewport: Viewport, width: u32, height: u32) -> Option<Viewport> {
    let x = viewport.x.min(width);
    let y = viewport.y.min(height);
    let w = viewport.width.min(width - x);
    let h = viewport.height.min(height - y);
    (w > 0 && h > 0).then_some(Viewport {
        x,
        y,
        width: w,
        height: h,
    })
}

impl GraphicsDevice for WgpuDevice {
    fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    fn objects_mut(&mut self) -> &mut ObjectTable {
        &mut self.objects
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn create_buffer(&mut self, target: BufferTarget, contents: &[u8]) -> BufferId {
        let usage = match target {
            BufferTarget::Vertex => wgpu::BufferUsages::VERTEX,
            BufferTarget::Index => wgpu::BufferUsages::INDEX,
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("glint buffer"),
                contents,
                usage,
            });
        let id = self.objects.insert_buffer(target, contents.len() as u64);
        self.buffers.insert(id, buffer);
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> bool {
        self.buffers.remove(buffer);
        self.objects.remove_buffer(buffer)
    }

    fn delete_program(&mut self, program: ProgramId) -> bool {
        self.pipelines.evict(program);
        self.objects.delete_program(program)
    }

    fn set_render_state(&mut self, state: RenderState) {
        self.render_state = state;
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn clear(&mut self, color: wgpu::Color) {
        self.frame.reset();
        self.clear_color = color;
    }

    fn draw_arrays(&mut self, count: u32) -> Result<()> {
        self.record_draw(count, None)
    }

    fn draw_elements(&mut self, count: u32, format: wgpu::IndexFormat) -> Result<()> {
        self.record_draw(count, Some(format))
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = Self::create_depth_texture(&self.device, &self.config, self.depth_format);
            log::debug!("Resized surface to {width}x{height}");
        }
    }

    fn present(&mut self) -> Result<()> {
        let draws = std::mem::take(&mut self.frame.draws);
        let (width, height) = self.size;
        if width == 0 || height == 0 {
            log::debug!("Surface has zero area, skipping frame");
            self.frame.uniforms.clear();
            return Ok(());
        }

        let output = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                self.frame.uniforms.clear();
                return Ok(());
            }
            Err(e @ wgpu::SurfaceError::OutOfMemory) => {
                self.frame.uniforms.clear();
                return Err(e.into());
            }
            Err(e) => {
                log::warn!("Skipping frame: {e}");
                self.frame.uniforms.clear();
                return Ok(());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let uniform_buffer = self.frame.uniforms.flush(&self.device);
        let mut bind_groups: FxHashMap<ProgramId, wgpu::BindGroup> = FxHashMap::default();
        if let Some(buffer) = &uniform_buffer {
            for uniforms in draws.iter().filter_map(|d| d.uniforms.as_ref()) {
                if !bind_groups.contains_key(&uniforms.program) {
                    let group = self.create_bind_group(uniforms, buffer);
                    bind_groups.insert(uniforms.program, group);
                }
            }
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("glint frame encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("glint frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for draw in &draws {
                let Some(vp) = clip_viewport(draw.viewport, self.config.width, self.config.height) else {
                    continue;
                };
                pass.set_viewport(
                    vp.x as f32,
                    vp.y as f32,
                    vp.width as f32,
                    vp.height as f32,
                    0.0,
                    1.0,
                );
                pass.set_pipeline(&draw.pipeline);
                if let Some(uniforms) = &draw.uniforms
                    && let Some(group) = bind_groups.get(&uniforms.program)
                {
                    pass.set_bind_group(0, group, &uniforms.offsets);
                }
                for (slot, buffer) in draw.vertex_buffers.iter().enumerate() {
                    pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                match &draw.index {
                    Some((buffer, format)) => {
                        pass.set_index_buffer(buffer.slice(..), *format);
                        pass.draw_indexed(0..draw.count, 0, 0..1);
                    }
                    None => pass.draw(0..draw.count, 0..1),
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
