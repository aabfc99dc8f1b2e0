//! GPU Buffer
//!
//! A [`GpuBuffer`] owns one vertex layout object and the named data buffers
//! feeding it: one per vertex attribute plus an optional index buffer stored
//! under [`INDEX_KEY`]. It is the unit of upload, bind, draw and dispose.
//!
//! Lifecycle:
//!
//! ```text
//! new ──► create_vao ──► create_array* ──► create_element? ──► draw* ──► dispose
//! ```
//!
//! Every handle recorded by the buffer is released exactly once by
//! [`GpuBuffer::dispose`]; disposing twice releases nothing the second time.

use rustc_hash::FxHashMap;

use crate::errors::{GlintError, Result};
use crate::renderer::device::{BufferId, BufferTarget, GraphicsDevice, VertexLayoutId};

/// Map key of the index buffer.
pub const INDEX_KEY: &str = "index";

#[derive(Debug, Default)]
pub struct GpuBuffer {
    layout: Option<VertexLayoutId>,
    buffers: FxHashMap<String, BufferId>,
    /// Attribute location of each named vertex buffer.
    locations: FxHashMap<String, u32>,
    index_format: Option<wgpu::IndexFormat>,
}

impl GpuBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the vertex layout object and binds it.
    ///
    /// Calling this again rebinds the existing layout instead of allocating
    /// a second one.
    pub fn create_vao(&mut self, device: &mut dyn GraphicsDevice) -> Result<VertexLayoutId> {
        let layout = match self.layout {
            Some(layout) => layout,
            None => {
                let layout = device.create_vertex_layout();
                self.layout = Some(layout);
                layout
            }
        };
        device.bind_vertex_layout(Some(layout))?;
        Ok(layout)
    }

    /// Starts a recording session; alias of [`create_vao`](Self::create_vao).
    pub fn begin(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        self.create_vao(device).map(|_| ())
    }

    /// Ends a recording session by unbinding the layout.
    pub fn end(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        device.bind_vertex_layout(None)
    }

    /// Uploads `data` as attribute `name` at `location`, `components` floats per vertex.
    ///
    /// Replacing an existing attribute of the same name releases the old buffer.
    /// If the name moves to a new location, the old location stops reading it.
    pub fn create_array(
        &mut self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        location: u32,
        data: &[f32],
        components: u32,
    ) -> Result<()> {
        let layout = self
            .layout
            .ok_or_else(|| GlintError::NoActiveLayout(name.to_string()))?;
        if !(1..=4).contains(&components) {
            return Err(GlintError::InvalidVertexData(format!(
                "`{name}` must have 1 to 4 components, got {components}"
            )));
        }
        if data.is_empty() || data.len() % components as usize != 0 {
            return Err(GlintError::InvalidVertexData(format!(
                "`{name}` has {} floats, not a non-empty multiple of {components}",
                data.len()
            )));
        }

        device.bind_vertex_layout(Some(layout))?;
        let buffer = device.create_buffer(BufferTarget::Vertex, bytemuck::cast_slice(data));
        if let Err(e) = device.vertex_attribute(location, buffer, components) {
            device.delete_buffer(buffer);
            return Err(e);
        }
        let previous = self.locations.insert(name.to_string(), location);
        if let Some(old) = self.buffers.insert(name.to_string(), buffer) {
            let stale_slot = previous.filter(|&l| {
                l != location
                    && device
                        .objects()
                        .layout(layout)
                        .and_then(|v| v.attribute(l))
                        .is_some_and(|b| b.buffer == old)
            });
            device.delete_buffer(old);
            if let Some(slot) = stale_slot {
                device.disable_vertex_attribute(slot)?;
            }
        }
        Ok(())
    }

    /// Uploads index data. 16-bit indices are used unless some index exceeds `u16::MAX`.
    pub fn create_element(&mut self, device: &mut dyn GraphicsDevice, data: &[u32]) -> Result<()> {
        let layout = self
            .layout
            .ok_or_else(|| GlintError::NoActiveLayout(INDEX_KEY.to_string()))?;
        if data.is_empty() {
            return Err(GlintError::InvalidVertexData("index data is empty".to_string()));
        }

        device.bind_vertex_layout(Some(layout))?;
        let wide = data.iter().any(|&i| i > u32::from(u16::MAX));
        let (format, buffer) = if wide {
            let buffer = device.create_buffer(BufferTarget::Index, bytemuck::cast_slice(data));
            (wgpu::IndexFormat::Uint32, buffer)
        } else {
            let narrow: Vec<u16> = data.iter().map(|&i| i as u16).collect();
            let buffer = device.create_buffer(BufferTarget::Index, bytemuck::cast_slice(&narrow));
            (wgpu::IndexFormat::Uint16, buffer)
        };
        if let Err(e) = device.element_buffer(buffer, format) {
            device.delete_buffer(buffer);
            return Err(e);
        }
        if let Some(old) = self.buffers.insert(INDEX_KEY.to_string(), buffer) {
            device.delete_buffer(old);
        }
        self.index_format = Some(format);
        Ok(())
    }

    /// Binds the layout, draws `count` indices (or vertices without an index
    /// buffer) as a triangle list, then unbinds.
    pub fn draw(&self, device: &mut dyn GraphicsDevice, count: u32) -> Result<()> {
        self.bind(device)?;
        let drawn = match self.index_format {
            Some(format) => device.draw_elements(count, format),
            None => device.draw_arrays(count),
        };
        self.unbind(device)?;
        drawn
    }

    pub fn bind(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let layout = self.layout.ok_or(GlintError::LayoutNotCreated)?;
        device.bind_vertex_layout(Some(layout))
    }

    pub fn unbind(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        device.bind_vertex_layout(None)
    }

    /// Releases the layout and every recorded buffer.
    pub fn dispose(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(layout) = self.layout.take() {
            device.delete_vertex_layout(layout);
        }
        for (name, buffer) in self.buffers.drain() {
            if !device.delete_buffer(buffer) {
                log::warn!("Buffer `{name}` was already released");
            }
        }
        self.locations.clear();
        self.index_format = None;
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> Option<VertexLayoutId> {
        self.layout
    }

    #[inline]
    #[must_use]
    pub fn index_format(&self) -> Option<wgpu::IndexFormat> {
        self.index_format
    }

    #[must_use]
    pub fn buffer(&self, name: &str) -> Option<BufferId> {
        self.buffers.get(name).copied()
    }

    /// Number of live buffers recorded, the index buffer included.
    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }
}
