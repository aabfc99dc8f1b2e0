//! Geometry
//!
//! CPU-side vertex arrays plus the [`GpuBuffer`] they are uploaded into.
//! Attribute slots are fixed: position at 0, normal at 1, uv at 2.

use crate::errors::{GlintError, Result};
use crate::renderer::device::GraphicsDevice;
use crate::resources::buffer::GpuBuffer;

pub const POSITION_LOCATION: u32 = 0;
pub const NORMAL_LOCATION: u32 = 1;
pub const UV_LOCATION: u32 = 2;

#[derive(Debug)]
pub struct Geometry {
    positions: Vec<f32>,
    normals: Option<Vec<f32>>,
    uvs: Option<Vec<f32>>,
    indices: Option<Vec<u32>>,
    buffer: GpuBuffer,
    uploaded: bool,
}

impl Geometry {
    /// Creates a geometry from flat arrays: 3 floats per position and
    /// normal, 2 per uv. Empty optional arrays count as absent.
    pub fn new(
        positions: Vec<f32>,
        normals: Option<Vec<f32>>,
        uvs: Option<Vec<f32>>,
        indices: Option<Vec<u32>>,
    ) -> Result<Self> {
        if positions.is_empty() || positions.len() % 3 != 0 {
            return Err(GlintError::InvalidVertexData(format!(
                "positions must be a non-empty multiple of 3 floats, got {}",
                positions.len()
            )));
        }
        let vertex_count = positions.len() / 3;
        let normals = normals.filter(|n| !n.is_empty());
        let uvs = uvs.filter(|u| !u.is_empty());
        let indices = indices.filter(|i| !i.is_empty());

        if let Some(normals) = &normals
            && normals.len() != vertex_count * 3
        {
            return Err(GlintError::InvalidVertexData(format!(
                "expected {} normal floats for {vertex_count} vertices, got {}",
                vertex_count * 3,
                normals.len()
            )));
        }
        if let Some(uvs) = &uvs
            && uvs.len() != vertex_count * 2
        {
            return Err(GlintError::InvalidVertexData(format!(
                "expected {} uv floats for {vertex_count} vertices, got {}",
                vertex_count * 2,
                uvs.len()
            )));
        }
        if let Some(&max) = indices.as_ref().and_then(|i| i.iter().max())
            && max as usize >= vertex_count
        {
            return Err(GlintError::InvalidVertexData(format!(
                "index {max} out of range for {vertex_count} vertices"
            )));
        }

        Ok(Self {
            positions,
            normals,
            uvs,
            indices,
            buffer: GpuBuffer::new(),
            uploaded: false,
        })
    }

    /// Builds a geometry from arrays already known to be consistent.
    pub(crate) fn from_trusted(positions: Vec<f32>, normals: Vec<f32>, uvs: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            normals: Some(normals),
            uvs: Some(uvs),
            indices: Some(indices),
            buffer: GpuBuffer::new(),
            uploaded: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        (self.positions.len() / 3) as u32
    }

    /// Number of elements a draw consumes: the index count when indexed,
    /// else the vertex count.
    #[must_use]
    pub fn draw_count(&self) -> u32 {
        match &self.indices {
            Some(indices) => indices.len() as u32,
            None => self.vertex_count(),
        }
    }

    #[must_use]
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    #[must_use]
    pub fn normals(&self) -> Option<&[f32]> {
        self.normals.as_deref()
    }

    #[must_use]
    pub fn uvs(&self) -> Option<&[f32]> {
        self.uvs.as_deref()
    }

    #[must_use]
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    #[must_use]
    pub fn buffer(&self) -> &GpuBuffer {
        &self.buffer
    }

    /// Uploads every present array into GPU buffers.
    pub fn upload(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if self.uploaded {
            return Err(GlintError::GeometryAlreadyUploaded);
        }

        if let Err(e) = self.upload_arrays(device) {
            self.buffer.dispose(device);
            return Err(e);
        }
        self.uploaded = true;
        log::debug!(
            "Uploaded geometry: {} vertices, {} indices",
            self.vertex_count(),
            self.indices.as_ref().map_or(0, Vec::len)
        );
        Ok(())
    }

    fn upload_arrays(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        self.buffer.begin(device)?;
        self.buffer
            .create_array(device, "position", POSITION_LOCATION, &self.positions, 3)?;
        if let Some(normals) = &self.normals {
            self.buffer
                .create_array(device, "normal", NORMAL_LOCATION, normals, 3)?;
        }
        if let Some(uvs) = &self.uvs {
            self.buffer.create_array(device, "uv", UV_LOCATION, uvs, 2)?;
        }
        if let Some(indices) = &self.indices {
            self.buffer.create_element(device, indices)?;
        }
        self.buffer.end(device)
    }

    pub fn draw(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if !self.uploaded {
            return Err(GlintError::GeometryNotUploaded);
        }
        self.buffer.draw(device, self.draw_count())
    }

    /// Releases the GPU buffers. The CPU arrays are kept, so the geometry
    /// may be uploaded again.
    pub fn dispose(&mut self, device: &mut dyn GraphicsDevice) {
        self.buffer.dispose(device);
        self.uploaded = false;
    }
}
