use wgpu::util::DeviceExt;

use crate::renderer::device::UniformValue;

/// Per-frame uniform storage addressed through dynamic offsets.
///
/// Each draw snapshots the uniform values of its program into the arena; at
/// present time the arena becomes a single uniform buffer and every draw
/// binds its slice by offset.
pub(crate) struct DynamicUniformBuffer {
    bytes: Vec<u8>,
    alignment: usize,
}

impl DynamicUniformBuffer {
    pub fn new(alignment: u32) -> Self {
        Self {
            bytes: Vec::new(),
            alignment: (alignment as usize).max(16),
        }
    }

    /// Appends one uniform slot of `size` bytes and returns its offset.
    /// An unset uniform reads as zero.
    pub fn push(&mut self, value: Option<&UniformValue>, size: u64) -> u32 {
        let offset = self.bytes.len().next_multiple_of(self.alignment);
        self.bytes.resize(offset, 0);
        if let Some(value) = value {
            value.write_bytes(&mut self.bytes);
        }
        self.bytes.resize(offset + size as usize, 0);
        offset as u32
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Uploads the frame's uniforms, leaving the arena empty.
    pub fn flush(&mut self, device: &wgpu::Device) -> Option<wgpu::Buffer> {
        if self.bytes.is_empty() {
            return None;
        }
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("glint frame uniforms"),
            contents: &self.bytes,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        self.bytes.clear();
        Some(buffer)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;

    #[test]
    fn slots_are_aligned_and_zero_filled() {
        let mut arena = DynamicUniformBuffer::new(256);
        let a = arena.push(Some(&UniformValue::Mat4(Mat4::IDENTITY)), 64);
        let b = arena.push(None, 16);
        let c = arena.push(Some(&UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0))), 16);
        assert_eq!((a, b, c), (0, 256, 512));
        assert_eq!(arena.bytes.len(), 512 + 16);
        assert!(arena.bytes[256..272].iter().all(|&byte| byte == 0));
        let expected: &[u8] = bytemuck::cast_slice(&[1.0f32, 2.0, 3.0, 0.0]);
        assert_eq!(&arena.bytes[512..528], expected);
    }
}
