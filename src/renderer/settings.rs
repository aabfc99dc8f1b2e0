//! Renderer Settings
//!
//! Two configuration structs, both consumed once at construction:
//!
//! - [`RendererSettings`]: what the [`Renderer`](crate::Renderer) does each
//!   frame (clear color, transparency, fixed-function state).
//! - [`WgpuSettings`]: how the wgpu backend acquires its adapter, device and
//!   surface.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use glint::{RendererSettings, Vec3};
//!
//! let settings = RendererSettings {
//!     clear_color: Vec3::new(0.05, 0.05, 0.1),
//!     ..Default::default()
//! };
//! ```

use glam::Vec3;

use crate::renderer::device::RenderState;

// ---------------------------------------------------------------------------
// RendererSettings
// ---------------------------------------------------------------------------

/// Per-frame behaviour of the renderer.
///
/// | Field             | Description                               | Default         |
/// |-------------------|-------------------------------------------|-----------------|
/// | `clear_color`     | Color the surface is cleared to           | (0.1, 0.1, 0.1) |
/// | `transparent`     | Clear with alpha 0 instead of 1           | `false`         |
/// | `depth_test`      | Depth test with less-or-equal compare     | `true`          |
/// | `cull_back_faces` | Cull back faces                           | `true`          |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererSettings {
    pub clear_color: Vec3,
    /// Clear to a fully transparent background. The window surface is
    /// configured with a pre- or post-multiplied alpha mode when the platform
    /// offers one.
    pub transparent: bool,
    pub depth_test: bool,
    pub cull_back_faces: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            clear_color: Vec3::splat(0.1),
            transparent: false,
            depth_test: true,
            cull_back_faces: true,
        }
    }
}

impl RendererSettings {
    /// The clear color including the alpha implied by `transparent`.
    #[inline]
    #[must_use]
    pub fn clear_rgba(&self) -> wgpu::Color {
        wgpu::Color {
            r: f64::from(self.clear_color.x),
            g: f64::from(self.clear_color.y),
            b: f64::from(self.clear_color.z),
            a: if self.transparent { 0.0 } else { 1.0 },
        }
    }

    #[inline]
    #[must_use]
    pub fn render_state(&self) -> RenderState {
        RenderState {
            depth_test: self.depth_test,
            cull_back_faces: self.cull_back_faces,
        }
    }
}

// ---------------------------------------------------------------------------
// WgpuSettings
// ---------------------------------------------------------------------------

/// GPU acquisition settings for the wgpu backend.
///
/// | Field              | Description                              | Default            |
/// |--------------------|------------------------------------------|--------------------|
/// | `vsync`            | Vertical sync enabled                    | `true`             |
/// | `backends`         | Forced wgpu backend (or auto)            | `None`             |
/// | `power_preference` | GPU adapter selection strategy           | `HighPerformance`  |
/// | `required_features`| Required wgpu features                   | Empty              |
/// | `required_limits`  | Required wgpu limits                     | Default            |
/// | `depth_format`     | Depth buffer texture format              | `Depth32Float`     |
#[derive(Debug, Clone)]
pub struct WgpuSettings {
    /// Enable vertical synchronization (VSync).
    pub vsync: bool,

    /// Force a specific wgpu backend (Vulkan, Metal, DX12, …).
    ///
    /// `None` lets wgpu choose the best available backend for the platform.
    pub backends: Option<wgpu::Backends>,

    pub power_preference: wgpu::PowerPreference,

    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    pub depth_format: wgpu::TextureFormat,
}

impl Default for WgpuSettings {
    fn default() -> Self {
        Self {
            vsync: true,
            backends: None,
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            depth_format: wgpu::TextureFormat::Depth32Float,
        }
    }
}
