#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod errors;
pub mod math;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use errors::{GlintError, Result};
pub use glam::{Mat4, Vec3};
pub use renderer::context::GraphicsContext;
pub use renderer::device::{GraphicsDevice, RenderState, UniformValue, Viewport};
pub use renderer::headless::{Command, HeadlessDevice};
pub use renderer::settings::{RendererSettings, WgpuSettings};
pub use renderer::wgpu_device::WgpuDevice;
pub use renderer::{MeshHandle, Renderer};
pub use resources::primitives::*;
pub use resources::{Geometry, GpuBuffer, Material, MaterialDescriptor, Mesh, ShaderProgram, basic_lit};
pub use scene::{Camera, Transform};
