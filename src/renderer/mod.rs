//! Renderer
//!
//! The [`Renderer`] owns the [`GraphicsContext`] and an insertion-ordered
//! list of meshes. Meshes are uploaded when added, never at construction;
//! [`Renderer::render`] clears, refreshes the camera and draws every mesh in
//! the order it was added.

pub mod context;
pub mod device;
pub mod headless;
pub mod objects;
pub mod settings;
pub mod wgpu_device;

mod dynamic_buffer;
mod pipeline;
mod shader_reflect;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::errors::Result;
use crate::resources::mesh::Mesh;
use crate::scene::camera::Camera;

use self::context::GraphicsContext;
use self::device::Viewport;
use self::settings::{RendererSettings, WgpuSettings};

/// Position of a mesh inside its [`Renderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(usize);

impl MeshHandle {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

pub struct Renderer {
    context: GraphicsContext,
    settings: RendererSettings,
    meshes: Vec<Mesh>,
}

impl Renderer {
    /// Takes ownership of `context` and applies the fixed-function state.
    #[must_use]
    pub fn new(mut context: GraphicsContext, settings: RendererSettings) -> Self {
        let (width, height) = context.size();
        let device = context.device_mut();
        device.set_render_state(settings.render_state());
        device.set_viewport(Viewport::full(width, height));
        log::info!(
            "Renderer created: clear color {}, depth test {}, back-face culling {}",
            settings.clear_color,
            settings.depth_test,
            settings.cull_back_faces
        );
        Self {
            context,
            settings,
            meshes: Vec::new(),
        }
    }

    /// A renderer over a headless device.
    #[must_use]
    pub fn headless(width: u32, height: u32, settings: RendererSettings) -> Self {
        Self::new(GraphicsContext::headless(width, height), settings)
    }

    /// A renderer presenting to `window` through wgpu.
    pub fn with_window<W>(
        window: W,
        width: u32,
        height: u32,
        settings: RendererSettings,
        wgpu_settings: &WgpuSettings,
    ) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let context = GraphicsContext::for_window(window, width, height, wgpu_settings, settings.transparent)?;
        Ok(Self::new(context, settings))
    }

    /// Uploads the mesh geometry, compiles its material and appends it to
    /// the draw list.
    ///
    /// On failure the mesh's GPU objects are released and the mesh is dropped.
    pub fn add(&mut self, mut mesh: Mesh) -> Result<MeshHandle> {
        let device = self.context.device_mut();
        if let Err(e) = mesh.prepare(device) {
            mesh.dispose(device);
            return Err(e);
        }
        self.meshes.push(mesh);
        let handle = MeshHandle(self.meshes.len() - 1);
        log::debug!("Added mesh {}", handle.0);
        Ok(handle)
    }

    /// Draws one frame.
    ///
    /// The camera's view and projection matrices are recomputed first, every
    /// frame.
    pub fn render(&mut self, camera: &mut Camera) -> Result<()> {
        let device = self.context.device_mut();
        device.clear(self.settings.clear_rgba());

        camera.update_view_matrix()?;
        camera.update_projection_matrix();
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();

        for mesh in &mut self.meshes {
            mesh.render(device, view, projection)?;
        }
        device.present()
    }

    /// Resizes the drawing surface and the viewport.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
        self.context
            .device_mut()
            .set_viewport(Viewport::full(width, height));
    }

    pub fn set_clear_color(&mut self, color: glam::Vec3) {
        self.settings.clear_color = color;
    }

    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    #[must_use]
    pub fn context(&self) -> &GraphicsContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut GraphicsContext {
        &mut self.context
    }

    #[must_use]
    pub fn mesh(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.meshes.get(handle.0)
    }

    pub fn mesh_mut(&mut self, handle: MeshHandle) -> Option<&mut Mesh> {
        self.meshes.get_mut(handle.0)
    }

    /// Meshes in draw order.
    #[must_use]
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Releases every mesh's GPU objects. Called on drop.
    pub fn dispose(&mut self) {
        if self.meshes.is_empty() {
            return;
        }
        let device = self.context.device_mut();
        for mesh in &mut self.meshes {
            mesh.dispose(device);
        }
        log::debug!("Disposed {} meshes", self.meshes.len());
        self.meshes.clear();
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.dispose();
    }
}
