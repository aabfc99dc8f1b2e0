//! Mesh
//!
//! A geometry and a material placed by a [`Transform`]. The mesh owns both
//! and releases them in [`Mesh::dispose`].

use glam::Mat4;

use crate::errors::Result;
use crate::renderer::device::GraphicsDevice;
use crate::resources::geometry::Geometry;
use crate::resources::material::Material;
use crate::scene::transform::Transform;

pub const MODEL_MATRIX: &str = "modelMatrix";
pub const VIEW_MATRIX: &str = "viewMatrix";
pub const PROJECTION_MATRIX: &str = "projectionMatrix";

#[derive(Debug)]
pub struct Mesh {
    pub geometry: Geometry,
    pub material: Material,
    pub transform: Transform,
    model_matrix: Mat4,
}

impl Mesh {
    #[must_use]
    pub fn new(geometry: Geometry, material: Material) -> Self {
        Self {
            geometry,
            material,
            transform: Transform::default(),
            model_matrix: Mat4::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self.update_model_matrix();
        self
    }

    /// Model matrix as of the last [`update_model_matrix`](Self::update_model_matrix).
    #[inline]
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        self.model_matrix
    }

    pub fn update_model_matrix(&mut self) -> Mat4 {
        self.model_matrix = self.transform.matrix();
        self.model_matrix
    }

    /// Uploads the geometry and compiles the material, skipping whichever
    /// is already done.
    pub fn prepare(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if !self.geometry.is_uploaded() {
            self.geometry.upload(device)?;
        }
        self.material.compile(device)
    }

    /// Draws with a freshly computed model matrix.
    pub fn render(&mut self, device: &mut dyn GraphicsDevice, view: Mat4, projection: Mat4) -> Result<()> {
        let model = self.update_model_matrix();
        self.material.activate(device)?;
        self.material.set_matrix4(device, MODEL_MATRIX, model)?;
        self.material.set_matrix4(device, VIEW_MATRIX, view)?;
        self.material.set_matrix4(device, PROJECTION_MATRIX, projection)?;
        self.geometry.draw(device)
    }

    pub fn dispose(&mut self, device: &mut dyn GraphicsDevice) {
        self.geometry.dispose(device);
        self.material.dispose(device);
    }
}
