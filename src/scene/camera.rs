//! Perspective camera.
//!
//! Position, target and up are authoritative; the view and projection
//! matrices are derived and only refreshed by the `update_*` methods.

use glam::{Mat4, Vec3};

use crate::errors::{GlintError, Result};
use crate::math::{look_at, perspective};

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,

    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    view_matrix: Mat4,
    projection_matrix: Mat4,
}

impl Camera {
    /// Camera at (0, 0, 5) looking at the origin with +Y up.
    #[must_use]
    pub fn new(aspect: f32, fov: f32, near: f32, far: f32) -> Self {
        let position = Vec3::new(0.0, 0.0, 5.0);
        let target = Vec3::ZERO;
        let up = Vec3::Y;
        Self {
            position,
            target,
            up,
            fov,
            aspect,
            near,
            far,
            view_matrix: look_at(position, target, up).unwrap_or(Mat4::IDENTITY),
            projection_matrix: perspective(fov, aspect, near, far),
        }
    }

    /// Recomputes the view matrix from position, target and up.
    ///
    /// Fails when position and target coincide; the previous matrix is kept.
    pub fn update_view_matrix(&mut self) -> Result<()> {
        self.view_matrix =
            look_at(self.position, self.target, self.up).ok_or(GlintError::DegenerateCamera(self.position))?;
        Ok(())
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection_matrix = perspective(self.fov, self.aspect, self.near, self.far);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection_matrix();
    }

    pub fn look_at(&mut self, target: Vec3) -> Result<()> {
        self.target = target;
        self.update_view_matrix()
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }
}
