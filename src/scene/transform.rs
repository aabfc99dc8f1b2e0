use glam::{Mat4, Vec3};

use crate::math::compose_model;

/// Local placement of a mesh: position, Euler rotation (radians, applied
/// Z then Y then X to a vertex) and per-axis scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        compose_model(self.position, self.rotation, self.scale)
    }
}
