//! Math primitives.
//!
//! Vectors and matrices are plain `glam` values: column-major, `Copy`, and
//! composed by explicit chaining. Nothing here touches the GPU.

pub use glam::{Mat4, Vec3, Vec4};

const DEGENERATE_EPSILON: f32 = 1e-12;

/// Builds a right-handed view matrix from an eye position, a target and an up hint.
///
/// The basis is `z = normalize(eye - target)`, `x = normalize(up × z)`,
/// `y = z × x`; the result is the inverse of the camera's world transform.
///
/// Returns `None` when `eye == target`. When `up` is parallel to the view
/// direction a secondary up axis is substituted.
#[must_use]
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Option<Mat4> {
    let forward = eye - target;
    if forward.length_squared() < DEGENERATE_EPSILON {
        return None;
    }
    let z = forward.normalize();

    let mut x = up.cross(z);
    if x.length_squared() < DEGENERATE_EPSILON {
        let fallback = if z.z.abs() < 0.999 { Vec3::Z } else { Vec3::X };
        log::warn!("look_at: up {up} is parallel to view direction {z}, substituting {fallback}");
        x = fallback.cross(z);
    }
    let x = x.normalize();
    let y = z.cross(x);

    Some(Mat4::from_cols(
        Vec4::new(x.x, y.x, z.x, 0.0),
        Vec4::new(x.y, y.y, z.y, 0.0),
        Vec4::new(x.z, y.z, z.z, 0.0),
        Vec4::new(-x.dot(eye), -y.dot(eye), -z.dot(eye), 1.0),
    ))
}

/// Right-handed perspective projection with `f = 1 / tan(fov_y / 2)`.
///
/// Depth maps to the 0..1 clip range used by wgpu.
#[must_use]
pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (0.5 * fov_y).tan();
    let range = far / (near - far);
    Mat4::from_cols(
        Vec4::new(f / aspect, 0.0, 0.0, 0.0),
        Vec4::new(0.0, f, 0.0, 0.0),
        Vec4::new(0.0, 0.0, range, -1.0),
        Vec4::new(0.0, 0.0, range * near, 0.0),
    )
}

/// Composes a model matrix as translate, then rotate X, Y, Z, then scale.
///
/// Applied to a vertex, scale acts first, then Z, Y and X rotations, then translation.
#[must_use]
pub fn compose_model(position: Vec3, rotation: Vec3, scale: Vec3) -> Mat4 {
    Mat4::from_translation(position)
        * Mat4::from_rotation_x(rotation.x)
        * Mat4::from_rotation_y(rotation.y)
        * Mat4::from_rotation_z(rotation.z)
        * Mat4::from_scale(scale)
}
