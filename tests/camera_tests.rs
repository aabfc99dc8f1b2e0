//! Camera tests
//!
//! Tests for:
//! - Default placement and derived matrices
//! - Aspect updates
//! - Degenerate camera handling

use std::f32::consts::FRAC_PI_4;

use glam::{Mat4, Vec3};
use glint::GlintError;
use glint::scene::camera::Camera;

const EPSILON: f32 = 1e-5;

fn test_camera() -> Camera {
    Camera::new(1.0, FRAC_PI_4, 0.1, 100.0)
}

#[test]
fn camera_defaults_look_at_origin_from_positive_z() {
    let camera = test_camera();
    assert_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0));
    assert_eq!(camera.target, Vec3::ZERO);
    assert_eq!(camera.up, Vec3::Y);

    let expected = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    assert!(camera.view_matrix().abs_diff_eq(expected, EPSILON));
}

#[test]
fn camera_projection_matches_parameters() {
    let camera = test_camera();
    let expected = Mat4::perspective_rh(FRAC_PI_4, 1.0, 0.1, 100.0);
    assert!(camera.projection_matrix().abs_diff_eq(expected, EPSILON));
}

#[test]
fn camera_view_follows_position() {
    let mut camera = test_camera();
    camera.position = Vec3::new(3.0, 2.0, 1.0);
    camera.update_view_matrix().unwrap();

    let expected = Mat4::look_at_rh(Vec3::new(3.0, 2.0, 1.0), Vec3::ZERO, Vec3::Y);
    assert!(camera.view_matrix().abs_diff_eq(expected, EPSILON));
}

#[test]
fn camera_set_aspect_updates_projection() {
    let mut camera = test_camera();
    camera.set_aspect(2.0);
    assert_eq!(camera.aspect, 2.0);

    let expected = Mat4::perspective_rh(FRAC_PI_4, 2.0, 0.1, 100.0);
    assert!(camera.projection_matrix().abs_diff_eq(expected, EPSILON));
}

#[test]
fn camera_position_on_target_is_degenerate() {
    let mut camera = test_camera();
    let before = camera.view_matrix();
    camera.position = Vec3::ZERO;

    let err = camera.update_view_matrix().unwrap_err();
    assert!(matches!(err, GlintError::DegenerateCamera(p) if p == Vec3::ZERO));
    // previous matrix is kept
    assert_eq!(camera.view_matrix(), before);
}

#[test]
fn camera_straight_down_has_no_nan() {
    let mut camera = test_camera();
    camera.position = Vec3::new(0.0, 10.0, 0.0);
    camera.update_view_matrix().unwrap();
    assert!(camera.view_matrix().is_finite());
}
