//! Geometry tests
//!
//! Tests for:
//! - Box primitive layout
//! - Geometry array validation
//! - Upload / draw / dispose sequencing

use glam::Vec3;
use glint::renderer::device::GraphicsDevice;
use glint::renderer::headless::HeadlessDevice;
use glint::resources::buffer::INDEX_KEY;
use glint::resources::geometry::Geometry;
use glint::resources::primitives::create_box;
use glint::GlintError;

fn triangle() -> Geometry {
    Geometry::new(
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        None,
        None,
        None,
    )
    .unwrap()
}

// ============================================================================
// Box primitive
// ============================================================================

#[test]
fn box_has_24_vertices_and_36_indices() {
    let geometry = create_box(1.0, 1.0, 1.0);
    assert_eq!(geometry.positions().len(), 72);
    assert_eq!(geometry.normals().unwrap().len(), 72);
    assert_eq!(geometry.uvs().unwrap().len(), 48);

    let indices = geometry.indices().unwrap();
    assert_eq!(indices.len(), 36);
    assert!(indices.iter().all(|&i| i < 24));
    assert_eq!(geometry.vertex_count(), 24);
    assert_eq!(geometry.draw_count(), 36);
}

#[test]
fn box_spans_half_extents() {
    let geometry = create_box(2.0, 4.0, 6.0);
    let positions = geometry.positions();
    for axis in 0..3 {
        let values = positions.iter().skip(axis).step_by(3);
        let max = values.clone().fold(f32::MIN, |a, &b| a.max(b));
        let min = values.fold(f32::MAX, |a, &b| a.min(b));
        let half = [1.0, 2.0, 3.0][axis];
        assert_eq!(max, half);
        assert_eq!(min, -half);
    }
}

#[test]
fn box_faces_wind_counter_clockwise_outward() {
    let geometry = create_box(1.0, 1.0, 1.0);
    let positions = geometry.positions();
    let normals = geometry.normals().unwrap();
    let vertex = |i: u32| {
        let i = i as usize * 3;
        Vec3::new(positions[i], positions[i + 1], positions[i + 2])
    };

    for triangle in geometry.indices().unwrap().chunks(3) {
        let (a, b, c) = (vertex(triangle[0]), vertex(triangle[1]), vertex(triangle[2]));
        let face_normal = (b - a).cross(c - a).normalize();
        let n = triangle[0] as usize * 3;
        let stored = Vec3::new(normals[n], normals[n + 1], normals[n + 2]);
        assert!(face_normal.dot(stored) > 0.99, "triangle {triangle:?}");
        // outward: normal points away from the center
        assert!(a.dot(stored) > 0.0);
    }
}

#[test]
fn box_uvs_stay_in_unit_square() {
    let geometry = create_box(1.0, 1.0, 1.0);
    assert!(geometry.uvs().unwrap().iter().all(|&v| (0.0..=1.0).contains(&v)));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn geometry_rejects_partial_position() {
    let err = Geometry::new(vec![0.0, 1.0], None, None, None).unwrap_err();
    assert!(matches!(err, GlintError::InvalidVertexData(_)));
}

#[test]
fn geometry_rejects_mismatched_normals() {
    let err = Geometry::new(vec![0.0; 9], Some(vec![0.0; 6]), None, None).unwrap_err();
    assert!(matches!(err, GlintError::InvalidVertexData(_)));
}

#[test]
fn geometry_rejects_mismatched_uvs() {
    let err = Geometry::new(vec![0.0; 9], None, Some(vec![0.0; 4]), None).unwrap_err();
    assert!(matches!(err, GlintError::InvalidVertexData(_)));
}

#[test]
fn geometry_rejects_out_of_range_index() {
    let err = Geometry::new(vec![0.0; 9], None, None, Some(vec![0, 1, 3])).unwrap_err();
    assert!(matches!(err, GlintError::InvalidVertexData(_)));
}

#[test]
fn geometry_treats_empty_optionals_as_absent() {
    let geometry = Geometry::new(vec![0.0; 9], Some(vec![]), Some(vec![]), Some(vec![])).unwrap();
    assert!(geometry.normals().is_none());
    assert!(geometry.uvs().is_none());
    assert!(geometry.indices().is_none());
    assert_eq!(geometry.draw_count(), 3);
}

// ============================================================================
// Upload lifecycle
// ============================================================================

#[test]
fn geometry_draw_before_upload_fails() {
    let mut device = HeadlessDevice::new(64, 64);
    let geometry = triangle();
    let err = geometry.draw(&mut device).unwrap_err();
    assert!(matches!(err, GlintError::GeometryNotUploaded));
}

#[test]
fn geometry_upload_creates_one_buffer_per_array() {
    let mut device = HeadlessDevice::new(64, 64);
    let mut geometry = create_box(1.0, 1.0, 1.0);
    geometry.upload(&mut device).unwrap();

    assert!(geometry.is_uploaded());
    let buffer = geometry.buffer();
    assert_eq!(buffer.buffer_count(), 4);
    for name in ["position", "normal", "uv", INDEX_KEY] {
        assert!(buffer.buffer(name).is_some(), "missing {name}");
    }
    assert_eq!(buffer.index_format(), Some(wgpu::IndexFormat::Uint16));

    let stats = device.stats();
    assert_eq!(stats.live_layouts, 1);
    assert_eq!(stats.live_buffers, 4);
    // upload leaves no layout bound
    assert!(device.objects().bound_layout().is_none());
}

#[test]
fn geometry_second_upload_is_rejected() {
    let mut device = HeadlessDevice::new(64, 64);
    let mut geometry = triangle();
    geometry.upload(&mut device).unwrap();
    let err = geometry.upload(&mut device).unwrap_err();
    assert!(matches!(err, GlintError::GeometryAlreadyUploaded));
    assert_eq!(device.stats().live_buffers, 1);
}

#[test]
fn geometry_dispose_allows_reupload() {
    let mut device = HeadlessDevice::new(64, 64);
    let mut geometry = triangle();
    geometry.upload(&mut device).unwrap();
    geometry.dispose(&mut device);

    assert!(!geometry.is_uploaded());
    assert_eq!(device.stats().live_buffers, 0);
    assert_eq!(device.stats().live_layouts, 0);

    geometry.upload(&mut device).unwrap();
    assert_eq!(device.stats().live_buffers, 1);
}
