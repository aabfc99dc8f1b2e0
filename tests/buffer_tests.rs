//! GPU buffer tests
//!
//! Tests for:
//! - Sequencing errors (upload before create_vao, draw before create_vao)
//! - Index format selection and indexed draws
//! - Handle release on dispose and on attribute replacement
//! - Attribute location changes

use glint::GlintError;
use glint::renderer::device::GraphicsDevice;
use glint::renderer::headless::{Command, HeadlessDevice};
use glint::resources::buffer::GpuBuffer;
use glint::resources::shader_program::ShaderProgram;

const VS: &str = r"
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 1.0);
}
";

const FS: &str = r"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
";

const TRIANGLE: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

fn device_with_program() -> (HeadlessDevice, ShaderProgram) {
    let mut device = HeadlessDevice::new(64, 64);
    let program = ShaderProgram::new(&mut device, VS, FS).unwrap();
    program.use_program(&mut device).unwrap();
    (device, program)
}

// ============================================================================
// Sequencing
// ============================================================================

#[test]
fn create_array_before_create_vao_fails() {
    let mut device = HeadlessDevice::new(64, 64);
    let mut buffer = GpuBuffer::new();
    let err = buffer
        .create_array(&mut device, "position", 0, &TRIANGLE, 3)
        .unwrap_err();
    assert!(matches!(err, GlintError::NoActiveLayout(ref name) if name == "position"));
    assert_eq!(device.stats().live_buffers, 0);
}

#[test]
fn create_element_before_create_vao_fails() {
    let mut device = HeadlessDevice::new(64, 64);
    let mut buffer = GpuBuffer::new();
    let err = buffer.create_element(&mut device, &[0, 1, 2]).unwrap_err();
    assert!(matches!(err, GlintError::NoActiveLayout(_)));
}

#[test]
fn draw_before_create_vao_fails() {
    let (mut device, _program) = device_with_program();
    let buffer = GpuBuffer::new();
    let err = buffer.draw(&mut device, 3).unwrap_err();
    assert!(matches!(err, GlintError::LayoutNotCreated));
}

#[test]
fn create_array_rejects_bad_component_count() {
    let mut device = HeadlessDevice::new(64, 64);
    let mut buffer = GpuBuffer::new();
    buffer.create_vao(&mut device).unwrap();
    let err = buffer
        .create_array(&mut device, "position", 0, &TRIANGLE, 5)
        .unwrap_err();
    assert!(matches!(err, GlintError::InvalidVertexData(_)));
    let err = buffer
        .create_array(&mut device, "position", 0, &TRIANGLE[..8], 3)
        .unwrap_err();
    assert!(matches!(err, GlintError::InvalidVertexData(_)));
}

#[test]
fn create_vao_twice_reuses_layout() {
    let mut device = HeadlessDevice::new(64, 64);
    let mut buffer = GpuBuffer::new();
    let first = buffer.create_vao(&mut device).unwrap();
    let second = buffer.create_vao(&mut device).unwrap();
    assert_eq!(first, second);
    assert_eq!(device.stats().live_layouts, 1);
}

// ============================================================================
// Draws
// ============================================================================

#[test]
fn non_indexed_draw_issues_draw_arrays() {
    let (mut device, program) = device_with_program();
    let mut buffer = GpuBuffer::new();
    buffer.begin(&mut device).unwrap();
    buffer.create_array(&mut device, "position", 0, &TRIANGLE, 3).unwrap();
    buffer.end(&mut device).unwrap();

    buffer.draw(&mut device, 3).unwrap();
    assert_eq!(
        device.commands(),
        &[Command::DrawArrays {
            program: program.id().unwrap(),
            count: 3
        }]
    );
    // draw leaves nothing bound
    assert!(device.objects().bound_layout().is_none());
}

#[test]
fn small_indices_draw_as_uint16() {
    let (mut device, _program) = device_with_program();
    let mut buffer = GpuBuffer::new();
    buffer.begin(&mut device).unwrap();
    buffer.create_array(&mut device, "position", 0, &TRIANGLE, 3).unwrap();
    buffer.create_element(&mut device, &[0, 1, 2]).unwrap();
    buffer.end(&mut device).unwrap();

    assert_eq!(buffer.index_format(), Some(wgpu::IndexFormat::Uint16));
    buffer.draw(&mut device, 3).unwrap();
    assert!(matches!(
        device.commands(),
        [Command::DrawElements {
            count: 3,
            format: wgpu::IndexFormat::Uint16,
            ..
        }]
    ));
}

#[test]
fn large_indices_draw_as_uint32() {
    let (mut device, _program) = device_with_program();
    let mut buffer = GpuBuffer::new();
    buffer.begin(&mut device).unwrap();
    buffer.create_array(&mut device, "position", 0, &TRIANGLE, 3).unwrap();
    buffer.create_element(&mut device, &[0, 1, 70_000]).unwrap();
    buffer.end(&mut device).unwrap();

    assert_eq!(buffer.index_format(), Some(wgpu::IndexFormat::Uint32));
    buffer.draw(&mut device, 3).unwrap();
    assert!(matches!(
        device.commands(),
        [Command::DrawElements {
            format: wgpu::IndexFormat::Uint32,
            ..
        }]
    ));
}

#[test]
fn draw_without_program_fails() {
    let mut device = HeadlessDevice::new(64, 64);
    let mut buffer = GpuBuffer::new();
    buffer.begin(&mut device).unwrap();
    buffer.create_array(&mut device, "position", 0, &TRIANGLE, 3).unwrap();
    buffer.end(&mut device).unwrap();

    let err = buffer.draw(&mut device, 3).unwrap_err();
    assert!(matches!(err, GlintError::NoActiveProgram));
    assert!(device.commands().is_empty());
}

#[test]
fn draw_past_buffer_end_fails() {
    let (mut device, _program) = device_with_program();
    let mut buffer = GpuBuffer::new();
    buffer.begin(&mut device).unwrap();
    buffer.create_array(&mut device, "position", 0, &TRIANGLE, 3).unwrap();
    buffer.end(&mut device).unwrap();

    let err = buffer.draw(&mut device, 6).unwrap_err();
    assert!(matches!(err, GlintError::InvalidVertexData(_)));
}

// ============================================================================
// Release
// ============================================================================

#[test]
fn replacing_an_array_releases_the_old_buffer() {
    let mut device = HeadlessDevice::new(64, 64);
    let mut buffer = GpuBuffer::new();
    buffer.begin(&mut device).unwrap();
    buffer.create_array(&mut device, "position", 0, &TRIANGLE, 3).unwrap();
    let old = buffer.buffer("position").unwrap();
    buffer.create_array(&mut device, "position", 0, &TRIANGLE, 3).unwrap();

    assert_ne!(buffer.buffer("position"), Some(old));
    assert_eq!(buffer.buffer_count(), 1);
    let stats = device.stats();
    assert_eq!(stats.live_buffers, 1);
    assert_eq!(stats.released_buffers, 1);
}

#[test]
fn moving_an_array_detaches_its_old_location() {
    let (mut device, program) = device_with_program();
    let mut buffer = GpuBuffer::new();
    buffer.begin(&mut device).unwrap();
    buffer.create_array(&mut device, "position", 0, &TRIANGLE, 3).unwrap();
    buffer.create_array(&mut device, "position", 1, &TRIANGLE, 3).unwrap();
    buffer.end(&mut device).unwrap();

    let layout = device.objects().layout(buffer.layout().unwrap()).unwrap();
    assert!(layout.attribute(0).is_none());
    assert_eq!(layout.attribute(1).map(|b| b.buffer), buffer.buffer("position"));
    assert_eq!(device.stats().live_buffers, 1);

    // location 0 now reads the default attribute
    buffer.draw(&mut device, 3).unwrap();
    assert_eq!(
        device.commands(),
        &[Command::DrawArrays {
            program: program.id().unwrap(),
            count: 3
        }]
    );
}

#[test]
fn moving_an_array_keeps_a_slot_taken_over_by_another_name() {
    let mut device = HeadlessDevice::new(64, 64);
    let mut buffer = GpuBuffer::new();
    buffer.begin(&mut device).unwrap();
    buffer.create_array(&mut device, "position", 0, &TRIANGLE, 3).unwrap();
    buffer.create_array(&mut device, "normal", 0, &TRIANGLE, 3).unwrap();
    buffer.create_array(&mut device, "position", 1, &TRIANGLE, 3).unwrap();

    let layout = device.objects().layout(buffer.layout().unwrap()).unwrap();
    assert_eq!(layout.attribute(0).map(|b| b.buffer), buffer.buffer("normal"));
    assert_eq!(layout.attribute(1).map(|b| b.buffer), buffer.buffer("position"));
}

#[test]
fn dispose_twice_releases_once() {
    let mut device = HeadlessDevice::new(64, 64);
    let mut buffer = GpuBuffer::new();
    buffer.begin(&mut device).unwrap();
    buffer.create_array(&mut device, "position", 0, &TRIANGLE, 3).unwrap();
    buffer.create_array(&mut device, "uv", 2, &[0.0; 6], 2).unwrap();
    buffer.create_element(&mut device, &[0, 1, 2]).unwrap();
    buffer.end(&mut device).unwrap();

    buffer.dispose(&mut device);
    let after_first = device.stats();
    assert_eq!(after_first.live_buffers, 0);
    assert_eq!(after_first.live_layouts, 0);
    assert_eq!(after_first.released_buffers, 3);
    assert_eq!(after_first.released_layouts, 1);

    buffer.dispose(&mut device);
    assert_eq!(device.stats(), after_first);
    assert!(buffer.layout().is_none());
    assert_eq!(buffer.buffer_count(), 0);
}
