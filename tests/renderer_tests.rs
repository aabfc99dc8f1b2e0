//! Renderer tests
//!
//! Tests for:
//! - End-to-end frame on the headless device
//! - Deferred upload on add
//! - Per-frame matrix refresh
//! - Resize, clear color and dispose
//! - Command log retention

use std::f32::consts::FRAC_PI_4;

use glam::{Mat4, Vec3};
use glint::renderer::device::{GraphicsDevice, RenderState, UniformValue, Viewport};
use glint::renderer::headless::{Command, HeadlessDevice};
use glint::resources::geometry::Geometry;
use glint::resources::material::{Material, MaterialDescriptor};
use glint::resources::mesh::Mesh;
use glint::resources::primitives::create_box;
use glint::scene::camera::Camera;
use glint::scene::transform::Transform;
use glint::{GlintError, Renderer, RendererSettings};

const EPSILON: f32 = 1e-5;

fn settings() -> RendererSettings {
    RendererSettings {
        clear_color: Vec3::new(0.05, 0.05, 0.1),
        ..Default::default()
    }
}

fn box_mesh(position: Vec3, color: Vec3) -> Mesh {
    Mesh::new(create_box(1.0, 1.0, 1.0), Material::basic_lit(color)).with_transform(Transform::from_position(position))
}

fn camera() -> Camera {
    Camera::new(1.0, FRAC_PI_4, 0.1, 100.0)
}

fn headless(renderer: &Renderer) -> &HeadlessDevice {
    renderer.context().backend::<HeadlessDevice>().unwrap()
}

fn headless_mut(renderer: &mut Renderer) -> &mut HeadlessDevice {
    renderer.context_mut().backend_mut::<HeadlessDevice>().unwrap()
}

fn draw_commands(device: &HeadlessDevice) -> Vec<Command> {
    device.draw_calls().copied().collect()
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn single_box_frame_issues_one_indexed_draw() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut renderer = Renderer::headless(800, 800, settings());
    renderer.add(box_mesh(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.8, 0.2, 0.3))).unwrap();
    let mut camera = camera();
    renderer.render(&mut camera).unwrap();

    let device = headless(&renderer);
    let draws = draw_commands(device);
    assert_eq!(draws.len(), 1);
    assert!(matches!(
        draws[0],
        Command::DrawElements {
            count: 36,
            format: wgpu::IndexFormat::Uint16,
            ..
        }
    ));
    assert_eq!(device.frames(), 1);
}

#[test]
fn frame_is_clear_then_draws_then_present() {
    let mut renderer = Renderer::headless(800, 600, settings());
    renderer.add(box_mesh(Vec3::ZERO, Vec3::ONE)).unwrap();
    let mut camera = camera();
    renderer.render(&mut camera).unwrap();

    let commands = headless(&renderer).commands().to_vec();
    assert_eq!(
        commands[..2],
        [
            Command::SetRenderState(RenderState::default()),
            Command::SetViewport(Viewport::full(800, 600)),
        ]
    );
    assert_eq!(
        commands[2],
        Command::Clear(wgpu::Color {
            r: f64::from(0.05f32),
            g: f64::from(0.05f32),
            b: f64::from(0.1f32),
            a: 1.0,
        })
    );
    assert!(matches!(commands[3], Command::DrawElements { .. }));
    assert_eq!(commands[4], Command::Present);
    assert_eq!(commands.len(), 5);
}

#[test]
fn meshes_draw_in_insertion_order() {
    let mut renderer = Renderer::headless(64, 64, settings());
    let first = renderer.add(box_mesh(Vec3::Y, Vec3::X)).unwrap();
    let second = renderer.add(box_mesh(Vec3::NEG_Y, Vec3::Z)).unwrap();
    renderer.render(&mut camera()).unwrap();

    let program_of = |handle| {
        renderer
            .mesh(handle)
            .unwrap()
            .material
            .program()
            .unwrap()
            .id()
            .unwrap()
    };
    let expected = [program_of(first), program_of(second)];
    let drawn: Vec<_> = draw_commands(headless(&renderer))
        .into_iter()
        .map(|c| match c {
            Command::DrawElements { program, .. } => program,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(drawn, expected);
}

#[test]
fn transparent_clears_with_zero_alpha() {
    let mut renderer = Renderer::headless(
        64,
        64,
        RendererSettings {
            transparent: true,
            ..settings()
        },
    );
    renderer.render(&mut camera()).unwrap();

    let cleared = headless(&renderer)
        .commands()
        .iter()
        .find_map(|c| match c {
            Command::Clear(color) => Some(*color),
            _ => None,
        })
        .unwrap();
    assert_eq!(cleared.a, 0.0);
}

// ============================================================================
// Upload on add
// ============================================================================

#[test]
fn add_uploads_geometry_and_compiles_material() {
    let mut renderer = Renderer::headless(64, 64, settings());
    let mesh = box_mesh(Vec3::ZERO, Vec3::ONE);
    assert!(!mesh.geometry.is_uploaded());
    assert!(!mesh.material.is_compiled());

    let handle = renderer.add(mesh).unwrap();
    let mesh = renderer.mesh(handle).unwrap();
    assert!(mesh.geometry.is_uploaded());
    assert!(mesh.material.is_compiled());

    let stats = headless(&renderer).stats();
    assert_eq!(stats.live_buffers, 4);
    assert_eq!(stats.live_programs, 1);
}

#[test]
fn add_with_broken_material_releases_geometry() {
    let mut renderer = Renderer::headless(64, 64, settings());
    let mesh = Mesh::new(
        create_box(1.0, 1.0, 1.0),
        Material::new(MaterialDescriptor::new("not wgsl", "not wgsl")),
    );
    let err = renderer.add(mesh).unwrap_err();
    assert!(matches!(err, GlintError::ShaderCompilation { .. }));

    assert!(renderer.meshes().is_empty());
    let stats = headless(&renderer).stats();
    assert_eq!(stats.live_buffers, 0);
    assert_eq!(stats.live_layouts, 0);
}

#[test]
fn geometry_without_normals_still_draws() {
    let mut renderer = Renderer::headless(64, 64, settings());
    let geometry = Geometry::new(
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        None,
        None,
        None,
    )
    .unwrap();
    renderer.add(Mesh::new(geometry, Material::basic_lit(Vec3::ONE))).unwrap();
    renderer.render(&mut camera()).unwrap();

    assert_eq!(
        draw_commands(headless(&renderer)),
        vec![Command::DrawArrays {
            program: renderer.meshes()[0].material.program().unwrap().id().unwrap(),
            count: 3
        }]
    );
}

// ============================================================================
// Per-frame state
// ============================================================================

#[test]
fn render_uploads_fresh_matrices_every_frame() {
    let mut renderer = Renderer::headless(64, 64, settings());
    let handle = renderer.add(box_mesh(Vec3::ZERO, Vec3::ONE)).unwrap();
    let mut camera = camera();
    renderer.render(&mut camera).unwrap();

    renderer.mesh_mut(handle).unwrap().transform.rotation.y = 0.5;
    camera.position = Vec3::new(0.0, 2.0, 5.0);
    renderer.render(&mut camera).unwrap();

    let mesh = renderer.mesh(handle).unwrap();
    let program = mesh.material.program().unwrap();
    let id = program.id().unwrap();
    let objects = headless(&renderer).objects();

    let model = objects.uniform_value(id, program.uniform_location("modelMatrix").unwrap());
    let Some(UniformValue::Mat4(model)) = model else {
        panic!("modelMatrix not set");
    };
    assert!(model.abs_diff_eq(Mat4::from_rotation_y(0.5), EPSILON));

    let view = objects.uniform_value(id, program.uniform_location("viewMatrix").unwrap());
    let Some(UniformValue::Mat4(view)) = view else {
        panic!("viewMatrix not set");
    };
    let expected = Mat4::look_at_rh(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y);
    assert!(view.abs_diff_eq(expected, EPSILON));
    assert_eq!(headless(&renderer).frames(), 2);
}

#[test]
fn command_log_keeps_only_the_latest_frame() {
    let mut renderer = Renderer::headless(64, 64, settings());
    renderer.add(box_mesh(Vec3::ZERO, Vec3::ONE)).unwrap();
    let mut camera = camera();
    for _ in 0..1000 {
        renderer.render(&mut camera).unwrap();
    }

    let device = headless(&renderer);
    assert_eq!(device.frames(), 1000);
    let commands = device.commands();
    assert_eq!(commands.len(), 3);
    assert!(matches!(commands[0], Command::Clear(_)));
    assert!(matches!(commands[1], Command::DrawElements { .. }));
    assert_eq!(commands[2], Command::Present);
}

#[test]
fn command_log_keeps_history_on_request() {
    let mut renderer = Renderer::headless(64, 64, settings());
    headless_mut(&mut renderer).keep_history(true);
    let mut camera = camera();
    for _ in 0..3 {
        renderer.render(&mut camera).unwrap();
    }

    let commands = headless(&renderer).commands();
    // render state and viewport, then clear and present per frame
    assert_eq!(commands.len(), 2 + 3 * 2);
    assert_eq!(commands.iter().filter(|c| **c == Command::Present).count(), 3);
}

#[test]
fn degenerate_camera_fails_the_frame() {
    let mut renderer = Renderer::headless(64, 64, settings());
    renderer.add(box_mesh(Vec3::ZERO, Vec3::ONE)).unwrap();
    let mut camera = camera();
    camera.position = camera.target;

    let err = renderer.render(&mut camera).unwrap_err();
    assert!(matches!(err, GlintError::DegenerateCamera(_)));
    assert_eq!(headless(&renderer).frames(), 0);
}

#[test]
fn set_size_resizes_surface_and_viewport() {
    let mut renderer = Renderer::headless(64, 64, settings());
    headless_mut(&mut renderer).take_commands();

    renderer.set_size(320, 200);
    assert_eq!(renderer.context().size(), (320, 200));
    assert_eq!(
        headless(&renderer).commands(),
        &[Command::SetViewport(Viewport::full(320, 200))]
    );
}

#[test]
fn set_clear_color_applies_next_frame() {
    let mut renderer = Renderer::headless(64, 64, settings());
    renderer.set_clear_color(Vec3::new(1.0, 0.0, 0.0));
    renderer.render(&mut camera()).unwrap();

    assert!(headless(&renderer).commands().iter().any(|c| matches!(
        c,
        Command::Clear(color) if color.r == 1.0 && color.g == 0.0
    )));
}

#[test]
fn dispose_releases_everything() {
    let mut renderer = Renderer::headless(64, 64, settings());
    renderer.add(box_mesh(Vec3::Y, Vec3::ONE)).unwrap();
    renderer.add(box_mesh(Vec3::NEG_Y, Vec3::ONE)).unwrap();

    renderer.dispose();
    renderer.dispose();

    assert!(renderer.meshes().is_empty());
    let stats = headless(&renderer).stats();
    assert_eq!(stats.live_buffers, 0);
    assert_eq!(stats.live_layouts, 0);
    assert_eq!(stats.live_programs, 0);
    assert_eq!(stats.released_buffers, 8);
    assert_eq!(stats.stale_releases, 0);
}
