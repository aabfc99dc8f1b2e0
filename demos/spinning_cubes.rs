//! Two lit boxes spinning at different rates.
//!
//! Run with `cargo run --example spinning_cubes`.

use std::f32::consts::{FRAC_PI_4, PI};
use std::sync::Arc;
use std::time::Instant;

use glint::{Camera, Material, Mesh, MeshHandle, Renderer, RendererSettings, Transform, Vec3, WgpuSettings, create_box};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// Rotation speed of each cube around X and Y, in radians per second.
const SPIN: [(f32, f32); 2] = [(0.5 * PI, 0.5 * PI), (0.3 * PI, 0.7 * PI)];

struct Scene {
    window: Arc<Window>,
    renderer: Renderer,
    camera: Camera,
    cubes: [MeshHandle; 2],
    last_frame: Instant,
}

impl Scene {
    fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        let settings = RendererSettings {
            clear_color: Vec3::new(0.05, 0.05, 0.1),
            ..Default::default()
        };
        let mut renderer = Renderer::with_window(window.clone(), width, height, settings, &WgpuSettings::default())?;

        let top = Mesh::new(create_box(1.0, 1.0, 1.0), Material::basic_lit(Vec3::new(0.8, 0.2, 0.3)))
            .with_transform(Transform::from_position(Vec3::new(0.0, 1.0, 0.0)));
        let bottom = Mesh::new(create_box(1.0, 1.0, 1.0), Material::basic_lit(Vec3::new(0.3, 0.8, 0.3)))
            .with_transform(Transform::from_position(Vec3::new(0.0, -1.0, 0.0)));
        let cubes = [renderer.add(top)?, renderer.add(bottom)?];

        let camera = Camera::new(width as f32 / height as f32, FRAC_PI_4, 0.1, 100.0);

        Ok(Self {
            window,
            renderer,
            camera,
            cubes,
            last_frame: Instant::now(),
        })
    }

    fn frame(&mut self) -> glint::Result<()> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        for (handle, (speed_x, speed_y)) in self.cubes.iter().zip(SPIN) {
            if let Some(mesh) = self.renderer.mesh_mut(*handle) {
                mesh.transform.rotation.x += speed_x * dt;
                mesh.transform.rotation.y += speed_y * dt;
            }
        }
        self.renderer.render(&mut self.camera)
    }
}

#[derive(Default)]
struct App {
    scene: Option<Scene>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.scene.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title("glint: spinning cubes")
            .with_inner_size(winit::dpi::LogicalSize::new(800.0, 600.0));

        let scene = event_loop
            .create_window(attributes)
            .map_err(anyhow::Error::from)
            .and_then(|window| Scene::new(Arc::new(window)));
        match scene {
            Ok(scene) => self.scene = Some(scene),
            Err(e) => {
                log::error!("Fatal renderer error: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let (width, height) = (size.width.max(1), size.height.max(1));
                scene.renderer.set_size(width, height);
                scene.camera.set_aspect(width as f32 / height as f32);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = scene.frame() {
                    log::error!("Frame failed: {e}");
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(scene) = &self.scene {
            scene.window.request_redraw();
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.run_app(&mut App::default())?;
    Ok(())
}
