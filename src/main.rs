/// Main application entry point
/// Handles window creation, input, and render loop
use anyhow::Result;
use glam::{Mat4, Vec3};
use log::{error, info, warn};
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;

use raster_engine::*;
use winit::{
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

const SNAPSHOT_PATH: &str = "rasterizer_color_buffer.bmp";

/// Spin rate of the textured grid, radians per second.
const GRID_SPIN_RATE: f32 = std::f32::consts::FRAC_PI_4;

fn main() -> Result<()> {
    env_logger::init();

    println!("=== Raster Engine - Software Rasterizer ===");
    println!("Controls:");
    println!("  WASD - Move camera");
    println!("  Q/E - Move down/up");
    println!("  Shift - Sprint (4x speed)");
    println!("  LMB drag - Dolly (vertical) / turn (horizontal)");
    println!("  RMB drag - Look around");
    println!("  LMB+RMB drag - Pan up/down");
    println!("  F - Toggle texture filter (nearest/bilinear)");
    println!("  Tab - Toggle grid topology (strip/list)");
    println!("  C - Lock/unlock camera");
    println!("  X - Save color buffer to {}", SNAPSHOT_PATH);
    println!("  ESC - Exit");
    println!();

    // Create event loop and window
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Raster Engine")
            .with_inner_size(winit::dpi::LogicalSize::new(800, 600))
            .build(&event_loop)?,
    );

    // Initialize software rendering context
    let context = softbuffer::Context::new(window.clone())
        .map_err(|e| anyhow::anyhow!("failed to create render context: {e}"))?;
    let mut surface = softbuffer::Surface::new(&context, window.clone())
        .map_err(|e| anyhow::anyhow!("failed to create render surface: {e}"))?;

    let window_size = window.inner_size();
    let mut framebuffer =
        Framebuffer::new(window_size.width as usize, window_size.height as usize)?;

    // Initialize camera
    let aspect_ratio = window_size.width as f32 / window_size.height as f32;
    let mut camera = Camera::new(60.0, aspect_ratio, Vec3::new(0.0, 0.0, -10.0))?;
    let mut camera_controller = CameraController::new();

    // Scene: two vertex-colored triangles plus a spinning textured grid
    let mut meshes = build_scene();
    let spinning = meshes.len() - 1;
    let mut grid_angle = 0.0f32;

    info!(
        "scene ready: {} meshes, {} triangles",
        meshes.len(),
        meshes.iter().map(|m| m.triangle_count()).sum::<usize>()
    );

    // Timing
    let mut last_frame = Instant::now();
    let mut frame_count = 0u32;
    let mut fps_timer = Instant::now();

    // Mouse state
    let mut last_mouse_pos: Option<(f64, f64)> = None;

    // When locked, accumulated input is drained but not applied
    let mut camera_locked = false;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    #[cfg(feature = "profiling")]
                    FUNCTION_COUNTERS.snapshot().print_report();
                    elwt.exit();
                }
                WindowEvent::Resized(new_size) => {
                    // Minimized windows report zero; keep the old buffers
                    if new_size.width > 0 && new_size.height > 0 {
                        framebuffer.resize(new_size.width as usize, new_size.height as usize);
                        camera.set_aspect_ratio(new_size.width as f32 / new_size.height as f32);
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let pressed = event.state == ElementState::Pressed;

                    if let PhysicalKey::Code(keycode) = event.physical_key {
                        match keycode {
                            KeyCode::KeyW => camera_controller.move_forward = pressed,
                            KeyCode::KeyS => camera_controller.move_backward = pressed,
                            KeyCode::KeyA => camera_controller.move_left = pressed,
                            KeyCode::KeyD => camera_controller.move_right = pressed,
                            KeyCode::KeyQ => camera_controller.move_down = pressed,
                            KeyCode::KeyE => camera_controller.move_up = pressed,
                            KeyCode::ShiftLeft | KeyCode::ShiftRight => {
                                camera_controller.sprint = pressed
                            }
                            KeyCode::KeyF if pressed => {
                                if let Material::Textured(texture) =
                                    &mut meshes[spinning].material
                                {
                                    let texture = Arc::make_mut(texture);
                                    let filter = match texture.filter() {
                                        FilterMode::Nearest => FilterMode::Bilinear,
                                        FilterMode::Bilinear => FilterMode::Nearest,
                                    };
                                    texture.set_filter(filter);
                                    info!("texture filter: {:?}", filter);
                                }
                            }
                            KeyCode::Tab if pressed => {
                                let topology = match meshes[spinning].topology {
                                    PrimitiveTopology::TriangleList => {
                                        PrimitiveTopology::TriangleStrip
                                    }
                                    PrimitiveTopology::TriangleStrip => {
                                        PrimitiveTopology::TriangleList
                                    }
                                };
                                let material = meshes[spinning].material.clone();
                                let world = meshes[spinning].world;
                                meshes[spinning] =
                                    demo_quad_grid(topology, material).with_world(world);
                                info!("grid topology: {:?}", topology);
                            }
                            KeyCode::KeyC if pressed => {
                                camera_locked = !camera_locked;
                                info!(
                                    "camera {}",
                                    if camera_locked { "locked" } else { "unlocked" }
                                );
                            }
                            KeyCode::KeyX if pressed => {
                                match framebuffer.save_snapshot(SNAPSHOT_PATH) {
                                    Ok(()) => info!("saved color buffer to {}", SNAPSHOT_PATH),
                                    Err(err) => error!("snapshot failed: {:#}", err),
                                }
                            }
                            KeyCode::Escape if pressed => {
                                #[cfg(feature = "profiling")]
                                FUNCTION_COUNTERS.snapshot().print_report();
                                elwt.exit();
                            }
                            _ => {}
                        }
                    }
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    let pressed = state == ElementState::Pressed;
                    match button {
                        MouseButton::Left => camera_controller.left_button = pressed,
                        MouseButton::Right => camera_controller.right_button = pressed,
                        _ => {}
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    if let Some(last_pos) = last_mouse_pos {
                        let delta_x = position.x - last_pos.0;
                        let delta_y = position.y - last_pos.1;
                        camera_controller.accumulate_mouse(delta_x as f32, delta_y as f32);
                    }
                    last_mouse_pos = Some((position.x, position.y));
                }
                WindowEvent::RedrawRequested => {
                    // Calculate delta time
                    let now = Instant::now();
                    let dt = (now - last_frame).as_secs_f32();
                    last_frame = now;

                    // Update camera from accumulated input; draining while
                    // locked keeps stale deltas from applying on unlock
                    let input = camera_controller.take_input();
                    if !camera_locked {
                        camera.update(dt, &input);
                    }

                    // Spin the textured grid in place
                    grid_angle += GRID_SPIN_RATE * dt;
                    meshes[spinning].world = Mat4::from_translation(Vec3::new(0.0, 0.0, 4.0))
                        * Mat4::from_rotation_y(grid_angle);

                    render_frame(&mut framebuffer, &meshes, &camera);

                    // Copy framebuffer to window
                    surface
                        .resize(
                            NonZeroU32::new(framebuffer.width as u32).unwrap(),
                            NonZeroU32::new(framebuffer.height as u32).unwrap(),
                        )
                        .unwrap();

                    let mut buffer = surface.buffer_mut().unwrap();
                    buffer.copy_from_slice(framebuffer.color_buffer_slice());
                    buffer.present().unwrap();

                    // FPS counter
                    frame_count += 1;
                    if fps_timer.elapsed().as_secs() >= 1 {
                        info!(
                            "FPS: {} | {}x{}",
                            frame_count, framebuffer.width, framebuffer.height
                        );
                        frame_count = 0;
                        fps_timer = Instant::now();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}

/// Clear, then draw every mesh across parallel row stripes.
fn render_frame(framebuffer: &mut Framebuffer, meshes: &[Mesh], camera: &Camera) {
    let frame_start = Instant::now();

    framebuffer.clear(DEFAULT_CLEAR_COLOR);

    let view_proj = camera.view_projection_matrix();

    // Over-subscribe stripes so rayon's work stealing can balance rows
    // with very different triangle loads
    let stripe_count = rayon::current_num_threads() * 4;
    render_scene(framebuffer, meshes, &view_proj, stripe_count);

    let frame_time = frame_start.elapsed();
    if frame_time.as_millis() > 16 {
        warn!(
            "frame time: {:.2}ms (> 16ms)",
            frame_time.as_secs_f64() * 1000.0
        );
    }
}

/// Two vertex-colored triangles plus the textured quad grid, which the
/// render loop spins in place and the Tab handler rebuilds per topology.
fn build_scene() -> Vec<Mesh> {
    let checkerboard = Texture::checkerboard(
        64,
        64,
        8,
        ColorRgb::WHITE,
        ColorRgb::new(0.2, 0.2, 0.2),
    );

    let mut meshes = demo_triangle_pair();
    meshes.push(
        demo_quad_grid(
            PrimitiveTopology::TriangleStrip,
            Material::Textured(Arc::new(checkerboard)),
        )
        .with_world(Mat4::from_translation(Vec3::new(0.0, 0.0, 4.0))),
    );
    meshes
}
