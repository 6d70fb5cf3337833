//! heretic viewer
//!
//! Opens a window, feeds input to the camera, runs the software pipeline and
//! blits the framebuffer every frame.
//!
//! Usage: `heretic [config.ron]` (defaults to `heretic.ron`, missing is fine)
//!
//! Keys: 1-6 render mode, C/B cull none/backface, Space auto-rotate,
//! WASD move (FPS camera), Escape quit.

use std::sync::Arc;

use heretic::camera::{self, ArcCamera, Camera as _, FpsCamera, MovementKeys};
use heretic::config::{CameraKind, RenderConfig};
use heretic::engine::Engine;
use heretic::rasterizer::{self as r, CullMode, RenderMode, TexCoord, HEIGHT, WIDTH};
use heretic::scene::{Mesh as SceneMesh, Scene};
use macroquad::prelude::*;

const DEFAULT_CONFIG: &str = "heretic.ron";

fn window_conf() -> Conf {
    Conf {
        window_title: format!("heretic v{}", heretic::VERSION),
        window_width: WIDTH as i32,
        window_height: HEIGHT as i32,
        window_resizable: true,
        ..Default::default()
    }
}

/// 8x8 checker of palette slot 0 (transparent) and a four-color stripe
fn demo_quad() -> heretic::Result<SceneMesh> {
    let palette = Arc::new(r::Palette::from_rgb15(&[
        0x0000, 0x001f, 0x03e0, 0x7c00, 0x7fff, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    ]));

    let mut packed = Vec::with_capacity(32);
    for y in 0..8u8 {
        for x in (0..8u8).step_by(2) {
            let texel = |x: u8| if (x / 2 + y / 2) % 2 == 0 { 0 } else { 1 + (y / 2) % 4 };
            packed.push(texel(x) | (texel(x + 1) << 4));
        }
    }
    let texture = r::Texture::from_packed_indices(8, 8, &packed)?;

    let pts = [
        r::Vec3::new(-1.0, -1.0, 0.0),
        r::Vec3::new(-1.0, 1.0, 0.0),
        r::Vec3::new(1.0, 1.0, 0.0),
        r::Vec3::new(1.0, -1.0, 0.0),
    ];
    let uv = TexCoord::new;
    let triangles = vec![
        r::Triangle::textured([pts[0], pts[1], pts[2]], [uv(0.0, 1.0), uv(0.0, 0.0), uv(1.0, 0.0)], r::Color::WHITE)
            .with_palette(palette.clone()),
        r::Triangle::textured([pts[0], pts[2], pts[3]], [uv(0.0, 1.0), uv(1.0, 0.0), uv(1.0, 1.0)], r::Color::WHITE)
            .with_palette(palette),
    ];

    let mut mesh = SceneMesh::new(triangles, Some(texture));
    mesh.translation = r::Vec3::new(3.0, 0.0, 0.0);
    Ok(mesh)
}

fn demo_scene() -> heretic::Result<Scene> {
    let mut scene = Scene::new();
    scene.add_mesh(SceneMesh::cube());
    scene.add_mesh(demo_quad()?);
    Ok(scene)
}

fn make_camera(config: &RenderConfig) -> Box<dyn camera::Camera> {
    let eye = r::Vec3::new(0.0, 0.5, -5.0);
    match config.camera {
        CameraKind::Fps => Box::new(FpsCamera::new(eye)),
        CameraKind::Arc => Box::new(ArcCamera::new(eye, r::Vec3::ZERO, config.width, config.height)),
    }
}

/// Sleep off the rest of the frame budget
#[cfg(not(target_arch = "wasm32"))]
fn pace_frame(config: &RenderConfig, frame_start: f64) {
    if let Some(delay) = config.frame_delay(get_time() - frame_start) {
        std::thread::sleep(delay);
    }
}

/// The browser paces `next_frame` on wasm
#[cfg(target_arch = "wasm32")]
fn pace_frame(_config: &RenderConfig, _frame_start: f64) {}

/// Render mode and culling hotkeys
fn handle_hotkeys(engine: &mut Engine) {
    let modes = [
        (KeyCode::Key1, RenderMode::Wire),
        (KeyCode::Key2, RenderMode::WireVertex),
        (KeyCode::Key3, RenderMode::WireFill),
        (KeyCode::Key4, RenderMode::Fill),
        (KeyCode::Key5, RenderMode::Texture),
        (KeyCode::Key6, RenderMode::TextureWire),
    ];
    for (key, mode) in modes {
        if is_key_pressed(key) {
            log::info!("Render mode: {:?}", mode);
            engine.settings.render_mode = mode;
        }
    }

    if is_key_pressed(KeyCode::C) {
        engine.settings.cull_mode = CullMode::None;
    }
    if is_key_pressed(KeyCode::B) {
        engine.settings.cull_mode = CullMode::BackFace;
    }
    if is_key_pressed(KeyCode::Space) {
        engine.auto_rotation = !engine.auto_rotation;
    }
}

/// Translate macroquad input into camera calls
fn feed_camera(cam: &mut dyn camera::Camera, last_mouse: &mut (f32, f32), dt: f64) {
    let buttons = [
        (MouseButton::Left, camera::MouseButton::Left),
        (MouseButton::Middle, camera::MouseButton::Middle),
        (MouseButton::Right, camera::MouseButton::Right),
    ];
    for (mq, button) in buttons {
        if is_mouse_button_pressed(mq) {
            cam.process_mouse_button(button, true);
        }
        if is_mouse_button_released(mq) {
            cam.process_mouse_button(button, false);
        }
    }

    let mouse_pos = mouse_position();
    let (dx, dy) = (mouse_pos.0 - last_mouse.0, mouse_pos.1 - last_mouse.1);
    if dx != 0.0 || dy != 0.0 {
        cam.process_mouse_movement(dx as f64, dy as f64, dt);
    }
    *last_mouse = mouse_pos;

    // Platforms disagree on wheel units; only the direction is used
    let wheel = mouse_wheel().1;
    if wheel != 0.0 {
        cam.process_mouse_wheel(wheel.signum() as f64, dt);
    }

    let keys = MovementKeys {
        forward: is_key_down(KeyCode::W),
        back: is_key_down(KeyCode::S),
        left: is_key_down(KeyCode::A),
        right: is_key_down(KeyCode::D),
    };
    if keys.any() {
        cam.process_keyboard_input(keys, dt);
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    // Initialize logging; RUST_LOG overrides the info default
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting heretic v{}", heretic::VERSION);

    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = match RenderConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load {}: {}, using defaults", config_path, e);
            RenderConfig::default()
        }
    };

    let scene = match demo_scene() {
        Ok(scene) => scene,
        Err(e) => {
            log::error!("Failed to build demo scene: {}", e);
            return;
        }
    };

    let mut engine = Engine::new(&config, scene);
    let mut cam = make_camera(&config);
    let mut last_mouse = mouse_position();

    log::info!(
        "Rendering {}x{} with {:?} camera, {:?}",
        engine.width(),
        engine.height(),
        config.camera,
        engine.settings.render_mode
    );

    loop {
        let frame_start = get_time();

        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        let dt = get_frame_time() as f64;
        handle_hotkeys(&mut engine);
        feed_camera(cam.as_mut(), &mut last_mouse, dt);

        engine.update(&cam.view_matrix(), dt);
        engine.render();

        // Blit the framebuffer, scaled to the window
        let fb = &engine.framebuffer;
        let texture = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.pixels);
        texture.set_filter(FilterMode::Nearest);

        clear_background(BLACK);
        draw_texture_ex(
            &texture,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(screen_width(), screen_height())),
                ..Default::default()
            },
        );

        pace_frame(&config, frame_start);
        next_frame().await;
    }
}
