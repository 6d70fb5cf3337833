//! Cameras
//!
//! Each camera turns plain input values into a view matrix. The window layer
//! translates its own events into these calls; nothing here polls input.

use crate::rasterizer::{Mat4, Vec3};

/// Mouse buttons a camera reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Held state of the movement keys for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementKeys {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementKeys {
    pub fn any(self) -> bool {
        self.forward || self.back || self.left || self.right
    }
}

pub trait Camera {
    fn view_matrix(&self) -> Mat4;
    /// Relative mouse motion in pixels
    fn process_mouse_movement(&mut self, xrel: f64, yrel: f64, dt: f64);
    fn process_mouse_wheel(&mut self, y: f64, dt: f64);
    fn process_mouse_button(&mut self, button: MouseButton, pressed: bool);
    fn process_keyboard_input(&mut self, keys: MovementKeys, dt: f64);
}

// ============================================================================
// First-person camera
// ============================================================================

const FPS_SENSITIVITY: f64 = 0.3;
const PITCH_LIMIT: f64 = 1.5;

/// Free-flying camera: WASD moves, left-drag looks, right-drag pans
#[derive(Debug, Clone)]
pub struct FpsCamera {
    pub eye: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    pub yaw: f64,
    pub pitch: f64,
    /// Units per second
    pub speed: f64,

    left_held: bool,
    right_held: bool,
}

impl FpsCamera {
    /// Looks down +Z from `eye`
    pub fn new(eye: Vec3) -> Self {
        Self {
            eye,
            front: Vec3::FORWARD,
            up: Vec3::UP,
            yaw: 0.0,
            pitch: 0.0,
            speed: 2.0,
            left_held: false,
            right_held: false,
        }
    }

    pub fn right(&self) -> Vec3 {
        self.front.cross(self.up).normalize()
    }

    fn update_front(&mut self) {
        let rotation = Mat4::rotation_y(self.yaw) * Mat4::rotation_x(self.pitch);
        self.front = rotation.mul_vec4(Vec3::FORWARD.to_vec4()).xyz();
    }
}

impl Camera for FpsCamera {
    fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.eye, self.eye + self.front, self.up)
    }

    fn process_mouse_movement(&mut self, xrel: f64, yrel: f64, dt: f64) {
        if self.left_held {
            self.yaw += xrel * FPS_SENSITIVITY * dt;
            self.pitch = (self.pitch + yrel * FPS_SENSITIVITY * dt).clamp(-PITCH_LIMIT, PITCH_LIMIT);
            self.update_front();
        } else if self.right_held {
            self.eye = self.eye + self.right() * (xrel * dt * FPS_SENSITIVITY);
            self.eye = self.eye + self.up * (yrel * dt * FPS_SENSITIVITY);
        }
    }

    fn process_mouse_wheel(&mut self, y: f64, dt: f64) {
        self.eye = self.eye + self.front * (self.speed * y * dt);
    }

    fn process_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.left_held = pressed,
            MouseButton::Right => self.right_held = pressed,
            MouseButton::Middle => {}
        }
    }

    fn process_keyboard_input(&mut self, keys: MovementKeys, dt: f64) {
        let step = self.speed * dt;
        if keys.forward {
            self.eye = self.eye + self.front * step;
        }
        if keys.back {
            self.eye = self.eye - self.front * step;
        }
        if keys.left {
            self.eye = self.eye + self.right() * step;
        }
        if keys.right {
            self.eye = self.eye - self.right() * step;
        }
    }
}

// ============================================================================
// Arc-ball camera
// ============================================================================

/// Orbits `target`; left-drag rotates, the wheel dollies in and out
#[derive(Debug, Clone)]
pub struct ArcCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Closest the wheel may bring the eye to the target
    pub min_distance: f64,

    width: f64,
    height: f64,
    left_held: bool,
}

impl ArcCamera {
    pub fn new(eye: Vec3, target: Vec3, width: usize, height: usize) -> Self {
        Self {
            eye,
            target,
            up: Vec3::UP,
            min_distance: 0.5,
            width: width as f64,
            height: height as f64,
            left_held: false,
        }
    }

    pub fn distance(&self) -> f64 {
        (self.eye - self.target).len()
    }
}

impl Camera for ArcCamera {
    fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.eye, self.target, self.up)
    }

    fn process_mouse_movement(&mut self, xrel: f64, yrel: f64, _dt: f64) {
        if !self.left_held {
            return;
        }

        // A full drag across the window is one turn horizontally, half vertically
        let x_angle = xrel * (2.0 * std::f64::consts::PI / self.width);
        let mut y_angle = yrel * (std::f64::consts::PI / self.height);

        // Positive y_angle raises the eye, pushing the view direction towards
        // -up. Stop before the view direction lines up with either pole.
        let cos_angle = (self.target - self.eye).normalize().dot(self.up);
        if -cos_angle * y_angle.signum() > 0.99 {
            y_angle = 0.0;
        }

        let pivot = self.target.to_vec4();
        let mut position = self.eye.to_vec4();
        position = Mat4::rotation_x(y_angle).mul_vec4(position - pivot) + pivot;
        position = Mat4::rotation_y(x_angle).mul_vec4(position - pivot) + pivot;
        self.eye = position.xyz();
    }

    fn process_mouse_wheel(&mut self, y: f64, dt: f64) {
        let offset = self.eye - self.target;
        let distance = offset.len();
        if distance == 0.0 {
            return;
        }
        let new_distance = (distance * (1.0 - y * dt)).max(self.min_distance);
        self.eye = self.target + offset * (new_distance / distance);
    }

    fn process_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if button == MouseButton::Left {
            self.left_held = pressed;
        }
    }

    fn process_keyboard_input(&mut self, _keys: MovementKeys, _dt: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_view(camera: &dyn Camera, p: Vec3) -> Vec3 {
        camera.view_matrix().mul_vec4(p.to_vec4()).xyz()
    }

    #[test]
    fn test_fps_looks_down_z() {
        let cam = FpsCamera::new(Vec3::new(0.0, 0.0, -5.0));
        let p = to_view(&cam, Vec3::ZERO);
        assert!(p.x.abs() < 1e-9 && p.y.abs() < 1e-9);
        assert!((p.z - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_fps_keyboard_moves_along_front() {
        let mut cam = FpsCamera::new(Vec3::ZERO);
        cam.process_keyboard_input(MovementKeys { forward: true, ..Default::default() }, 0.5);
        assert!((cam.eye.z - 1.0).abs() < 1e-9);

        cam.process_keyboard_input(MovementKeys { left: true, ..Default::default() }, 0.5);
        assert!((cam.eye.x + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fps_look_requires_left_button() {
        let mut cam = FpsCamera::new(Vec3::ZERO);
        cam.process_mouse_movement(100.0, 0.0, 0.1);
        assert_eq!(cam.front, Vec3::FORWARD);

        cam.process_mouse_button(MouseButton::Left, true);
        cam.process_mouse_movement(10.0, 0.0, 0.1);
        assert!(cam.yaw > 0.0);
        assert!((cam.front.len() - 1.0).abs() < 1e-9);
        assert!(cam.front.x > 0.0);
    }

    #[test]
    fn test_fps_pitch_clamped() {
        let mut cam = FpsCamera::new(Vec3::ZERO);
        cam.process_mouse_button(MouseButton::Left, true);
        cam.process_mouse_movement(0.0, 10_000.0, 1.0);
        assert_eq!(cam.pitch, PITCH_LIMIT);
        cam.process_mouse_movement(0.0, -100_000.0, 1.0);
        assert_eq!(cam.pitch, -PITCH_LIMIT);
    }

    #[test]
    fn test_fps_right_drag_pans() {
        let mut cam = FpsCamera::new(Vec3::ZERO);
        cam.process_mouse_button(MouseButton::Right, true);
        cam.process_mouse_movement(0.0, 10.0, 1.0);
        assert!((cam.eye.y - 3.0).abs() < 1e-9);
        assert_eq!(cam.front, Vec3::FORWARD);
    }

    #[test]
    fn test_arc_orbit_keeps_distance() {
        let mut cam = ArcCamera::new(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO, 800, 800);
        cam.process_mouse_button(MouseButton::Left, true);
        cam.process_mouse_movement(200.0, 0.0, 0.016);
        assert!((cam.distance() - 5.0).abs() < 1e-9);
        assert!(cam.eye.x.abs() > 1.0);
    }

    #[test]
    fn test_arc_up_lock() {
        // Eye almost straight above the target
        let mut cam = ArcCamera::new(Vec3::new(0.0, 5.0, -0.01), Vec3::ZERO, 800, 800);
        cam.process_mouse_button(MouseButton::Left, true);
        let before = cam.eye;
        cam.process_mouse_movement(0.0, 50.0, 0.016);
        assert!((cam.eye - before).len() < 1e-9);
    }

    #[test]
    fn test_arc_wheel_respects_min_distance() {
        let mut cam = ArcCamera::new(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO, 800, 800);
        cam.process_mouse_wheel(0.5, 1.0);
        assert!((cam.distance() - 2.5).abs() < 1e-9);
        cam.process_mouse_wheel(10.0, 1.0);
        assert!((cam.distance() - cam.min_distance).abs() < 1e-9);
    }
}
