//! Projection from view space to screen pixels

use super::math::{Mat4, Vec4};

/// Projection matrix plus the viewport it maps onto
#[derive(Debug, Clone)]
pub struct Projector {
    pub matrix: Mat4,
    pub width: usize,
    pub height: usize,
}

impl Projector {
    pub fn new(matrix: Mat4, width: usize, height: usize) -> Self {
        Self { matrix, width, height }
    }

    /// Perspective projector for a viewport. `fov_y` is the full vertical
    /// angle; the matrix takes `height / width` as its aspect term.
    pub fn perspective(fov_y: f64, znear: f64, zfar: f64, width: usize, height: usize) -> Self {
        let aspect = height as f64 / width as f64;
        log::debug!(
            "Projection: fov_y={:.3} aspect={:.3} znear={} zfar={} viewport={}x{}",
            fov_y, aspect, znear, zfar, width, height
        );
        Self::new(Mat4::perspective(fov_y, aspect, znear, zfar), width, height)
    }

    /// Horizontal FOV matching `fov_y` for this viewport
    pub fn fov_x(fov_y: f64, width: usize, height: usize) -> f64 {
        let aspect_x = width as f64 / height as f64;
        ((fov_y / 2.0).tan() * aspect_x).atan() * 2.0
    }

    /// Project a view-space point to screen space. `w` keeps the view-space
    /// depth; NDC y is flipped so screen y grows downward.
    pub fn project(&self, point: Vec4) -> Vec4 {
        let mut projected = self.matrix.mul_vec4_proj(point);

        projected.y = -projected.y;

        let half_w = self.width as f64 / 2.0;
        let half_h = self.height as f64 / 2.0;
        projected.x = projected.x * half_w + half_w;
        projected.y = projected.y * half_h + half_h;

        projected
    }
}
