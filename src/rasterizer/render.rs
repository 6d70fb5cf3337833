//! Framebuffer and triangle rasterization
//!
//! Triangles are scan-converted with the flat-bottom/flat-top split. Each
//! covered pixel gets barycentric weights against the screen-space vertices,
//! and depth and texture coordinates are interpolated through `1/w` so they
//! stay correct under perspective.

use super::math::{barycentric_weights, Vec2, Vec3, Vec4};
use super::types::{Background, Color, Palette, TexCoord, Texel, Texture, Triangle};

/// Depth of a pixel nothing has been drawn to
pub const DEPTH_CLEAR: f64 = 1.0;

/// Color + depth buffer for software rendering
pub struct Framebuffer {
    pub pixels: Vec<u8>,   // RGBA, 4 bytes per pixel
    pub zbuffer: Vec<f64>, // smaller = closer
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            zbuffer: vec![DEPTH_CLEAR; width * height],
            width,
            height,
        }
    }

    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
    }

    pub fn clear_depth(&mut self) {
        self.zbuffer.fill(DEPTH_CLEAR);
    }

    /// Fill every row with the gradient color for that row
    pub fn set_background(&mut self, background: &Background) {
        let row_len = self.width * 4;
        for y in 0..self.height {
            let bytes = background.at(y, self.height).to_bytes();
            for px in self.pixels[y * row_len..(y + 1) * row_len].chunks_exact_mut(4) {
                px.copy_from_slice(&bytes);
            }
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            Some(y as usize * self.width + x as usize)
        } else {
            None
        }
    }

    /// Write one pixel; off-screen writes are dropped
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_bytes());
        }
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|idx| {
            let p = &self.pixels[idx * 4..idx * 4 + 4];
            Color::from_bytes([p[0], p[1], p[2], p[3]])
        })
    }

    /// Stored depth; off-screen reads see the clear value
    pub fn depth_at(&self, x: i32, y: i32) -> f64 {
        self.index(x, y).map_or(DEPTH_CLEAR, |idx| self.zbuffer[idx])
    }

    pub fn set_depth(&mut self, x: i32, y: i32, depth: f64) {
        if let Some(idx) = self.index(x, y) {
            self.zbuffer[idx] = depth;
        }
    }

    /// Draw a line from (x0, y0) to (x1, y1) using Bresenham's algorithm.
    /// The segment is clipped to the framebuffer first.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        let Some(((x0, y0), (x1, y1))) = self.clip_line(x0, y0, x1, y1) else {
            return;
        };

        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut x = x0;
        let mut y = y0;

        loop {
            self.set_pixel(x as i32, y as i32, color);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Liang-Barsky clip of a segment against the pixel rectangle
    fn clip_line(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> Option<((i64, i64), (i64, i64))> {
        if self.width == 0 || self.height == 0 {
            return None;
        }

        let (x0, y0) = (x0 as f64, y0 as f64);
        let (dx, dy) = (x1 as f64 - x0, y1 as f64 - y0);
        let (x_max, y_max) = ((self.width - 1) as f64, (self.height - 1) as f64);
        let (mut t0, mut t1) = (0.0f64, 1.0f64);

        for (p, q) in [(-dx, x0), (dx, x_max - x0), (-dy, y0), (dy, y_max - y0)] {
            if p == 0.0 {
                // Parallel to this edge
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
        if t0 > t1 {
            return None;
        }

        let at = |t: f64| ((x0 + t * dx).round() as i64, (y0 + t * dy).round() as i64);
        Some((at(t0), at(t1)))
    }

    /// Wireframe triangle
    pub fn draw_triangle(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, x2: i32, y2: i32, color: Color) {
        self.draw_line(x0, y0, x1, y1, color);
        self.draw_line(x1, y1, x2, y2, color);
        self.draw_line(x2, y2, x0, y0, color);
    }

    pub fn draw_rectangle(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        let (x, y) = (x as i64, y as i64);
        let columns = x.max(0)..(x + width as i64).min(self.width as i64);
        let rows = y.max(0)..(y + height as i64).min(self.height as i64);

        for j in rows {
            for i in columns.clone() {
                self.set_pixel(i as i32, j as i32, color);
            }
        }
    }

    /// Dotted grid, one dot every 10 pixels
    pub fn draw_grid(&mut self, color: Color) {
        for y in (0..self.height as i32).step_by(10) {
            for x in (0..self.width as i32).step_by(10) {
                self.set_pixel(x, y, color);
            }
        }
    }

    /// Solid-color triangle with depth testing. `tri.projected` must be in
    /// screen space.
    pub fn draw_filled_triangle(&mut self, tri: &Triangle, color: Color) {
        let color = color.shade(tri.light_intensity);
        let [a, b, c] = sort_by_y(snap(tri.projected), [TexCoord::default(); 3]).0;
        let bounds = (self.width, self.height);

        scan_triangle(a, b, c, bounds, |x, y| self.draw_triangle_pixel(x, y, a, b, c, color));
    }

    /// Perspective-correct textured triangle. The triangle's palette, if any,
    /// resolves indexed texels; transparent palette entries are skipped.
    pub fn draw_textured_triangle(&mut self, tri: &Triangle, texture: &Texture) {
        if texture.width == 0 || texture.height == 0 {
            self.draw_filled_triangle(tri, tri.color);
            return;
        }

        let ([a, b, c], uvs) = sort_by_y(snap(tri.projected), tri.texcoords);
        let shading = TexelShading {
            palette: tri.palette.as_deref(),
            fallback: tri.color,
            light_intensity: tri.light_intensity,
        };

        let bounds = (self.width, self.height);

        scan_triangle(a, b, c, bounds, |x, y| self.draw_texel(x, y, [a, b, c], uvs, texture, &shading));
    }

    /// Depth-tested solid pixel
    pub fn draw_triangle_pixel(&mut self, x: i32, y: i32, a: Vec4, b: Vec4, c: Vec4, color: Color) {
        let weights = barycentric_weights(a.xy(), b.xy(), c.xy(), pixel_center(x, y));
        let depth = 1.0 - interpolate_reciprocal_w(weights, [a, b, c]);

        if depth < self.depth_at(x, y) {
            self.set_pixel(x, y, color);
            self.set_depth(x, y, depth);
        }
    }

    /// Depth-tested textured pixel
    fn draw_texel(
        &mut self,
        x: i32,
        y: i32,
        verts: [Vec4; 3],
        uvs: [TexCoord; 3],
        texture: &Texture,
        shading: &TexelShading,
    ) {
        let weights = barycentric_weights(verts[0].xy(), verts[1].xy(), verts[2].xy(), pixel_center(x, y));
        let (uv, reciprocal_w) = perspective_uv(weights, verts, uvs);
        let depth = 1.0 - reciprocal_w;

        // NaN from a degenerate triangle fails the test too
        if depth.is_nan() || depth >= self.depth_at(x, y) {
            return;
        }

        let color = match texture.sample(uv.u, uv.v) {
            Texel::Direct(color) => color,
            Texel::Index(index) => match shading.palette {
                Some(palette) => {
                    let color = palette.get(index);
                    if color.is_transparent() {
                        return;
                    }
                    color
                }
                None => shading.fallback,
            },
        };

        self.set_pixel(x, y, color.shade(shading.light_intensity));
        self.set_depth(x, y, depth);
    }
}

/// Per-triangle inputs for resolving texels
struct TexelShading<'a> {
    palette: Option<&'a Palette>,
    fallback: Color,
    light_intensity: f64,
}

fn pixel_center(x: i32, y: i32) -> Vec2 {
    Vec2::new(x as f64 + 0.5, y as f64 + 0.5)
}

/// Interpolated `1/w` at the barycentric weights
pub fn interpolate_reciprocal_w(weights: Vec3, verts: [Vec4; 3]) -> f64 {
    weights.x / verts[0].w + weights.y / verts[1].w + weights.z / verts[2].w
}

/// Perspective-correct texture coordinate: interpolate `uv/w` and divide by
/// the interpolated `1/w`. Returns the coordinate and the `1/w` used.
pub fn perspective_uv(weights: Vec3, verts: [Vec4; 3], uvs: [TexCoord; 3]) -> (TexCoord, f64) {
    let [a, b, c] = verts;
    let u = (uvs[0].u / a.w) * weights.x + (uvs[1].u / b.w) * weights.y + (uvs[2].u / c.w) * weights.z;
    let v = (uvs[0].v / a.w) * weights.x + (uvs[1].v / b.w) * weights.y + (uvs[2].v / c.w) * weights.z;
    let reciprocal_w = interpolate_reciprocal_w(weights, verts);

    (TexCoord::new(u / reciprocal_w, v / reciprocal_w), reciprocal_w)
}

/// Truncate screen x/y to whole pixels; z and w are kept
fn snap(points: [Vec4; 3]) -> [Vec4; 3] {
    points.map(|p| Vec4::new((p.x as i32) as f64, (p.y as i32) as f64, p.z, p.w))
}

/// Sort vertices (and their texcoords) by ascending y
fn sort_by_y(mut verts: [Vec4; 3], mut uvs: [TexCoord; 3]) -> ([Vec4; 3], [TexCoord; 3]) {
    if verts[0].y > verts[1].y {
        verts.swap(0, 1);
        uvs.swap(0, 1);
    }
    if verts[1].y > verts[2].y {
        verts.swap(1, 2);
        uvs.swap(1, 2);
    }
    if verts[0].y > verts[1].y {
        verts.swap(0, 1);
        uvs.swap(0, 1);
    }
    (verts, uvs)
}

/// Walk the horizontal spans of a y-sorted triangle, calling `plot` for every
/// covered pixel inside `bounds` (width, height). The upper half is
/// flat-bottom (a down to the split at b.y), the lower half flat-top (b.y
/// down to c).
//
//          a
//         / \
//        /   \
//       b-----M
//        \_    \
//           \_  \
//              \_\
//                 c
fn scan_triangle(a: Vec4, b: Vec4, c: Vec4, bounds: (usize, usize), mut plot: impl FnMut(i32, i32)) {
    // Snapped coordinates span the whole i32 range, so differences need i64
    let (x0, y0) = (a.x as i64, a.y as i64);
    let (x1, y1) = (b.x as i64, b.y as i64);
    let (x2, y2) = (c.x as i64, c.y as i64);
    let (width, height) = (bounds.0 as i64, bounds.1 as i64);

    // A zero-height edge gets a zero slope
    let inv_slope = |dx: i64, dy: i64| if dy != 0 { dx as f64 / dy.abs() as f64 } else { 0.0 };
    let rows = |from: i64, to: i64| from.max(0)..=to.min(height - 1);

    let mut span = |y: i64, x_start: f64, x_end: f64| {
        let (mut start, mut end) = (x_start as i64, x_end as i64);
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        for x in start.max(0)..end.min(width) {
            plot(x as i32, y as i32);
        }
    };

    // Flat-bottom half
    if y1 - y0 != 0 {
        let inv_slope1 = inv_slope(x1 - x0, y1 - y0);
        let inv_slope2 = inv_slope(x2 - x0, y2 - y0);
        for y in rows(y0, y1) {
            let x_start = x1 as f64 + (y - y1) as f64 * inv_slope1;
            let x_end = x0 as f64 + (y - y0) as f64 * inv_slope2;
            span(y, x_start, x_end);
        }
    }

    // Flat-top half
    if y2 - y1 != 0 {
        let inv_slope1 = inv_slope(x2 - x1, y2 - y1);
        let inv_slope2 = inv_slope(x2 - x0, y2 - y0);
        for y in rows(y1, y2) {
            let x_start = x1 as f64 + (y - y1) as f64 * inv_slope1;
            let x_end = x0 as f64 + (y - y0) as f64 * inv_slope2;
            span(y, x_start, x_end);
        }
    }
}
