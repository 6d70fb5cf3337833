//! View-space frustum clipping
//!
//! Sutherland-Hodgman against six point + normal planes. Normals point into
//! the visible volume, so a vertex is inside when its signed distance is
//! strictly positive.

use super::math::{Vec3, Vec4};
use super::types::{TexCoord, Triangle};

/// Upper bound on polygon size: a triangle gains at most one vertex per plane
pub const MAX_POLYGON_VERTICES: usize = 3 + 6;

/// A plane defined by a point on the plane and its inward normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub point: Vec3,
    pub normal: Vec3,
}

impl Plane {
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        Self { point, normal }
    }

    /// Positive = inside, negative = outside
    pub fn signed_distance(&self, position: Vec3) -> f64 {
        (position - self.point).dot(self.normal)
    }
}

/// Clip-time polygon stored inline; never allocates
#[derive(Debug, Clone, Copy)]
pub struct Polygon {
    vertices: [Vec3; MAX_POLYGON_VERTICES],
    texcoords: [TexCoord; MAX_POLYGON_VERTICES],
    len: usize,
}

impl Polygon {
    pub fn empty() -> Self {
        Self {
            vertices: [Vec3::ZERO; MAX_POLYGON_VERTICES],
            texcoords: [TexCoord::default(); MAX_POLYGON_VERTICES],
            len: 0,
        }
    }

    /// Seed from a triangle's view-space positions
    pub fn from_triangle(triangle: &Triangle) -> Self {
        let mut poly = Self::empty();
        for (p, tc) in triangle.projected.iter().zip(triangle.texcoords.iter()) {
            poly.push(p.xyz(), *tc);
        }
        poly
    }

    /// Append a vertex. Pushes past capacity are dropped; a convex polygon
    /// clipped by at most six planes never reaches that point.
    pub fn push(&mut self, vertex: Vec3, texcoord: TexCoord) {
        if self.len == MAX_POLYGON_VERTICES {
            log::warn!("Clip polygon overflow, dropping vertex");
            return;
        }
        self.vertices[self.len] = vertex;
        self.texcoords[self.len] = texcoord;
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices[..self.len]
    }

    pub fn texcoords(&self) -> &[TexCoord] {
        &self.texcoords[..self.len]
    }

    /// Clip against one plane
    pub fn clip_against_plane(&self, plane: &Plane) -> Polygon {
        let mut output = Polygon::empty();
        if self.len == 0 {
            return output;
        }

        let mut prev_vertex = self.vertices[self.len - 1];
        let mut prev_texcoord = self.texcoords[self.len - 1];
        let mut prev_dot = plane.signed_distance(prev_vertex);

        for i in 0..self.len {
            let curr_vertex = self.vertices[i];
            let curr_texcoord = self.texcoords[i];
            let curr_dot = plane.signed_distance(curr_vertex);

            // Signs differ and neither endpoint lies on the plane
            if curr_dot * prev_dot < 0.0 {
                let t = prev_dot / (prev_dot - curr_dot);
                output.push(
                    prev_vertex.lerp(curr_vertex, t),
                    prev_texcoord.lerp(curr_texcoord, t),
                );
            }

            if curr_dot > 0.0 {
                output.push(curr_vertex, curr_texcoord);
            }

            prev_vertex = curr_vertex;
            prev_texcoord = curr_texcoord;
            prev_dot = curr_dot;
        }

        output
    }

    /// Fan-triangulate from vertex 0. Flat attributes come from `source`.
    pub fn triangulate(&self, source: &Triangle) -> Vec<Triangle> {
        let count = self.len.saturating_sub(2);
        let mut triangles = Vec::with_capacity(count);

        for i in 0..count {
            let idx = [0, i + 1, i + 2];
            let mut tri = source.clone();
            tri.projected = idx.map(|j| Vec4::new(self.vertices[j].x, self.vertices[j].y, self.vertices[j].z, 1.0));
            tri.texcoords = idx.map(|j| self.texcoords[j]);
            triangles.push(tri);
        }

        triangles
    }
}

/// Six-plane view volume built from the half field-of-view angles
#[derive(Debug, Clone)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// `fov_x` and `fov_y` are full angles in radians
    pub fn new(fov_x: f64, fov_y: f64, znear: f64, zfar: f64) -> Self {
        let (sin_x, cos_x) = (fov_x / 2.0).sin_cos();
        let (sin_y, cos_y) = (fov_y / 2.0).sin_cos();
        let origin = Vec3::ZERO;

        log::debug!(
            "Frustum: fov_x={:.3} fov_y={:.3} znear={} zfar={}",
            fov_x, fov_y, znear, zfar
        );

        Self {
            planes: [
                // Left
                Plane::new(origin, Vec3::new(cos_x, 0.0, sin_x)),
                // Right
                Plane::new(origin, Vec3::new(-cos_x, 0.0, sin_x)),
                // Top
                Plane::new(origin, Vec3::new(0.0, -cos_y, sin_y)),
                // Bottom
                Plane::new(origin, Vec3::new(0.0, cos_y, sin_y)),
                // Near
                Plane::new(Vec3::new(0.0, 0.0, znear), Vec3::new(0.0, 0.0, 1.0)),
                // Far
                Plane::new(Vec3::new(0.0, 0.0, zfar), Vec3::new(0.0, 0.0, -1.0)),
            ],
        }
    }

    /// Clip a view-space triangle. Returns nothing when it is fully culled.
    pub fn clip(&self, triangle: &Triangle) -> Vec<Triangle> {
        let mut polygon = Polygon::from_triangle(triangle);

        for plane in &self.planes {
            polygon = polygon.clip_against_plane(plane);
            // A point or a segment cannot grow back into area on later planes
            if polygon.len() < 3 {
                return Vec::new();
            }
        }

        polygon.triangulate(triangle)
    }
}
