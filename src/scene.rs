//! Meshes and the scene that holds them
//!
//! A mesh owns its triangles for its whole lifetime. Only the `projected`
//! fields change per frame; the engine collects the clipped, screen-space
//! copies in the mesh's render list.

use crate::rasterizer::{Background, Color, Mat4, Texture, Triangle, Vec3};

/// A triangle list plus its world transform and optional texture
#[derive(Debug, Clone)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
    pub texture: Option<Texture>,
    /// Gradient drawn behind the scene instead of the grid
    pub background: Option<Background>,

    pub scale: Vec3,
    /// Euler angles in radians
    pub rotation: Vec3,
    pub translation: Vec3,

    pub(crate) render_list: Vec<Triangle>,
}

impl Mesh {
    pub fn new(triangles: Vec<Triangle>, texture: Option<Texture>) -> Self {
        Self {
            triangles,
            texture,
            background: None,
            scale: Vec3::ONE,
            rotation: Vec3::ZERO,
            translation: Vec3::ZERO,
            render_list: Vec::new(),
        }
    }

    /// Six-colored cube spanning -1..1 on every axis
    pub fn cube() -> Self {
        let v = |x: f64, y: f64, z: f64| Vec3::new(x, y, z);
        let faces = [
            // Front
            ([v(-1.0, -1.0, -1.0), v(-1.0, 1.0, -1.0), v(1.0, 1.0, -1.0)], Color::RED),
            ([v(-1.0, -1.0, -1.0), v(1.0, 1.0, -1.0), v(1.0, -1.0, -1.0)], Color::RED),
            // Right
            ([v(1.0, -1.0, -1.0), v(1.0, 1.0, -1.0), v(1.0, 1.0, 1.0)], Color::GREEN),
            ([v(1.0, -1.0, -1.0), v(1.0, 1.0, 1.0), v(1.0, -1.0, 1.0)], Color::GREEN),
            // Back
            ([v(1.0, -1.0, 1.0), v(1.0, 1.0, 1.0), v(-1.0, 1.0, 1.0)], Color::BLUE),
            ([v(1.0, -1.0, 1.0), v(-1.0, 1.0, 1.0), v(-1.0, -1.0, 1.0)], Color::BLUE),
            // Left
            ([v(-1.0, -1.0, 1.0), v(-1.0, 1.0, 1.0), v(-1.0, 1.0, -1.0)], Color::YELLOW),
            ([v(-1.0, -1.0, 1.0), v(-1.0, 1.0, -1.0), v(-1.0, -1.0, -1.0)], Color::YELLOW),
            // Top
            ([v(-1.0, 1.0, -1.0), v(-1.0, 1.0, 1.0), v(1.0, 1.0, 1.0)], Color::CYAN),
            ([v(-1.0, 1.0, -1.0), v(1.0, 1.0, 1.0), v(1.0, 1.0, -1.0)], Color::CYAN),
            // Bottom
            ([v(1.0, -1.0, 1.0), v(-1.0, -1.0, 1.0), v(-1.0, -1.0, -1.0)], Color::MAGENTA),
            ([v(1.0, -1.0, 1.0), v(-1.0, -1.0, -1.0), v(1.0, -1.0, -1.0)], Color::MAGENTA),
        ];

        let triangles = faces
            .iter()
            .map(|(points, color)| Triangle::new(*points, *color))
            .collect();

        Self::new(triangles, None)
    }

    pub fn with_background(mut self, background: Background) -> Self {
        self.background = Some(background);
        self
    }

    /// True when the mesh carries texture data to sample
    pub fn has_texture(&self) -> bool {
        self.texture.as_ref().is_some_and(|t| !t.pixels.is_empty())
    }

    /// World matrix `I * S * R * T`
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::identity()
            * Mat4::scale(self.scale)
            * Mat4::rotation(self.rotation)
            * Mat4::translation(self.translation)
    }

    /// Screen-space triangles collected by the last update
    pub fn render_list(&self) -> &[Triangle] {
        &self.render_list
    }

    /// Map every coordinate into 0..1 using the global min and max across
    /// all axes, so proportions are kept. Used to tame meshes with very
    /// large coordinates.
    pub fn normalize_coordinates(&mut self) {
        let Some((min, max)) = self.coord_min_max() else {
            return;
        };
        let range = max - min;
        if range == 0.0 {
            log::warn!("Mesh has zero extent, skipping normalization");
            return;
        }

        let normalize = |x: f64| (x - min) / range;
        for tri in &mut self.triangles {
            for p in &mut tri.points {
                *p = Vec3::new(normalize(p.x), normalize(p.y), normalize(p.z));
            }
        }
        self.reset_projected();
        log::debug!("Normalized {} triangles (min={}, max={})", self.triangles.len(), min, max);
    }

    /// Move the mesh so it is centered on the origin in X and Z. Y is left
    /// alone so a mesh that sits on the floor stays there.
    pub fn center_coordinates(&mut self) {
        let Some(offset) = self.center_offset() else {
            return;
        };
        let matrix = Mat4::translation(offset);

        for tri in &mut self.triangles {
            for p in &mut tri.points {
                *p = matrix.mul_vec4(p.to_vec4()).xyz();
            }
        }
        self.reset_projected();
        log::debug!("Centered mesh by ({:.3}, {:.3}, {:.3})", offset.x, offset.y, offset.z);
    }

    fn coord_min_max(&self) -> Option<(f64, f64)> {
        self.triangles
            .iter()
            .flat_map(|t| t.points.iter())
            .flat_map(|p| [p.x, p.y, p.z])
            .fold(None, |acc, c| match acc {
                None => Some((c, c)),
                Some((min, max)) => Some((min.min(c), max.max(c))),
            })
    }

    fn center_offset(&self) -> Option<Vec3> {
        let mut points = self.triangles.iter().flat_map(|t| t.points.iter());
        let first = *points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| {
            (
                Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z)),
                Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z)),
            )
        });

        Some(Vec3::new(-(max.x + min.x) / 2.0, 0.0, -(max.z + min.z) / 2.0))
    }

    fn reset_projected(&mut self) {
        for tri in &mut self.triangles {
            tri.projected = tri.points.map(|p| p.to_vec4());
        }
    }
}

/// Everything the engine draws in one frame
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub meshes: Vec<Mesh>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every mesh with a single one
    pub fn set_mesh(&mut self, mesh: Mesh) {
        self.meshes = vec![mesh];
    }

    pub fn add_mesh(&mut self, mesh: Mesh) {
        self.meshes.push(mesh);
    }

    /// Background of the first mesh that has one
    pub fn background(&self) -> Option<&Background> {
        self.meshes.iter().find_map(|m| m.background.as_ref())
    }

    pub fn has_texture(&self) -> bool {
        self.meshes.iter().any(Mesh::has_texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle(a: Vec3, b: Vec3, c: Vec3) -> Mesh {
        Mesh::new(vec![Triangle::new([a, b, c], Color::WHITE)], None)
    }

    #[test]
    fn test_cube_faces_point_outward() {
        let cube = Mesh::cube();
        assert_eq!(cube.triangles.len(), 12);
        for tri in &cube.triangles {
            let centroid = (tri.points[0] + tri.points[1] + tri.points[2]) * (1.0 / 3.0);
            assert!(tri.normal().dot(centroid) > 0.0, "inward face: {:?}", tri.points);
        }
    }

    #[test]
    fn test_normalize_uses_global_range() {
        let mut mesh = single_triangle(
            Vec3::new(-10.0, 0.0, 0.0),
            Vec3::new(10.0, 5.0, 0.0),
            Vec3::new(0.0, 0.0, 30.0),
        );
        mesh.normalize_coordinates();
        let p = mesh.triangles[0].points;
        assert_eq!(p[0], Vec3::new(0.0, 0.25, 0.25));
        assert_eq!(p[2].z, 1.0);
        assert_eq!(mesh.triangles[0].projected[2], p[2].to_vec4());
    }

    #[test]
    fn test_normalize_flat_mesh_is_noop() {
        let mut mesh = single_triangle(Vec3::ONE, Vec3::ONE, Vec3::ONE);
        mesh.normalize_coordinates();
        assert_eq!(mesh.triangles[0].points[0], Vec3::ONE);
    }

    #[test]
    fn test_center_keeps_y() {
        let mut mesh = single_triangle(
            Vec3::new(2.0, 1.0, 4.0),
            Vec3::new(6.0, 3.0, 4.0),
            Vec3::new(2.0, 1.0, 8.0),
        );
        mesh.center_coordinates();
        let p = mesh.triangles[0].points;
        assert_eq!(p[0], Vec3::new(-2.0, 1.0, -2.0));
        assert_eq!(p[1], Vec3::new(2.0, 3.0, -2.0));
    }

    #[test]
    fn test_empty_mesh_prep() {
        let mut mesh = Mesh::new(Vec::new(), None);
        mesh.normalize_coordinates();
        mesh.center_coordinates();
        assert!(mesh.triangles.is_empty());
    }

    #[test]
    fn test_world_matrix_order() {
        let mut mesh = Mesh::cube();
        mesh.scale = Vec3::new(2.0, 2.0, 2.0);
        mesh.translation = Vec3::new(1.0, 0.0, 0.0);
        // Translation is applied first, then scaled
        let p = mesh.world_matrix().mul_vec4(Vec3::ZERO.to_vec4());
        assert_eq!(p.xyz(), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_scene_background_first_found() {
        let mut scene = Scene::new();
        assert!(scene.background().is_none());
        scene.add_mesh(Mesh::cube());
        let bg = Background::new(Color::WHITE, Color::BLUE);
        scene.add_mesh(Mesh::cube().with_background(bg));
        assert_eq!(scene.background(), Some(&bg));
    }

    #[test]
    fn test_scene_texture_detection() {
        let mut scene = Scene::new();
        scene.set_mesh(Mesh::cube());
        assert!(!scene.has_texture());
        scene.add_mesh(Mesh::new(Vec::new(), Some(Texture::new(2, 2))));
        assert!(scene.has_texture());
    }
}
