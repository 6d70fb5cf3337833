//! Frame engine
//!
//! `update` runs the geometry half of the pipeline for every mesh:
//! world and view transform, backface culling, frustum clipping and
//! projection into the mesh render list. `render` clears the framebuffer and
//! rasterizes the render lists according to the current `RenderMode`.

use crate::config::RenderConfig;
use crate::rasterizer::{
    Color, CullMode, Framebuffer, Frustum, Mat4, Projector, RasterSettings, RenderMode, Vec3,
};
use crate::scene::Scene;

pub struct Engine {
    pub scene: Scene,
    pub settings: RasterSettings,
    pub framebuffer: Framebuffer,
    projector: Projector,
    frustum: Frustum,

    /// Spin meshes by `rotation_speed` radians per second
    pub auto_rotation: bool,
    pub rotation_speed: Vec3,
}

impl Engine {
    pub fn new(config: &RenderConfig, scene: Scene) -> Self {
        let mut settings = config.raster_settings();
        if scene.has_texture() {
            log::info!("Scene has textures, switching to {:?}", RenderMode::Texture);
            settings.render_mode = RenderMode::Texture;
        }

        Self {
            scene,
            settings,
            framebuffer: Framebuffer::new(config.width, config.height),
            projector: Projector::perspective(config.fov_y(), config.znear, config.zfar, config.width, config.height),
            frustum: Frustum::new(config.fov_x(), config.fov_y(), config.znear, config.zfar),
            auto_rotation: false,
            rotation_speed: config.rotation_speed,
        }
    }

    pub fn width(&self) -> usize {
        self.framebuffer.width
    }

    pub fn height(&self) -> usize {
        self.framebuffer.height
    }

    /// Transform, cull, clip and project every mesh. Returns the number of
    /// triangles queued for rendering.
    pub fn update(&mut self, view: &Mat4, dt: f64) -> usize {
        let mut queued = 0;

        for mesh in &mut self.scene.meshes {
            if self.auto_rotation {
                mesh.rotation = mesh.rotation + self.rotation_speed * dt;
            }

            let world = mesh.world_matrix();
            let camera = *view * world;

            for tri in &mut mesh.triangles {
                tri.projected = tri.points.map(|p| camera.mul_vec4(p.to_vec4()));

                // The camera sits at the view-space origin
                if self.settings.cull_mode == CullMode::BackFace {
                    let camera_ray = Vec3::ZERO - tri.projected[0].xyz();
                    if tri.normal().dot(camera_ray) < 0.0 {
                        continue;
                    }
                }

                if let Some(light) = &self.settings.light {
                    tri.light_intensity = light.intensity(tri.normal());
                }

                for mut clipped in self.frustum.clip(tri) {
                    clipped.projected = clipped.projected.map(|p| self.projector.project(p));
                    mesh.render_list.push(clipped);
                    queued += 1;
                }
            }
        }

        log::trace!("Queued {} triangles", queued);
        queued
    }

    /// Rasterize the render lists into the framebuffer, then empty them
    pub fn render(&mut self) {
        let fb = &mut self.framebuffer;
        let mode = self.settings.render_mode;

        match self.scene.background() {
            Some(background) => fb.set_background(background),
            None => {
                fb.clear(self.settings.clear_color);
                fb.draw_grid(self.settings.grid_color);
            }
        }
        fb.clear_depth();

        for mesh in &mut self.scene.meshes {
            let texture = mesh.texture.as_ref().filter(|t| !t.pixels.is_empty());

            for tri in &mesh.render_list {
                let [a, b, c] = tri.projected;

                if mode.draws_texture() {
                    match texture {
                        Some(texture) if tri.has_texture() => fb.draw_textured_triangle(tri, texture),
                        _ => fb.draw_filled_triangle(tri, tri.color),
                    }
                }

                if mode.draws_fill() {
                    fb.draw_filled_triangle(tri, tri.color);
                }

                if mode.draws_wire() {
                    fb.draw_triangle(
                        a.x as i32, a.y as i32,
                        b.x as i32, b.y as i32,
                        c.x as i32, c.y as i32,
                        Color::WHITE,
                    );
                }

                if mode == RenderMode::WireVertex {
                    for p in &tri.projected {
                        fb.draw_rectangle((p.x as i32).saturating_sub(2), (p.y as i32).saturating_sub(2), 4, 4, Color::RED);
                    }
                }
            }

            // Keep the allocation for the next frame
            mesh.render_list.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{Background, Palette, TexCoord, Texel, Texture, Triangle};
    use crate::scene::Mesh;
    use std::sync::Arc;

    fn view() -> Mat4 {
        Mat4::look_at(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO, Vec3::UP)
    }

    fn engine_with(mesh: Mesh) -> Engine {
        let mut scene = Scene::new();
        scene.set_mesh(mesh);
        Engine::new(&RenderConfig::default(), scene)
    }

    fn pixel(engine: &Engine, x: i32, y: i32) -> Color {
        engine.framebuffer.get_pixel(x, y).unwrap()
    }

    #[test]
    fn test_backface_culling_keeps_front_face() {
        let mut engine = engine_with(Mesh::cube());
        assert_eq!(engine.update(&view(), 0.0), 2);
        assert!(engine.scene.meshes[0].render_list().iter().all(|t| t.color == Color::RED));
    }

    #[test]
    fn test_cull_none_keeps_everything() {
        let mut engine = engine_with(Mesh::cube());
        engine.settings.cull_mode = CullMode::None;
        assert_eq!(engine.update(&view(), 0.0), 12);
    }

    #[test]
    fn test_fill_renders_front_face() {
        let mut engine = engine_with(Mesh::cube());
        engine.settings.render_mode = RenderMode::Fill;
        engine.update(&view(), 0.0);
        engine.render();

        assert_eq!(pixel(&engine, 400, 400), Color::RED);
        assert_eq!(pixel(&engine, 450, 350), Color::RED);
        // Grid dot outside the cube
        assert_eq!(pixel(&engine, 10, 10), Color::GREY);
    }

    #[test]
    fn test_render_lists_cleared_with_capacity() {
        let mut engine = engine_with(Mesh::cube());
        engine.update(&view(), 0.0);
        engine.render();
        let mesh = &engine.scene.meshes[0];
        assert!(mesh.render_list().is_empty());
        assert!(mesh.render_list.capacity() >= 2);
    }

    #[test]
    fn test_clip_then_rasterize_near_plane() {
        // One vertex behind the camera, two in front
        let tri = Triangle::new(
            [Vec3::new(0.0, -0.5, -1.0), Vec3::new(-1.0, -0.5, 4.0), Vec3::new(1.0, -0.5, 4.0)],
            Color::GREEN,
        );
        let mut engine = engine_with(Mesh::new(vec![tri], None));
        engine.settings.cull_mode = CullMode::None;
        engine.settings.render_mode = RenderMode::Fill;

        // Points behind the camera also sit outside the side planes, so the
        // exact triangle count depends on every plane
        let queued = engine.update(&Mat4::identity(), 0.0);
        assert!(queued >= 1);
        for t in engine.scene.meshes[0].render_list() {
            for p in &t.projected {
                assert!(p.w >= 0.3 - 1e-9, "vertex reached the rasterizer with w = {}", p.w);
            }
        }

        engine.render();
        let drawn = engine
            .framebuffer
            .pixels
            .chunks(4)
            .filter(|p| *p == Color::GREEN.to_bytes())
            .count();
        assert!(drawn > 0);
    }

    #[test]
    fn test_texture_mode_falls_back_to_flat() {
        let mut engine = engine_with(Mesh::cube());
        engine.settings.render_mode = RenderMode::Texture;
        engine.update(&view(), 0.0);
        engine.render();
        assert_eq!(pixel(&engine, 450, 350), Color::RED);
    }

    fn textured_quad(palette: Palette, index: u8) -> Mesh {
        let uv = TexCoord::new;
        let pts = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
        ];
        let palette = Arc::new(palette);
        let triangles = vec![
            Triangle::textured([pts[0], pts[1], pts[2]], [uv(0.0, 1.0), uv(0.0, 0.01), uv(1.0, 0.01)], Color::WHITE)
                .with_palette(palette.clone()),
            Triangle::textured([pts[0], pts[2], pts[3]], [uv(0.0, 1.0), uv(1.0, 0.01), uv(1.0, 1.0)], Color::WHITE)
                .with_palette(palette),
        ];
        let texture = Texture::from_texels(2, 2, vec![Texel::Index(index); 4]).unwrap();
        Mesh::new(triangles, Some(texture))
    }

    #[test]
    fn test_textured_scene_switches_mode() {
        let engine = engine_with(textured_quad(Palette::default(), 0));
        assert_eq!(engine.settings.render_mode, RenderMode::Texture);
    }

    #[test]
    fn test_palette_texture_rendered() {
        let mut colors = [Color::TRANSPARENT; 16];
        colors[2] = Color::BLUE;
        let mut engine = engine_with(textured_quad(Palette::new(colors), 2));
        engine.update(&view(), 0.0);
        engine.render();
        assert_eq!(pixel(&engine, 450, 350), Color::BLUE);
    }

    #[test]
    fn test_transparent_texels_show_background() {
        let bg = Background::new(Color::WHITE, Color::BLACK);
        let mut engine = engine_with(textured_quad(Palette::default(), 0).with_background(bg));
        engine.update(&view(), 0.0);
        engine.render();

        assert_eq!(pixel(&engine, 450, 350), bg.at(350, 800));
        assert!(engine.framebuffer.zbuffer.iter().all(|&d| d == 1.0));
    }

    #[test]
    fn test_wire_vertex_markers() {
        let mut engine = engine_with(Mesh::cube());
        engine.settings.render_mode = RenderMode::WireVertex;
        engine.update(&view(), 0.0);
        let corner = engine.scene.meshes[0].render_list()[0].projected[0];
        engine.render();
        assert_eq!(pixel(&engine, corner.x as i32 - 2, corner.y as i32 - 2), Color::RED);
    }

    #[test]
    fn test_auto_rotation_advances() {
        let mut engine = engine_with(Mesh::cube());
        engine.auto_rotation = true;
        engine.update(&view(), 2.0);
        assert_eq!(engine.scene.meshes[0].rotation, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_light_sets_intensity() {
        let mut engine = engine_with(Mesh::cube());
        engine.settings.light = Some(crate::rasterizer::Light { direction: Vec3::new(0.0, 0.0, 1.0), ambient: 0.1 });
        engine.update(&view(), 0.0);
        for t in engine.scene.meshes[0].render_list() {
            assert!((t.light_intensity - 1.0).abs() < 1e-9);
        }
    }
}
