//! Core types for the rasterizer

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::math::{Vec3, Vec4};
use crate::error::{HereticError, Result};

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const GREY: Color = Color { r: 0x55, g: 0x55, b: 0x55, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };
    pub const YELLOW: Color = Color { r: 255, g: 255, b: 0, a: 255 };
    pub const CYAN: Color = Color { r: 0, g: 255, b: 255, a: 255 };
    pub const MAGENTA: Color = Color { r: 255, g: 0, b: 255, a: 255 };

    /// Reserved palette entry: pixels resolving to this are not drawn
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Decode a PSX 15-bit BGR word. A zero word is the transparent sentinel.
    pub fn from_rgb15(val: u16) -> Self {
        if val == 0 {
            return Color::TRANSPARENT;
        }
        Self {
            r: ((val & 0x1f) << 3) as u8,
            g: (((val >> 5) & 0x1f) << 3) as u8,
            b: (((val >> 10) & 0x1f) << 3) as u8,
            a: 255,
        }
    }

    pub fn is_transparent(self) -> bool {
        self == Color::TRANSPARENT
    }

    /// Apply shading (multiply by intensity 0.0-1.0)
    pub fn shade(self, intensity: f64) -> Self {
        let i = intensity.clamp(0.0, 1.0);
        Self {
            r: (self.r as f64 * i) as u8,
            g: (self.g as f64 * i) as u8,
            b: (self.b as f64 * i) as u8,
            a: self.a,
        }
    }

    /// Convert to [u8; 4] for framebuffer
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self::with_alpha(bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

/// 16-color lookup table for indexed textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Palette(pub [Color; 16]);

impl Palette {
    pub fn new(colors: [Color; 16]) -> Self {
        Self(colors)
    }

    pub fn from_rgb15(words: &[u16; 16]) -> Self {
        let mut colors = [Color::TRANSPARENT; 16];
        for (dst, &word) in colors.iter_mut().zip(words.iter()) {
            *dst = Color::from_rgb15(word);
        }
        Self(colors)
    }

    /// Look up an index; only the low nibble is used
    pub fn get(&self, index: u8) -> Color {
        self.0[(index & 0x0f) as usize]
    }
}

/// Texture coordinate. (0, 0) doubles as "no texture".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TexCoord {
    pub u: f64,
    pub v: f64,
}

impl TexCoord {
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }

    pub fn is_empty(self) -> bool {
        self.u == 0.0 && self.v == 0.0
    }

    pub fn lerp(self, other: TexCoord, t: f64) -> TexCoord {
        TexCoord {
            u: super::math::lerp(self.u, other.u, t),
            v: super::math::lerp(self.v, other.v, t),
        }
    }
}

/// A stored texture pixel: either a real color or a palette slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Texel {
    Direct(Color),
    Index(u8),
}

impl Default for Texel {
    fn default() -> Self {
        Texel::Direct(Color::WHITE)
    }
}

/// Row-major texture, origin top-left
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Texel>,
    pub name: String,
}

impl Texture {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Texel::default(); width * height],
            name: String::new(),
        }
    }

    /// Build from existing texels, checking the dimensions
    pub fn from_texels(width: usize, height: usize, pixels: Vec<Texel>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(HereticError::EmptyTexture { width, height });
        }
        if pixels.len() != width * height {
            return Err(HereticError::TextureSize {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            name: String::new(),
        })
    }

    /// Build an indexed texture from PSX packed 4-bit data, two pixels per
    /// byte with the low nibble first.
    pub fn from_packed_indices(width: usize, height: usize, bytes: &[u8]) -> Result<Self> {
        let expected = width * height / 2;
        if width * height % 2 != 0 || bytes.len() != expected {
            return Err(HereticError::PackedLength {
                expected,
                len: bytes.len(),
            });
        }

        let pixels = bytes
            .iter()
            .flat_map(|b| [Texel::Index(b & 0x0f), Texel::Index((b & 0xf0) >> 4)])
            .collect();

        let tex = Self::from_texels(width, height, pixels)?;
        log::debug!("Unpacked {}x{} indexed texture", width, height);
        Ok(tex)
    }

    /// Load texture from a PNG file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path)?;

        let mut tex = Self::from_image(img)?;
        tex.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        log::debug!("Loaded texture: {} ({}x{})", tex.name, tex.width, tex.height);
        Ok(tex)
    }

    /// Load texture from raw PNG bytes
    pub fn from_bytes(bytes: &[u8], name: String) -> Result<Self> {
        let img = image::load_from_memory(bytes)?;
        let mut tex = Self::from_image(img)?;
        tex.name = name;
        Ok(tex)
    }

    fn from_image(img: image::DynamicImage) -> Result<Self> {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let pixels: Vec<Texel> = rgba
            .pixels()
            .map(|p| Texel::Direct(Color::with_alpha(p[0], p[1], p[2], p[3])))
            .collect();

        Self::from_texels(width as usize, height as usize, pixels)
    }

    /// Create a checkerboard test texture
    pub fn checkerboard(width: usize, height: usize, color1: Color, color2: Color) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let checker = ((x / 4) + (y / 4)) % 2 == 0;
                pixels.push(Texel::Direct(if checker { color1 } else { color2 }));
            }
        }
        Self { width, height, pixels, name: "checkerboard".to_string() }
    }

    /// Texel at (u, v). |u| and |v| absorb rounding noise below zero and the
    /// modulo wraps coordinates past one.
    pub fn sample(&self, u: f64, v: f64) -> Texel {
        let tx = ((u * self.width as f64).abs() as usize) % self.width;
        let ty = ((v * self.height as f64).abs() as usize) % self.height;
        self.pixels[ty * self.width + tx]
    }
}

/// Vertical gradient used as a clear color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background {
    pub top: Color,
    pub bottom: Color,
}

impl Background {
    pub fn new(top: Color, bottom: Color) -> Self {
        Self { top, bottom }
    }

    /// Color of row `y`; blends from `bottom` at row 0 towards `top`
    pub fn at(&self, y: usize, height: usize) -> Color {
        let d = y as f64 / height as f64;
        let mix = |bottom: u8, top: u8| (bottom as f64 + d * (top as f64 - bottom as f64)) as u8;
        Color::new(
            mix(self.bottom.r, self.top.r),
            mix(self.bottom.g, self.top.g),
            mix(self.bottom.b, self.top.b),
        )
    }
}

/// A triangle as it moves through the pipeline.
///
/// `points` are the mesh's object-space positions and never change.
/// `projected` is rewritten every frame: view-space after the world/view
/// transform, screen-space after projection.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub points: [Vec3; 3],
    pub projected: [Vec4; 3],
    pub texcoords: [TexCoord; 3],
    pub palette: Option<Arc<Palette>>,
    /// Used when untextured, or textured without a usable texel
    pub color: Color,
    pub light_intensity: f64,
}

impl Triangle {
    pub fn new(points: [Vec3; 3], color: Color) -> Self {
        Self {
            points,
            projected: [
                points[0].to_vec4(),
                points[1].to_vec4(),
                points[2].to_vec4(),
            ],
            texcoords: [TexCoord::default(); 3],
            palette: None,
            color,
            light_intensity: 1.0,
        }
    }

    pub fn textured(points: [Vec3; 3], texcoords: [TexCoord; 3], color: Color) -> Self {
        Self {
            texcoords,
            ..Self::new(points, color)
        }
    }

    pub fn with_palette(mut self, palette: Arc<Palette>) -> Self {
        self.palette = Some(palette);
        self
    }

    /// Face normal of the current `projected` positions (left-handed)
    pub fn normal(&self) -> Vec3 {
        let a = self.projected[0].xyz();
        let b = self.projected[1].xyz();
        let c = self.projected[2].xyz();
        let ab = (b - a).normalize();
        let ac = (c - a).normalize();
        ab.cross(ac).normalize()
    }

    pub fn has_texture(&self) -> bool {
        self.texcoords.iter().any(|tc| !tc.is_empty())
    }
}

/// What the engine draws for each triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderMode {
    Wire,
    WireVertex,
    WireFill,
    Fill,
    Texture,
    TextureWire,
}

impl RenderMode {
    pub fn draws_wire(self) -> bool {
        matches!(
            self,
            RenderMode::Wire | RenderMode::WireVertex | RenderMode::WireFill | RenderMode::TextureWire
        )
    }

    pub fn draws_fill(self) -> bool {
        matches!(self, RenderMode::Fill | RenderMode::WireFill)
    }

    pub fn draws_texture(self) -> bool {
        matches!(self, RenderMode::Texture | RenderMode::TextureWire)
    }
}

/// Backface culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CullMode {
    None,
    BackFace,
}

/// Directional light feeding the scalar per-triangle intensity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub direction: Vec3,
    /// Minimum intensity for faces turned away from the light
    pub ambient: f64,
}

impl Light {
    pub fn intensity(&self, normal: Vec3) -> f64 {
        (-normal.dot(self.direction.normalize())).max(self.ambient).clamp(0.0, 1.0)
    }
}

/// Rasterizer settings
#[derive(Debug, Clone)]
pub struct RasterSettings {
    pub render_mode: RenderMode,
    pub cull_mode: CullMode,
    /// Color for the dotted grid drawn when there is no background gradient
    pub grid_color: Color,
    pub clear_color: Color,
    pub light: Option<Light>,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::WireFill,
            cull_mode: CullMode::BackFace,
            grid_color: Color::GREY,
            clear_color: Color::BLACK,
            light: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb15_decode() {
        // Pure red, green, blue in BGR555
        assert_eq!(Color::from_rgb15(0x001f), Color::new(0xf8, 0, 0));
        assert_eq!(Color::from_rgb15(0x03e0), Color::new(0, 0xf8, 0));
        assert_eq!(Color::from_rgb15(0x7c00), Color::new(0, 0, 0xf8));
        assert!(Color::from_rgb15(0).is_transparent());
    }

    #[test]
    fn test_black_is_not_transparent() {
        assert!(!Color::BLACK.is_transparent());
    }

    #[test]
    fn test_shade_clamps() {
        let c = Color::new(200, 100, 50);
        assert_eq!(c.shade(0.5), Color::new(100, 50, 25));
        assert_eq!(c.shade(2.0), c);
        assert_eq!(c.shade(-1.0), Color::new(0, 0, 0));
    }

    #[test]
    fn test_palette_uses_low_nibble() {
        let mut colors = [Color::BLACK; 16];
        colors[3] = Color::RED;
        let palette = Palette::new(colors);
        assert_eq!(palette.get(3), Color::RED);
        assert_eq!(palette.get(0x13), Color::RED);
    }

    #[test]
    fn test_packed_indices_low_nibble_first() {
        let tex = Texture::from_packed_indices(4, 1, &[0x21, 0x43]).unwrap();
        assert_eq!(
            tex.pixels,
            vec![Texel::Index(1), Texel::Index(2), Texel::Index(3), Texel::Index(4)]
        );
    }

    #[test]
    fn test_packed_indices_rejects_wrong_length() {
        assert!(Texture::from_packed_indices(4, 4, &[0u8; 3]).is_err());
    }

    #[test]
    fn test_from_texels_rejects_empty() {
        assert!(Texture::from_texels(0, 4, Vec::new()).is_err());
    }

    #[test]
    fn test_sample_wraps_and_absorbs_negative_noise() {
        let mut tex = Texture::new(4, 4);
        tex.pixels[0] = Texel::Direct(Color::RED);
        tex.pixels[1] = Texel::Direct(Color::GREEN);
        assert_eq!(tex.sample(0.0, 0.0), Texel::Direct(Color::RED));
        assert_eq!(tex.sample(-1e-12, -1e-12), Texel::Direct(Color::RED));
        assert_eq!(tex.sample(1.25, 0.0), Texel::Direct(Color::GREEN));
    }

    #[test]
    fn test_from_bytes_png() {
        let img = image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let tex = Texture::from_bytes(&bytes, "test".to_string()).unwrap();
        assert_eq!((tex.width, tex.height), (2, 3));
        assert_eq!(tex.pixels[5], Texel::Direct(Color::new(10, 20, 30)));
    }

    #[test]
    fn test_background_gradient_rows() {
        let bg = Background::new(Color::new(200, 0, 0), Color::new(0, 0, 100));
        assert_eq!(bg.at(0, 100), Color::new(0, 0, 100));
        assert_eq!(bg.at(50, 100), Color::new(100, 0, 50));
    }

    #[test]
    fn test_has_texture() {
        let pts = [Vec3::ZERO, Vec3::UP, Vec3::ONE];
        assert!(!Triangle::new(pts, Color::RED).has_texture());
        let tri = Triangle::textured(
            pts,
            [TexCoord::new(0.0, 0.0), TexCoord::new(0.5, 0.0), TexCoord::new(0.0, 0.5)],
            Color::RED,
        );
        assert!(tri.has_texture());
    }

    #[test]
    fn test_normal_left_handed() {
        let tri = Triangle::new(
            [Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0)],
            Color::WHITE,
        );
        let n = tri.normal();
        assert!((n.z + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_light_intensity_floor() {
        let light = Light { direction: Vec3::new(0.0, 0.0, 1.0), ambient: 0.2 };
        assert!((light.intensity(Vec3::new(0.0, 0.0, -1.0)) - 1.0).abs() < 1e-9);
        assert!((light.intensity(Vec3::new(0.0, 0.0, 1.0)) - 0.2).abs() < 1e-9);
    }
}
