//! Renderer configuration, stored as RON

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rasterizer::{Color, CullMode, Light, Projector, RasterSettings, RenderMode, Vec3};

/// Which camera the viewer drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraKind {
    Fps,
    Arc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    /// Full vertical field of view
    pub fov_y_degrees: f64,
    pub znear: f64,
    pub zfar: f64,
    pub cull_mode: CullMode,
    /// Starting mode; textured scenes switch to `Texture`
    pub render_mode: RenderMode,
    pub camera: CameraKind,
    pub grid_color: Color,
    pub clear_color: Color,
    pub target_fps: u32,
    pub light: Option<Light>,
    /// Radians per second applied while auto-rotation is on
    pub rotation_speed: Vec3,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            fov_y_degrees: 60.0,
            znear: 0.3,
            zfar: 100.0,
            cull_mode: CullMode::BackFace,
            render_mode: RenderMode::WireFill,
            camera: CameraKind::Fps,
            grid_color: Color::GREY,
            clear_color: Color::BLACK,
            target_fps: 60,
            light: None,
            rotation_speed: Vec3::new(0.0, 0.5, 0.0),
        }
    }
}

impl RenderConfig {
    /// Load from a RON file. A missing file gives the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => {
                log::info!("Loaded config from {}", path.display());
                Self::load_from_str(&contents)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Parse RON text; fields left out keep their defaults
    pub fn load_from_str(s: &str) -> Result<Self> {
        let config: RenderConfig = ron::from_str(s)?;
        Ok(config.validated())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .indentor("  ".to_string());

        let contents = ron::ser::to_string_pretty(self, pretty)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Replace values the pipeline cannot work with by their defaults
    fn validated(mut self) -> Self {
        let defaults = Self::default();

        if self.width == 0 || self.height == 0 {
            log::warn!("Invalid viewport {}x{}, using {}x{}", self.width, self.height, defaults.width, defaults.height);
            self.width = defaults.width;
            self.height = defaults.height;
        }
        if !(self.fov_y_degrees > 0.0 && self.fov_y_degrees < 180.0) {
            log::warn!("Invalid fov_y_degrees {}, using {}", self.fov_y_degrees, defaults.fov_y_degrees);
            self.fov_y_degrees = defaults.fov_y_degrees;
        }
        if !(self.znear > 0.0 && self.znear < self.zfar) {
            log::warn!(
                "Invalid depth range {}..{}, using {}..{}",
                self.znear, self.zfar, defaults.znear, defaults.zfar
            );
            self.znear = defaults.znear;
            self.zfar = defaults.zfar;
        }
        if self.target_fps == 0 {
            log::warn!("target_fps must be positive, using {}", defaults.target_fps);
            self.target_fps = defaults.target_fps;
        }

        self
    }

    pub fn fov_y(&self) -> f64 {
        self.fov_y_degrees.to_radians()
    }

    /// Horizontal FOV for the configured viewport
    pub fn fov_x(&self) -> f64 {
        Projector::fov_x(self.fov_y(), self.width, self.height)
    }

    pub fn frame_time(&self) -> f64 {
        1.0 / self.target_fps.max(1) as f64
    }

    /// Time left in the frame budget after `elapsed` seconds of work
    pub fn frame_delay(&self, elapsed: f64) -> Option<Duration> {
        let remaining = self.frame_time() - elapsed;
        (remaining > 0.0).then(|| Duration::from_secs_f64(remaining))
    }

    pub fn raster_settings(&self) -> RasterSettings {
        RasterSettings {
            render_mode: self.render_mode,
            cull_mode: self.cull_mode,
            grid_color: self.grid_color,
            clear_color: self.clear_color,
            light: self.light,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig::load(dir.path().join("missing.ron")).unwrap();
        assert_eq!(config, RenderConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.ron");

        let config = RenderConfig {
            width: 640,
            height: 480,
            render_mode: RenderMode::Texture,
            camera: CameraKind::Arc,
            light: Some(Light { direction: Vec3::new(0.0, 0.0, 1.0), ambient: 0.1 }),
            ..Default::default()
        };
        config.save(&path).unwrap();

        assert_eq!(RenderConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = RenderConfig::load_from_str("(znear: 1.0, render_mode: Fill)").unwrap();
        assert_eq!(config.znear, 1.0);
        assert_eq!(config.render_mode, RenderMode::Fill);
        assert_eq!(config.zfar, 100.0);
        assert_eq!(config.width, 800);
    }

    #[test]
    fn test_bad_depth_range_replaced() {
        let config = RenderConfig::load_from_str("(znear: 50.0, zfar: 10.0)").unwrap();
        assert_eq!((config.znear, config.zfar), (0.3, 100.0));
    }

    #[test]
    fn test_parse_error() {
        assert!(RenderConfig::load_from_str("(width: \"wide\")").is_err());
    }

    #[test]
    fn test_frame_delay() {
        let config = RenderConfig { target_fps: 50, ..Default::default() };
        let delay = config.frame_delay(0.015).unwrap();
        assert!((delay.as_secs_f64() - 0.005).abs() < 1e-9);
        assert_eq!(config.frame_delay(0.03), None);

        // Unvalidated zero rate still yields a finite budget
        let zero = RenderConfig { target_fps: 0, ..Default::default() };
        assert!(zero.frame_delay(0.0).is_some());
    }

    #[test]
    fn test_fov_x_wider_viewport() {
        let config = RenderConfig { width: 1600, height: 800, ..Default::default() };
        assert!(config.fov_x() > config.fov_y());
        let square = RenderConfig::default();
        assert!((square.fov_x() - square.fov_y()).abs() < 1e-12);
    }
}
