//! heretic: software 3D triangle renderer
//!
//! Frustum clipping, perspective projection and scanline rasterization with
//! a z-buffer, perspective-correct texturing and 16-color palette textures
//! with cut-out transparency. Everything runs on the CPU into a plain RGBA
//! framebuffer; displaying it is up to the caller.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod camera;
pub mod config;
pub mod engine;
pub mod error;
pub mod rasterizer;
pub mod scene;

pub use error::{HereticError, Result};
