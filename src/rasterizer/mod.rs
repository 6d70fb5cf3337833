//! Software triangle rasterizer
//!
//! Pipeline stages, in the order the engine runs them:
//! - `clip`: view-space frustum clipping (Sutherland-Hodgman)
//! - `project`: perspective projection to screen pixels
//! - `render`: scanline fill with z-buffer, perspective-correct UVs and
//!   16-color palette textures

mod clip;
mod math;
mod project;
mod render;
mod types;

pub use clip::*;
pub use math::*;
pub use project::*;
pub use render::*;
pub use types::*;

/// Default viewport
pub const WIDTH: usize = 800;
pub const HEIGHT: usize = 800;
