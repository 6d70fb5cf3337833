//! Error types
//!
//! Only the edges that read files or raw bytes can fail. Clipping,
//! projection and rasterization never return errors.

use thiserror::Error;

/// Errors raised while loading configuration or texture data
#[derive(Error, Debug)]
pub enum HereticError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] ron::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Texture has no pixels ({width}x{height})")]
    EmptyTexture { width: usize, height: usize },

    #[error("Texture is {width}x{height} but has {len} pixels")]
    TextureSize { width: usize, height: usize, len: usize },

    #[error("Packed 4-bit texture needs {expected} bytes, got {len}")]
    PackedLength { expected: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, HereticError>;
