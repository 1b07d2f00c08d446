//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the one seam between the caching layer and
//! pixel work: given a [`WatermarkParams`], produce the encoded artifact
//! bytes. The backend never touches the artifact store; the caller decides
//! where (and whether) the bytes land.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust on top of
//! the `image` crate.

use super::params::WatermarkParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Invalid geometry: {0}")]
    Geometry(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can serve concurrent requests and rayon workers.
pub trait ImageBackend: Sync {
    /// Composite the watermark onto the source and return the encoded bytes.
    fn render(&self, params: &WatermarkParams) -> Result<Vec<u8>, BackendError>;
}
