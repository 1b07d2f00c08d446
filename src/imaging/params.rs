//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the orchestrator (which decides which photo gets
//! which watermark) and the [`backend`](super::backend) (which does the
//! actual pixel work). This separation allows swapping backends (e.g. for
//! testing with a mock) without changing the caching logic.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1 to 100, default 90). Clamped on construction.
//! - [`OutputFormat`]: encoder for the artifact, chosen from its extension.
//! - [`Overlay`]: where the scaled watermark lands on the source.
//! - [`WatermarkParams`]: full specification for one render.

use std::path::PathBuf;

use crate::settings::WatermarkSettings;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Encoded format of a watermarked artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// `png` encodes as PNG; everything else (including the `jpg`
    /// fallback for unsupported sources) encodes as JPEG.
    pub fn from_extension(ext: &str) -> Self {
        if ext.eq_ignore_ascii_case("png") {
            Self::Png
        } else {
            Self::Jpeg
        }
    }
}

/// Scaled watermark size and its top-left offset on the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlay {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

/// Parameters for one watermark render.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkParams {
    pub source: PathBuf,
    pub watermark: PathBuf,
    pub settings: WatermarkSettings,
    pub format: OutputFormat,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn output_format_from_extension() {
        assert_eq!(OutputFormat::from_extension("png"), OutputFormat::Png);
        assert_eq!(OutputFormat::from_extension("PNG"), OutputFormat::Png);
        assert_eq!(OutputFormat::from_extension("jpg"), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::from_extension("jpeg"), OutputFormat::Jpeg);
    }
}
