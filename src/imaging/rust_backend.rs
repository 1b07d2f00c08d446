//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image::ImageReader`, format sniffed from content |
//! | Scale watermark | `image::DynamicImage::resize_exact` with `Triangle` filter |
//! | Blend | `image::imageops::overlay` (alpha-composited) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the given quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless, keeps alpha) |

use super::backend::{BackendError, ImageBackend};
use super::operations::composite;
use super::params::{OutputFormat, Quality, WatermarkParams};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageReader};
use std::path::Path;

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
///
/// The format is taken from the file's leading bytes, not its extension.
pub fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| BackendError::Decode(format!("Failed to decode {}: {}", path.display(), e)))
}

/// Encode an image in memory.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first.
pub fn encode_image(
    img: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let result = match format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let quality = quality.value().min(100) as u8;
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        }
        OutputFormat::Png => img.write_with_encoder(PngEncoder::new(&mut buf)),
    };
    result.map_err(|e| BackendError::Encode(format!("{format:?} encode failed: {e}")))?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn render(&self, params: &WatermarkParams) -> Result<Vec<u8>, BackendError> {
        let source = load_image(&params.source)?;
        let watermark = load_image(&params.watermark)?;
        let composed = composite(&source, &watermark, &params.settings)?;
        encode_image(&composed, params.format, params.quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Position, WatermarkSettings};
    use crate::test_helpers::{write_test_jpeg, write_test_png};
    use image::{GenericImageView, Rgba};

    fn params(source: &Path, watermark: &Path, format: OutputFormat) -> WatermarkParams {
        WatermarkParams {
            source: source.to_path_buf(),
            watermark: watermark.to_path_buf(),
            settings: WatermarkSettings {
                position: Position::BottomRight,
                ..WatermarkSettings::default()
            },
            format,
            quality: Quality::default(),
        }
    }

    #[test]
    fn render_jpeg_keeps_source_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("shoe.jpg");
        let mark = tmp.path().join("logo.png");
        write_test_jpeg(&source, 800, 600);
        write_test_png(&mark, 200, 100, Rgba([255, 0, 0, 255]));

        let bytes = RustBackend::new()
            .render(&params(&source, &mark, OutputFormat::Jpeg))
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (800, 600));
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            image::ImageFormat::Jpeg
        );

        // Center of the mark is strongly red even after JPEG
        let px = decoded.to_rgb8().get_pixel(690, 540).0;
        assert!(px[0] > 200 && px[1] < 60 && px[2] < 60, "{px:?}");
    }

    #[test]
    fn render_png_is_lossless() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("shoe.png");
        let mark = tmp.path().join("logo.png");
        write_test_png(&source, 400, 300, Rgba([10, 20, 30, 255]));
        write_test_png(&mark, 100, 50, Rgba([0, 255, 0, 255]));

        let bytes = RustBackend::new()
            .render(&params(&source, &mark, OutputFormat::Png))
            .unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);

        let out = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(*out.get_pixel(0, 0), Rgba([10, 20, 30, 255]));
        // 100x50 at (290, 240)
        assert_eq!(*out.get_pixel(290, 240), Rgba([0, 255, 0, 255]));
        assert_eq!(*out.get_pixel(289, 240), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn format_is_sniffed_not_trusted() {
        let tmp = tempfile::TempDir::new().unwrap();
        // PNG bytes behind a .jpg name
        let source = tmp.path().join("mislabeled.jpg");
        let mark = tmp.path().join("logo.png");
        write_test_png(&source, 320, 240, Rgba([50, 50, 50, 255]));
        write_test_png(&mark, 40, 20, Rgba([255, 255, 255, 255]));

        assert!(
            RustBackend::new()
                .render(&params(&source, &mark, OutputFormat::Jpeg))
                .is_ok()
        );
    }

    #[test]
    fn corrupt_source_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("broken.jpg");
        let mark = tmp.path().join("logo.png");
        std::fs::write(&source, b"\xFF\xD8\xFF\xE0 definitely not a jpeg").unwrap();
        write_test_png(&mark, 40, 20, Rgba([255, 255, 255, 255]));

        let result = RustBackend::new().render(&params(&source, &mark, OutputFormat::Jpeg));
        assert!(matches!(result, Err(BackendError::Decode(_))), "{result:?}");
    }

    #[test]
    fn missing_watermark_is_io_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("shoe.jpg");
        write_test_jpeg(&source, 320, 240);

        let result = RustBackend::new().render(&params(
            &source,
            &tmp.path().join("gone.png"),
            OutputFormat::Jpeg,
        ));
        assert!(matches!(result, Err(BackendError::Io(_))), "{result:?}");
    }

    #[test]
    fn encode_jpeg_drops_alpha() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            16,
            16,
            Rgba([200, 100, 50, 128]),
        ));
        let bytes = encode_image(&img, OutputFormat::Jpeg, Quality::default()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(!decoded.color().has_alpha());
    }
}
