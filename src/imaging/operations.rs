//! High-level image operations.
//!
//! These functions combine the pure calculations with pixel work on
//! already-decoded images. No file I/O happens here; decoding and encoding
//! belong to the backend.

use super::backend::{BackendError, Dimensions};
use super::calculations::{calculate_placement, calculate_watermark_size};
use super::params::Overlay;
use crate::settings::WatermarkSettings;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Plan the watermark overlay for a source of the given size.
///
/// Fails with [`BackendError::Geometry`] when either image is empty or the
/// watermark would scale to nothing.
pub fn plan_overlay(
    source: Dimensions,
    watermark: Dimensions,
    settings: &WatermarkSettings,
) -> Result<Overlay> {
    if source.width == 0 || source.height == 0 {
        return Err(BackendError::Geometry(format!(
            "source is {}x{}",
            source.width, source.height
        )));
    }
    let (width, height) = calculate_watermark_size(
        (source.width, source.height),
        (watermark.width, watermark.height),
        settings,
    )
    .ok_or_else(|| {
        BackendError::Geometry(format!(
            "watermark {}x{} cannot be scaled for a {}px wide source",
            watermark.width, watermark.height, source.width
        ))
    })?;
    let (x, y) = calculate_placement(
        settings.position,
        (source.width, source.height),
        (width, height),
    );
    Ok(Overlay {
        width,
        height,
        x,
        y,
    })
}

/// Blend the watermark onto a copy of `source`.
///
/// The watermark is scaled with a bilinear filter and alpha-composited at
/// the planned offset. Pixels outside its footprint keep the source's RGB
/// values exactly. The source image is not modified.
pub fn composite(
    source: &DynamicImage,
    watermark: &DynamicImage,
    settings: &WatermarkSettings,
) -> Result<DynamicImage> {
    let overlay = plan_overlay(
        source.dimensions().into(),
        watermark.dimensions().into(),
        settings,
    )?;

    let mark = if watermark.dimensions() == (overlay.width, overlay.height) {
        watermark.to_rgba8()
    } else {
        watermark
            .resize_exact(overlay.width, overlay.height, FilterType::Triangle)
            .into_rgba8()
    };

    let mut canvas = source.to_rgba8();
    imageops::overlay(&mut canvas, &mark, i64::from(overlay.x), i64::from(overlay.y));
    Ok(DynamicImage::ImageRgba8(canvas))
}
