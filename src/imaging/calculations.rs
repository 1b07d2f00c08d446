//! Pure calculation functions for watermark sizing and placement.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::settings::{Position, SizeMode, WatermarkSettings};

/// Distance kept between the watermark and the edges it is anchored to.
pub const MARGIN_PX: u32 = 10;

/// Photos narrower than this get a watermark sized as a percentage of
/// their width instead of the configured base width.
pub const SMALL_IMAGE_WIDTH: u32 = 300;

/// The watermark is never scaled narrower than this.
pub const MIN_WATERMARK_WIDTH: u32 = 20;

/// Calculate the scaled watermark dimensions for a source photo.
///
/// # Arguments
/// * `source` - Source photo dimensions (width, height)
/// * `watermark` - Native watermark dimensions (width, height)
/// * `settings` - Size mode, custom width and small-photo percentage
///
/// # Returns
/// * `Some((width, height))` - Target watermark dimensions
/// * `None` - The watermark has zero width or would scale to zero height
///
/// # Examples
/// ```
/// # use product_watermark::imaging::calculate_watermark_size;
/// # use product_watermark::settings::WatermarkSettings;
/// // Large photo, default size mode: watermark keeps its native width
/// let s = WatermarkSettings::default();
/// assert_eq!(calculate_watermark_size((800, 600), (200, 100), &s), Some((200, 100)));
///
/// // Small photo: 40% of 200px
/// assert_eq!(calculate_watermark_size((200, 150), (200, 100), &s), Some((80, 40)));
/// ```
pub fn calculate_watermark_size(
    source: (u32, u32),
    watermark: (u32, u32),
    settings: &WatermarkSettings,
) -> Option<(u32, u32)> {
    let (src_w, _) = source;
    let (wm_w, wm_h) = watermark;
    if wm_w == 0 {
        return None;
    }

    let base_width = match settings.size_mode {
        SizeMode::Default => wm_w,
        SizeMode::Custom => settings.custom_width_px,
    }
    .min(src_w);

    let target_w = if src_w < SMALL_IMAGE_WIDTH {
        (src_w as f64 * settings.max_width_pct as f64 / 100.0).round() as u32
    } else {
        base_width
    }
    .max(MIN_WATERMARK_WIDTH);

    let target_h = (wm_h as f64 * target_w as f64 / wm_w as f64).round() as u32;
    (target_h > 0).then_some((target_w, target_h))
}

/// Calculate the top-left corner of the watermark on the source photo.
///
/// Corner positions sit [`MARGIN_PX`] in from their two edges; `Center`
/// is centered on both axes (halves rounded). Offsets that would be
/// negative, because the watermark is wider or taller than the space left,
/// are clamped to zero.
///
/// # Examples
/// ```
/// # use product_watermark::imaging::calculate_placement;
/// # use product_watermark::settings::Position;
/// assert_eq!(calculate_placement(Position::BottomRight, (800, 600), (200, 100)), (590, 490));
/// assert_eq!(calculate_placement(Position::Center, (800, 600), (200, 100)), (300, 250));
/// ```
pub fn calculate_placement(position: Position, source: (u32, u32), mark: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = (source.0 as i64, source.1 as i64);
    let (wm_w, wm_h) = (mark.0 as i64, mark.1 as i64);
    let m = MARGIN_PX as i64;

    let far_x = src_w - wm_w - m;
    let far_y = src_h - wm_h - m;

    let (x, y) = match position {
        Position::TopLeft => (m, m),
        Position::TopRight => (far_x, m),
        Position::BottomLeft => (m, far_y),
        Position::BottomRight => (far_x, far_y),
        Position::Center => (
            ((src_w - wm_w) as f64 / 2.0).round() as i64,
            ((src_h - wm_h) as f64 / 2.0).round() as i64,
        ),
    };

    (x.max(0) as u32, y.max(0) as u32)
}
