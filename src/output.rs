//! CLI output formatting for every subcommand.
//!
//! # Display Contract
//!
//! The first line of every command's output is the answer: a URL, a path,
//! or a summary. Context lines follow, indented four spaces. Scripts can
//! take the first line and ignore the rest.
//!
//! ## Resolve
//!
//! ```text
//! /uploads/watermark-cache/wm-101-woocommerce_single-3f2a….jpg
//!     Image: 101 (woocommerce_single)
//!     Status: generated
//! ```
//!
//! On pass-through the first line is the original URL and `Status:` says why.
//!
//! ## Warm
//!
//! ```text
//! Item 7: 2 cached, 4 generated (6 total)
//! ```
//!
//! ## Render
//!
//! ```text
//! out.jpg
//!     Source: shoe.jpg (800x600)
//!     Watermark: logo.png at 590,490 (200x100, bottom_right)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use std::path::Path;

use crate::catalog::ItemId;
use crate::config::WatermarkConfig;
use crate::eligibility::ImageRequest;
use crate::imaging::{Dimensions, Overlay};
use crate::settings::WatermarkSettings;
use crate::watermark::{Outcome, WarmStats};

fn indent(line: impl AsRef<str>) -> String {
    format!("    {}", line.as_ref())
}

// ============================================================================
// Resolve
// ============================================================================

pub fn format_resolve_output(request: &ImageRequest, outcome: &Outcome) -> Vec<String> {
    let (url, status) = match outcome {
        Outcome::Cached(a) => (a.url.as_str(), "cached".to_string()),
        Outcome::Generated(a) => (a.url.as_str(), "generated".to_string()),
        Outcome::Ineligible(reason) => (
            request.source_url.as_str(),
            format!("unchanged ({reason})"),
        ),
    };
    let image = match &request.rendition {
        Some(r) => format!("Image: {} ({r})", request.image_id),
        None => format!("Image: {}", request.image_id),
    };
    vec![url.to_string(), indent(image), indent(format!("Status: {status}"))]
}

/// Output when processing failed and the original URL stands.
pub fn format_resolve_fallback(
    request: &ImageRequest,
    error: &dyn std::error::Error,
) -> Vec<String> {
    vec![
        request.source_url.clone(),
        indent(format!("Image: {}", request.image_id)),
        indent(format!("Status: unchanged (error: {error})")),
    ]
}

pub fn print_resolve_output(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

// ============================================================================
// Warm
// ============================================================================

pub fn format_warm_output(item: ItemId, stats: &WarmStats) -> Vec<String> {
    vec![format!("Item {item}: {stats}")]
}

pub fn print_warm_output(item: ItemId, stats: &WarmStats) {
    for line in format_warm_output(item, stats) {
        println!("{line}");
    }
}

// ============================================================================
// Render
// ============================================================================

pub fn format_render_output(
    output: &Path,
    source: &Path,
    source_dims: Dimensions,
    watermark: &Path,
    overlay: &Overlay,
    settings: &WatermarkSettings,
) -> Vec<String> {
    vec![
        output.display().to_string(),
        indent(format!(
            "Source: {} ({}x{})",
            source.display(),
            source_dims.width,
            source_dims.height
        )),
        indent(format!(
            "Watermark: {} at {},{} ({}x{}, {})",
            watermark.display(),
            overlay.x,
            overlay.y,
            overlay.width,
            overlay.height,
            settings.position
        )),
    ]
}

pub fn print_render_output(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(config: &WatermarkConfig, base_dir: &Path) -> Vec<String> {
    vec![
        "Config is valid".to_string(),
        indent(format!(
            "Storage: {} → {}",
            config.storage.base_url,
            base_dir.display()
        )),
        indent(format!(
            "Cache: {}/{}/{}-*",
            config.storage.base_url.trim_end_matches('/'),
            config.cache.dir_name,
            config.cache.prefix
        )),
        indent(format!(
            "Renditions: {}",
            config.renditions.allowed.join(", ")
        )),
    ]
}

pub fn print_check_output(config: &WatermarkConfig, base_dir: &Path) {
    for line in format_check_output(config, base_dir) {
        println!("{line}");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::{BrowsingContext, Ineligible};
    use crate::settings::Position;
    use crate::store::Artifact;

    fn request() -> ImageRequest {
        ImageRequest::new(
            101,
            Some("woocommerce_single"),
            BrowsingContext::ItemDetail(7),
            "/uploads/shoe.jpg",
        )
    }

    #[test]
    fn resolve_generated_leads_with_artifact_url() {
        let outcome = Outcome::Generated(Artifact {
            path: "/srv/uploads/watermark-cache/wm-101.jpg".into(),
            url: "/uploads/watermark-cache/wm-101.jpg".to_string(),
        });
        let lines = format_resolve_output(&request(), &outcome);
        assert_eq!(
            lines,
            vec![
                "/uploads/watermark-cache/wm-101.jpg",
                "    Image: 101 (woocommerce_single)",
                "    Status: generated",
            ]
        );
    }

    #[test]
    fn resolve_ineligible_keeps_original() {
        let outcome = Outcome::Ineligible(Ineligible::NoWatermark);
        let lines = format_resolve_output(&request(), &outcome);
        assert_eq!(lines[0], "/uploads/shoe.jpg");
        assert_eq!(
            lines[2],
            "    Status: unchanged (no watermark image configured)"
        );
    }

    #[test]
    fn resolve_without_rendition() {
        let mut req = request();
        req.rendition = None;
        let lines = format_resolve_output(&req, &Outcome::Ineligible(Ineligible::NoImage));
        assert_eq!(lines[1], "    Image: 101");
    }

    #[test]
    fn resolve_fallback_shows_error() {
        let err = std::io::Error::other("disk full");
        let lines = format_resolve_fallback(&request(), &err);
        assert_eq!(lines[0], "/uploads/shoe.jpg");
        assert!(lines[2].contains("disk full"));
    }

    #[test]
    fn warm_summary_line() {
        let stats = WarmStats {
            cached: 2,
            generated: 4,
            ..WarmStats::default()
        };
        assert_eq!(
            format_warm_output(7, &stats),
            vec!["Item 7: 2 cached, 4 generated (6 total)"]
        );
    }

    #[test]
    fn render_lines() {
        let settings = WatermarkSettings {
            position: Position::BottomRight,
            ..WatermarkSettings::default()
        };
        let overlay = Overlay {
            width: 200,
            height: 100,
            x: 590,
            y: 490,
        };
        let lines = format_render_output(
            Path::new("out.jpg"),
            Path::new("shoe.jpg"),
            Dimensions {
                width: 800,
                height: 600,
            },
            Path::new("logo.png"),
            &overlay,
            &settings,
        );
        assert_eq!(
            lines,
            vec![
                "out.jpg",
                "    Source: shoe.jpg (800x600)",
                "    Watermark: logo.png at 590,490 (200x100, bottom_right)",
            ]
        );
    }

    #[test]
    fn check_lines() {
        let config = WatermarkConfig::default();
        let lines = format_check_output(&config, Path::new("/srv/uploads"));
        assert_eq!(lines[0], "Config is valid");
        assert_eq!(lines[1], "    Storage: /uploads → /srv/uploads");
        assert_eq!(lines[2], "    Cache: /uploads/watermark-cache/wm-*");
        assert_eq!(
            lines[3],
            "    Renditions: woocommerce_single, woocommerce_gallery_thumbnail, full"
        );
    }
}
