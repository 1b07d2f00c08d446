//! Shared test utilities for the product-watermark test suite.
//!
//! Provides image fixture writers and a ready-made storage layout so unit
//! tests can exercise the full request path against real files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fx = Fixture::new();
//! let photo = fx.add_jpeg("2024/05/shoe.jpg", 800, 600);
//! let logo = fx.add_png("logo.png", 200, 100, Rgba([255, 0, 0, 200]));
//! assert!(fx.root.path_for_url(&photo).is_some());
//! ```

use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::storage::StorageRoot;

/// Public URL every fixture storage root is served under.
pub const FIXTURE_BASE_URL: &str = "https://shop.example/uploads";

// =========================================================================
// Image writers
// =========================================================================

/// Write a gradient JPEG with the given dimensions.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a single-color RGBA PNG with the given dimensions.
pub fn write_test_png(path: &Path, width: u32, height: u32, color: Rgba<u8>) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    RgbaImage::from_pixel(width, height, color)
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

// =========================================================================
// Storage fixture
// =========================================================================

/// A temporary uploads directory with a matching [`StorageRoot`].
pub struct Fixture {
    pub tmp: TempDir,
    pub root: StorageRoot,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = StorageRoot::new(tmp.path(), FIXTURE_BASE_URL);
        Self { tmp, root }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.tmp.path().join(relative)
    }

    pub fn url(&self, relative: &str) -> String {
        format!("{FIXTURE_BASE_URL}/{relative}")
    }

    /// Write a JPEG under the uploads directory and return its URL.
    pub fn add_jpeg(&self, relative: &str, width: u32, height: u32) -> String {
        write_test_jpeg(&self.path(relative), width, height);
        self.url(relative)
    }

    /// Write a PNG under the uploads directory and return its URL.
    pub fn add_png(&self, relative: &str, width: u32, height: u32, color: Rgba<u8>) -> String {
        write_test_png(&self.path(relative), width, height, color);
        self.url(relative)
    }

    /// Names of everything in a directory under the uploads root, sorted.
    pub fn list(&self, relative: &str) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.path(relative)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
