//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with content sniffing |
//! | **Size + place** | pure arithmetic in `calculations` |
//! | **Composite** | `resize_exact` (Triangle) + `imageops::overlay` |
//! | **Encode** | JPEG at quality 90, or lossless PNG |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for watermark size and offset (unit testable)
//! - **Parameters**: Data structures describing a render
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Pixel work on decoded images, combining calculations + blending

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    MARGIN_PX, MIN_WATERMARK_WIDTH, SMALL_IMAGE_WIDTH, calculate_placement,
    calculate_watermark_size,
};
pub use operations::{composite, plan_overlay};
pub use params::{OutputFormat, Overlay, Quality, WatermarkParams};
pub use rust_backend::RustBackend;
