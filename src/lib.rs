//! # Product Watermark
//!
//! On-demand visible watermarking of catalog product photos. When a shop
//! renders one of an item's own photos on that item's detail page, the photo
//! is swapped for a copy with the shop's watermark blended in. The copy is
//! made on first request and cached on disk; every later request is a file
//! existence check.
//!
//! # Architecture: One Request, Five Steps
//!
//! ```text
//! 1. Settings     settings store  →  WatermarkSettings   (normalized, never fails)
//! 2. Eligibility  request + item  →  yes / reason why not
//! 3. Key          paths + mtimes  →  Fingerprint         (SHA-256, 128 bits)
//! 4. Store        fingerprint     →  path + URL          (exists? done)
//! 5. Composite    source + mark   →  artifact bytes      (then atomic write)
//! ```
//!
//! Each step is a separate module with its own tests. The host integration
//! is two traits: [`settings::SettingsStore`] and [`catalog::Catalog`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`settings`] | Watermark settings: raw values from the host, normalized into their valid domains |
//! | [`catalog`] | Host catalog seam: an item's main and gallery images, image URLs by rendition |
//! | [`eligibility`] | Decides whether a request is watermarked; the rules and their order |
//! | [`cache`] | Derives the fingerprint that names an artifact |
//! | [`storage`] | Maps public URLs under the storage root to files and back |
//! | [`store`] | Artifact naming, existence checks, lazy directory, atomic no-clobber writes |
//! | [`imaging`] | Watermark sizing, placement, compositing, decode/encode |
//! | [`watermark`] | The orchestrator: [`watermark::Watermarker`] wires the above together |
//! | [`config`] | `config.toml` loading, merging onto stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Content-Addressed Cache, No Invalidation
//!
//! An artifact's filename contains a digest of every input that can change
//! its pixels, including both files' modification times. Changing the
//! watermark, moving it, or replacing a photo produces new names; old
//! artifacts are never consulted again. There is nothing to invalidate and
//! no manifest to keep consistent. The cost is that stale artifacts stay on
//! disk until something outside this crate cleans them up.
//!
//! ## Explicit Item Context
//!
//! Eligibility takes the item being viewed as part of the request
//! ([`eligibility::BrowsingContext::ItemDetail`]) rather than consulting
//! any "current item" state. An image is watermarked only if it is that
//! item's main or gallery image, so related-item widgets on the same page
//! are untouched.
//!
//! ## Failures Fall Back to the Original
//!
//! Every error after eligibility (unresolvable path, corrupt image, full
//! disk) is logged and the host renders the original URL. Users never see
//! a broken image because of watermarking. Failures are not cached, so a
//! fixed file starts working on the next request.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling, blending and encoding all use the `image` crate.
//! No ImageMagick, no system libraries; the binary is self-contained.
//!
//! ## Backend Trait for Tests
//!
//! Pixel work sits behind [`imaging::ImageBackend`]. The orchestrator's
//! tests swap in a recording mock to assert that a cache hit does no image
//! work at all.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod eligibility;
pub mod imaging;
pub mod output;
pub mod settings;
pub mod storage;
pub mod store;
pub mod watermark;

#[cfg(test)]
pub(crate) mod test_helpers;
