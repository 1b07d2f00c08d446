//! Cache keys for watermarked artifacts.
//!
//! Compositing is the expensive step of serving a watermarked photo: a full
//! decode, resample, blend, and re-encode. This module derives the key that
//! lets every later request for the same inputs skip that work.
//!
//! # Design
//!
//! The cache is **content-addressed by inputs**: the key is a digest of
//! everything that can change the output pixels, and the key is part of the
//! artifact's filename. There is no manifest and no invalidation step. A
//! changed input yields a different key, so a different file, and the old
//! artifact is simply never asked for again.
//!
//! ## Key inputs
//!
//! In order:
//!
//! 1. source image path
//! 2. watermark image path
//! 3. position
//! 4. size mode
//! 5. custom width (px)
//! 6. max width (%)
//! 7. source image modification time
//! 8. watermark image modification time
//!
//! Modification times stand in for file contents. Replacing either photo
//! or the configured watermark bumps its mtime and so invalidates every
//! derivative, without hashing megabytes of image data per request.
//!
//! The digest is SHA-256 truncated to 128 bits: collision resistance is what
//! matters here, not secrecy.

use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::settings::WatermarkSettings;

/// Bytes of the SHA-256 digest kept in a fingerprint.
const FINGERPRINT_BYTES: usize = 16;

/// Version tag mixed into every key. Bump it to orphan all existing
/// artifacts when the compositing algorithm changes.
const KEY_VERSION: &[u8] = b"watermark-v1";

/// Deterministic 128-bit identity of one (source, watermark, settings,
/// file-state) combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_BYTES]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_BYTES] {
        &self.0
    }
}

/// Lowercase hex, 32 characters.
impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Modification time of a file as (seconds, nanoseconds) since the epoch.
///
/// Times before the epoch collapse to zero; they still hash deterministically.
pub fn modified_time(path: &Path) -> io::Result<(u64, u32)> {
    let modified = std::fs::metadata(path)?.modified()?;
    let since = modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Ok((since.as_secs(), since.subsec_nanos()))
}

/// Derive the fingerprint for watermarking `source` with `watermark`.
///
/// Fails only if either file's metadata cannot be read.
pub fn derive_key(
    source: &Path,
    watermark: &Path,
    settings: &WatermarkSettings,
) -> io::Result<Fingerprint> {
    let source_mtime = modified_time(source)?;
    let watermark_mtime = modified_time(watermark)?;
    Ok(key_from_parts(
        source,
        watermark,
        settings,
        source_mtime,
        watermark_mtime,
    ))
}

/// Hash already-gathered key inputs. Pure; [`derive_key`] adds the
/// filesystem reads.
pub fn key_from_parts(
    source: &Path,
    watermark: &Path,
    settings: &WatermarkSettings,
    source_mtime: (u64, u32),
    watermark_mtime: (u64, u32),
) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(KEY_VERSION);
    hasher.update(b"\0");
    // Strings are length-prefixed so field boundaries can't shift.
    for part in [
        source.to_string_lossy().as_bytes(),
        watermark.to_string_lossy().as_bytes(),
        settings.position.as_str().as_bytes(),
        settings.size_mode.as_str().as_bytes(),
    ] {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.update(settings.custom_width_px.to_le_bytes());
    hasher.update(settings.max_width_pct.to_le_bytes());
    hasher.update(source_mtime.0.to_le_bytes());
    hasher.update(source_mtime.1.to_le_bytes());
    hasher.update(watermark_mtime.0.to_le_bytes());
    hasher.update(watermark_mtime.1.to_le_bytes());

    let digest = hasher.finalize();
    let mut bytes = [0u8; FINGERPRINT_BYTES];
    bytes.copy_from_slice(&digest[..FINGERPRINT_BYTES]);
    Fingerprint(bytes)
}

/// Set a file's modification time. Used to simulate file replacement.
pub fn set_modified_time(path: &Path, time: SystemTime) -> io::Result<()> {
    std::fs::File::options()
        .write(true)
        .open(path)?
        .set_modified(time)
}
