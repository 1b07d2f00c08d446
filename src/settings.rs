//! Watermark settings: the five values an administrator configures.
//!
//! Settings live in an external key-value store owned by the host (its
//! admin page writes them, this crate only reads them). They are read
//! fresh on every request through the [`SettingsStore`] trait and
//! normalized by [`resolve`].
//!
//! ## Keys and defaults
//!
//! | Key | Domain | Default |
//! |---|---|---|
//! | `watermark_image_id` | image id, `0` = unset | `0` |
//! | `position` | `center`, `top_left`, `top_right`, `bottom_left`, `bottom_right` | `center` |
//! | `size_mode` | `default`, `custom` | `default` |
//! | `custom_width_px` | `> 0` | `150` |
//! | `max_width_pct` | `1..=100` | `40` |
//!
//! Resolution is total: a missing, mistyped, or out-of-range value is
//! replaced by its default, never reported as an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::catalog::ImageId;

pub const DEFAULT_CUSTOM_WIDTH_PX: u32 = 150;
pub const DEFAULT_MAX_WIDTH_PCT: u32 = 40;

/// Where the watermark is anchored on the photo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::Center,
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::Center => "center",
            Position::TopLeft => "top_left",
            Position::TopRight => "top_right",
            Position::BottomLeft => "bottom_left",
            Position::BottomRight => "bottom_right",
        }
    }
}

impl FromStr for Position {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the base watermark width is chosen.
///
/// - `Default`: the watermark image's own pixel width
/// - `Custom`: [`WatermarkSettings::custom_width_px`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeMode {
    #[default]
    Default,
    Custom,
}

impl SizeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SizeMode::Default => "default",
            SizeMode::Custom => "custom",
        }
    }
}

impl FromStr for SizeMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(SizeMode::Default),
            "custom" => Ok(SizeMode::Custom),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized settings. Every field is inside its valid domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatermarkSettings {
    pub watermark_image_id: ImageId,
    pub position: Position,
    pub size_mode: SizeMode,
    pub custom_width_px: u32,
    pub max_width_pct: u32,
}

impl WatermarkSettings {
    /// Whether an administrator has picked a watermark image.
    pub fn has_watermark(&self) -> bool {
        self.watermark_image_id != 0
    }
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            watermark_image_id: 0,
            position: Position::default(),
            size_mode: SizeMode::default(),
            custom_width_px: DEFAULT_CUSTOM_WIDTH_PX,
            max_width_pct: DEFAULT_MAX_WIDTH_PCT,
        }
    }
}

/// A loosely typed value as found in an options table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Int(i64),
    Text(String),
    /// Floats, booleans, out-of-range integers and anything else. Always
    /// resolves to the field's default.
    Other(serde_json::Value),
}

impl RawValue {
    fn as_int(&self) -> Option<i64> {
        match self {
            RawValue::Int(n) => Some(*n),
            RawValue::Text(s) => s.trim().parse().ok(),
            RawValue::Other(_) => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s.trim()),
            RawValue::Int(_) | RawValue::Other(_) => None,
        }
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Int(n)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

/// Settings exactly as stored, before validation. Absent keys are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub watermark_image_id: Option<RawValue>,
    pub position: Option<RawValue>,
    pub size_mode: Option<RawValue>,
    pub custom_width_px: Option<RawValue>,
    pub max_width_pct: Option<RawValue>,
}

/// Normalize raw settings into their valid domains.
pub fn resolve(raw: &RawSettings) -> WatermarkSettings {
    fn int(v: &Option<RawValue>) -> Option<i64> {
        v.as_ref().and_then(RawValue::as_int)
    }
    fn text(v: &Option<RawValue>) -> Option<&str> {
        v.as_ref().and_then(RawValue::as_text)
    }

    let watermark_image_id = int(&raw.watermark_image_id)
        .and_then(|n| ImageId::try_from(n).ok())
        .unwrap_or(0);

    let position = text(&raw.position)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();

    let size_mode = text(&raw.size_mode)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();

    let custom_width_px = int(&raw.custom_width_px)
        .filter(|&n| n > 0)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(DEFAULT_CUSTOM_WIDTH_PX);

    let max_width_pct = int(&raw.max_width_pct)
        .filter(|&n| n > 0 && n <= 100)
        .map(|n| n as u32)
        .unwrap_or(DEFAULT_MAX_WIDTH_PCT);

    WatermarkSettings {
        watermark_image_id,
        position,
        size_mode,
        custom_width_px,
        max_width_pct,
    }
}

/// Read access to the host's settings storage.
pub trait SettingsStore: Sync {
    fn raw_settings(&self) -> RawSettings;

    /// Read and normalize in one step.
    fn settings(&self) -> WatermarkSettings {
        resolve(&self.raw_settings())
    }
}

impl SettingsStore for RawSettings {
    fn raw_settings(&self) -> RawSettings {
        self.clone()
    }
}

/// Settings kept in a JSON object keyed by the setting names.
///
/// The file is re-read on every call so edits take effect on the next
/// request. A missing or unparsable file reads as "nothing configured".
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn raw_settings(&self) -> RawSettings {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "settings file unreadable, using defaults");
                return RawSettings::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::debug!(path = %self.path.display(), error = %e, "settings file invalid, using defaults");
            RawSettings::default()
        })
    }
}
