//! Host configuration module.
//!
//! Describes where the managed file storage lives, where watermarked
//! artifacts go, and which renditions are eligible. Loaded from an optional
//! `config.toml` whose values override stock defaults.
//!
//! This is deployment configuration, not the administrator's watermark
//! settings. Those come from the host's settings store on every request
//! (see [`crate::settings`]).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! base_dir = "uploads"          # Filesystem root of managed media
//! base_url = "/uploads"         # Public URL that maps onto base_dir
//!
//! [cache]
//! dir_name = "watermark-cache"  # Artifact subdirectory under base_dir
//! prefix = "wm"                 # Artifact filename prefix
//!
//! [renditions]
//! allowed = ["woocommerce_single", "woocommerce_gallery_thumbnail", "full"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::store::sanitize_key;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Watermark host configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    /// Managed storage root (filesystem directory + public URL).
    pub storage: StorageConfig,
    /// Artifact cache location and naming.
    pub cache: CacheConfig,
    /// Rendition allow-list.
    pub renditions: RenditionsConfig,
}

impl WatermarkConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.base_url must not be empty".into(),
            ));
        }
        let dir = &self.cache.dir_name;
        if dir.is_empty() || dir.contains(['/', '\\']) || dir == "." || dir == ".." {
            return Err(ConfigError::Validation(
                "cache.dir_name must be a single directory name".into(),
            ));
        }
        if self.cache.prefix.is_empty() || sanitize_key(&self.cache.prefix) != self.cache.prefix {
            return Err(ConfigError::Validation(
                "cache.prefix must be non-empty and contain only a-z, 0-9, '_' or '-'".into(),
            ));
        }
        Ok(())
    }

    /// Resolve `storage.base_dir` against the directory the config was loaded
    /// from, leaving absolute paths untouched.
    pub fn base_dir_from(&self, config_dir: &Path) -> PathBuf {
        let base = Path::new(&self.storage.base_dir);
        if base.is_absolute() {
            base.to_path_buf()
        } else {
            config_dir.join(base)
        }
    }
}

/// Managed storage root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Filesystem directory holding source images, the watermark, and the cache.
    pub base_dir: String,
    /// Public URL prefix that corresponds to `base_dir`.
    pub base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: "uploads".to_string(),
            base_url: "/uploads".to_string(),
        }
    }
}

/// Artifact cache location and naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Subdirectory of the storage root; also the URL namespace marker
    /// that keeps artifacts from being watermarked twice.
    pub dir_name: String,
    /// Fixed filename prefix for artifacts.
    pub prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir_name: "watermark-cache".to_string(),
            prefix: "wm".to_string(),
        }
    }
}

/// Renditions that represent an item's primary photo display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenditionsConfig {
    pub allowed: Vec<String>,
}

impl Default for RenditionsConfig {
    fn default() -> Self {
        Self {
            allowed: vec![
                "woocommerce_single".to_string(),
                "woocommerce_gallery_thumbnail".to_string(),
                "full".to_string(),
            ],
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(WatermarkConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<WatermarkConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: WatermarkConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<WatermarkConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Product Watermark Configuration
# ===============================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.
#
# Watermark image, position and size are NOT configured here: they are
# read from the host's settings store on every request.

# ---------------------------------------------------------------------------
# Managed storage
# ---------------------------------------------------------------------------
[storage]
# Directory holding uploaded media. Relative paths are resolved against
# the directory containing this file.
base_dir = "uploads"

# Public URL that maps onto base_dir. Image URLs outside this prefix are
# never watermarked.
base_url = "/uploads"

# ---------------------------------------------------------------------------
# Artifact cache
# ---------------------------------------------------------------------------
[cache]
# Subdirectory of base_dir where watermarked copies are written.
# URLs containing "/<dir_name>/" are treated as already watermarked.
dir_name = "watermark-cache"

# Filename prefix: <prefix>-<imageId>-<rendition>-<fingerprint>.<ext>
prefix = "wm"

# ---------------------------------------------------------------------------
# Renditions
# ---------------------------------------------------------------------------
[renditions]
# Rendition labels that show the item's own photos. Anything else
# (related-item grids, cart thumbnails) passes through untouched.
allowed = ["woocommerce_single", "woocommerce_gallery_thumbnail", "full"]
"##
}
