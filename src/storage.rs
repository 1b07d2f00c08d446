//! Managed file storage root: a base directory and the public URL it is
//! served under.
//!
//! Every image this crate touches (source photos, the watermark, and the
//! artifacts it writes) lives under this root. URLs that do not start with
//! the base URL are not ours and never resolve to a path.

use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoot {
    base_dir: PathBuf,
    base_url: String,
}

impl StorageRoot {
    pub fn new(base_dir: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            base_dir: base_dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Map a public URL to its file under the base directory.
    ///
    /// Query strings and fragments are ignored. Returns `None` for URLs
    /// outside the base URL and for relative parts that would climb out
    /// of the base directory.
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let url = url.split(['?', '#']).next().unwrap_or_default();
        let rest = url.strip_prefix(&self.base_url)?;
        let relative = rest.strip_prefix('/')?;
        if relative.is_empty() {
            return None;
        }

        let relative = Path::new(relative);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.base_dir.join(relative))
    }

    /// Public URL for a path under the base directory.
    pub fn url_for_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_dir).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Option<_>>()?;
        Some(format!("{}/{}", self.base_url, parts.join("/")))
    }
}
