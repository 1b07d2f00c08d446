//! Artifact store: where watermarked copies live on disk and on the web.
//!
//! The store owns one flat directory under the storage root. It never looks
//! inside the files: naming is pure path arithmetic, and the only I/O is an
//! existence check, lazy directory creation, and the atomic write.
//!
//! ## Naming
//!
//! ```text
//! <dir_name>/<prefix>-<imageId>-<rendition>-<fingerprint>.<ext>
//! watermark-cache/wm-101-woocommerce_single-3f2a…9c.jpg
//! ```
//!
//! The fingerprint already identifies the output, but keeping the image id
//! and rendition in the name makes the directory browsable by humans.
//!
//! ## Writes
//!
//! [`ArtifactStore::persist`] writes to a temporary file in the same
//! directory and then links it into place without overwriting. Readers see
//! either no file or a complete one. When two requests race on the same
//! fingerprint the loser's copy is discarded; both produced identical
//! output, so that is not an error.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::cache::Fingerprint;
use crate::catalog::ImageId;
use crate::storage::StorageRoot;

/// Label used in filenames when a request carries no rendition.
const UNLABELED_RENDITION: &str = "size";

/// Extension used when the source isn't one of the supported formats.
const FALLBACK_EXTENSION: &str = "jpg";

/// A located artifact: filesystem path plus public URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    url: String,
    dir_name: String,
    prefix: String,
}

impl ArtifactStore {
    pub fn new(storage: &StorageRoot, dir_name: &str, prefix: &str) -> Self {
        Self {
            dir: storage.base_dir().join(dir_name),
            url: format!("{}/{}", storage.base_url(), dir_name),
            dir_name: dir_name.to_string(),
            prefix: prefix.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a URL points into this store's namespace.
    pub fn contains_url(&self, url: &str) -> bool {
        is_cache_url(url, &self.dir_name)
    }

    /// Compute where the artifact for these inputs lives.
    pub fn locate(
        &self,
        image_id: ImageId,
        rendition: Option<&str>,
        fingerprint: &Fingerprint,
        extension: &str,
    ) -> Artifact {
        let label = rendition
            .map(sanitize_key)
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| UNLABELED_RENDITION.to_string());
        let filename = format!(
            "{}-{}-{}-{}.{}",
            self.prefix, image_id, label, fingerprint, extension
        );
        Artifact {
            path: self.dir.join(&filename),
            url: format!("{}/{}", self.url, filename),
        }
    }

    pub fn exists(&self, artifact: &Artifact) -> bool {
        artifact.path.is_file()
    }

    /// Create the cache directory if it isn't there yet.
    pub fn ensure_directory(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// Atomically write `bytes` as `artifact`.
    ///
    /// Returns `Ok(false)` if another writer created the file first; the
    /// existing file is left untouched.
    pub fn persist(&self, artifact: &Artifact, bytes: &[u8]) -> io::Result<bool> {
        self.ensure_directory()?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".tmp-")
            .tempfile_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;

        match tmp.persist_noclobber(&artifact.path) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.error),
        }
    }
}

/// Whether `url` contains the `/<dir_name>/` segment that marks artifacts.
pub fn is_cache_url(url: &str, dir_name: &str) -> bool {
    url.contains(&format!("/{dir_name}/"))
}

/// Output extension for a source path: its own extension when it is a
/// supported format (`jpg`, `jpeg`, `png`), otherwise `jpg`.
pub fn output_extension(source: &Path) -> &'static str {
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") => "jpg",
        Some("jpeg") => "jpeg",
        Some("png") => "png",
        _ => FALLBACK_EXTENSION,
    }
}

/// Reduce a label to lowercase `a-z`, `0-9`, `_` and `-`.
pub fn sanitize_key(label: &str) -> String {
    label
        .chars()
        .filter_map(|c| {
            let c = c.to_ascii_lowercase();
            (c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-').then_some(c)
        })
        .collect()
}
