//! The request path: from "the host is about to render this image" to
//! "use this URL instead".
//!
//! [`Watermarker`] ties the other modules together:
//!
//! ```text
//! ImageRequest ─► eligibility::check ──✗──► Outcome::Ineligible
//!                        │ ✓
//!                        ▼
//!          storage: URL → path (source, watermark)
//!                        ▼
//!          cache::derive_key ─► store::locate
//!                        │
//!             exists? ───┴─── yes ──► Outcome::Cached
//!                        │ no
//!          per-fingerprint lock, re-check
//!                        ▼
//!          backend.render ─► store.persist ─► Outcome::Generated
//! ```
//!
//! ## Failure policy
//!
//! [`Watermarker::process`] reports failures as [`WatermarkError`]. The
//! host-facing entry points ([`Watermarker::watermarked_url`] and
//! [`Watermarker::filter_url`]) log them and fall back to the original URL,
//! so a failure never shows up as a broken image. Nothing is remembered
//! about failures: the next request for the same inputs tries again.
//!
//! ## Concurrency
//!
//! Any number of requests may run at once. Requests for the same
//! fingerprint serialize on a lock held only while generating; the second
//! one in finds the artifact on disk and returns it. Correctness does not
//! depend on the lock: artifacts are written atomically and never
//! overwritten.

use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{Fingerprint, derive_key};
use crate::catalog::{Catalog, FULL_RENDITION, ImageId, ItemId};
use crate::config::WatermarkConfig;
use crate::eligibility::{
    BrowsingContext, EligibilityRules, EligibleImageSet, ImageRequest, Ineligible, check,
};
use crate::imaging::{ImageBackend, OutputFormat, Quality, RustBackend, WatermarkParams};
use crate::settings::{SettingsStore, WatermarkSettings};
use crate::storage::StorageRoot;
use crate::store::{Artifact, ArtifactStore, output_extension};

#[derive(Error, Debug)]
pub enum WatermarkError {
    #[error("Path resolution failed: {0}")]
    PathResolution(String),
    #[error("Imaging error: {0}")]
    Imaging(#[from] crate::imaging::BackendError),
    #[error("Cannot write artifact: {0}")]
    Write(#[source] io::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// What happened to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not watermarked; the host keeps its URL.
    Ineligible(Ineligible),
    /// The artifact already existed.
    Cached(Artifact),
    /// The artifact was rendered and written by this request.
    Generated(Artifact),
}

impl Outcome {
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Outcome::Ineligible(_) => None,
            Outcome::Cached(a) | Outcome::Generated(a) => Some(a),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.artifact().map(|a| a.url.as_str())
    }
}

/// Summary of a per-item warm-up.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WarmStats {
    pub cached: u32,
    pub generated: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl WarmStats {
    pub fn total(&self) -> u32 {
        self.cached + self.generated + self.skipped + self.failed
    }

    fn record(mut self, result: &Result<Outcome, WatermarkError>) -> Self {
        match result {
            Ok(Outcome::Cached(_)) => self.cached += 1,
            Ok(Outcome::Generated(_)) => self.generated += 1,
            Ok(Outcome::Ineligible(_)) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
        self
    }

    fn merge(self, other: Self) -> Self {
        Self {
            cached: self.cached + other.cached,
            generated: self.generated + other.generated,
            skipped: self.skipped + other.skipped,
            failed: self.failed + other.failed,
        }
    }
}

impl fmt::Display for WarmStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cached, {} generated", self.cached, self.generated)?;
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        write!(f, " ({} total)", self.total())
    }
}

/// The orchestrator. One instance serves every request for a storage root.
pub struct Watermarker<B: ImageBackend = RustBackend> {
    storage: StorageRoot,
    store: ArtifactStore,
    rules: EligibilityRules,
    quality: Quality,
    backend: B,
    in_flight: Mutex<HashMap<Fingerprint, Arc<Mutex<()>>>>,
}

impl Watermarker<RustBackend> {
    pub fn new(config: &WatermarkConfig, base_dir: impl Into<PathBuf>) -> Self {
        Self::with_backend(config, base_dir, RustBackend::new())
    }
}

impl<B: ImageBackend> Watermarker<B> {
    /// Build with a specific backend (allows testing with mock).
    pub fn with_backend(
        config: &WatermarkConfig,
        base_dir: impl Into<PathBuf>,
        backend: B,
    ) -> Self {
        let storage = StorageRoot::new(base_dir, &config.storage.base_url);
        let store = ArtifactStore::new(&storage, &config.cache.dir_name, &config.cache.prefix);
        Self {
            storage,
            store,
            rules: EligibilityRules::from_config(config),
            quality: Quality::default(),
            backend,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn storage(&self) -> &StorageRoot {
        &self.storage
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn rules(&self) -> &EligibilityRules {
        &self.rules
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one request through the full pipeline.
    pub fn process(
        &self,
        request: &ImageRequest,
        settings: &WatermarkSettings,
        catalog: &impl Catalog,
    ) -> Result<Outcome, WatermarkError> {
        if let Err(reason) = check(request, settings, &self.rules, catalog) {
            debug!(image_id = request.image_id, %reason, "not watermarking");
            return Ok(Outcome::Ineligible(reason));
        }

        let watermark_url = catalog
            .image_url(settings.watermark_image_id, FULL_RENDITION)
            .ok_or_else(|| {
                WatermarkError::PathResolution(format!(
                    "watermark image {} has no URL",
                    settings.watermark_image_id
                ))
            })?;
        let source = self.resolve_file(&request.source_url)?;
        let watermark = self.resolve_file(&watermark_url)?;

        let fingerprint = derive_key(&source, &watermark, settings)?;
        let ext = output_extension(&source);
        let rendition = request.rendition.as_deref();
        let artifact = self
            .store
            .locate(request.image_id, rendition, &fingerprint, ext);

        if self.store.exists(&artifact) {
            debug!(image_id = request.image_id, %fingerprint, "cache hit");
            return Ok(Outcome::Cached(artifact));
        }

        let params = WatermarkParams {
            source,
            watermark,
            settings: *settings,
            format: OutputFormat::from_extension(ext),
            quality: self.quality,
        };
        let lock = self.acquire(&fingerprint);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.generate(request.image_id, &fingerprint, artifact, &params)
        };
        self.release(&fingerprint, lock);
        result
    }

    /// The artifact URL for a request, or `None` if the original should
    /// be used. Settings are read from the store on every call; failures
    /// are logged and swallowed.
    pub fn watermarked_url(
        &self,
        request: &ImageRequest,
        settings: &impl SettingsStore,
        catalog: &impl Catalog,
    ) -> Option<String> {
        match self.process(request, &settings.settings(), catalog) {
            Ok(outcome) => outcome.url().map(str::to_string),
            Err(e) => {
                warn!(
                    image_id = request.image_id,
                    url = %request.source_url,
                    error = %e,
                    "watermarking failed, serving original"
                );
                None
            }
        }
    }

    /// Interception-point form: always returns a URL to render, the
    /// artifact's or the request's own.
    pub fn filter_url(
        &self,
        request: &ImageRequest,
        settings: &impl SettingsStore,
        catalog: &impl Catalog,
    ) -> String {
        self.watermarked_url(request, settings, catalog)
            .unwrap_or_else(|| request.source_url.clone())
    }

    /// Generate artifacts for every image of one item, for each rendition,
    /// in parallel. An empty `renditions` slice means every allowed one.
    pub fn warm_item(
        &self,
        item: ItemId,
        renditions: &[String],
        settings: &impl SettingsStore,
        catalog: &impl Catalog,
    ) -> WarmStats {
        let Some(images) = catalog.item_images(item) else {
            warn!(item, "cannot warm unknown item");
            return WarmStats::default();
        };
        let settings = settings.settings();
        let renditions = if renditions.is_empty() {
            &self.rules.allowed_renditions[..]
        } else {
            renditions
        };

        let jobs: Vec<(ImageId, &str)> = EligibleImageSet::from_item(&images)
            .iter()
            .flat_map(move |id| renditions.iter().map(move |r| (id, r.as_str())))
            .collect();

        let stats = jobs
            .par_iter()
            .map(|&(image_id, rendition)| {
                let Some(url) = catalog.image_url(image_id, rendition) else {
                    debug!(image_id, rendition, "no URL for rendition, skipping");
                    return WarmStats {
                        skipped: 1,
                        ..WarmStats::default()
                    };
                };
                let request = ImageRequest::new(
                    image_id,
                    Some(rendition),
                    BrowsingContext::ItemDetail(item),
                    url,
                );
                let result = self.process(&request, &settings, catalog);
                if let Err(e) = &result {
                    warn!(image_id, rendition, error = %e, "warm-up render failed");
                }
                WarmStats::default().record(&result)
            })
            .reduce(WarmStats::default, WarmStats::merge);

        info!(item, %stats, "warmed item");
        stats
    }

    fn resolve_file(&self, url: &str) -> Result<PathBuf, WatermarkError> {
        let path = self.storage.path_for_url(url).ok_or_else(|| {
            WatermarkError::PathResolution(format!("{url} is outside managed storage"))
        })?;
        if !path.is_file() {
            return Err(WatermarkError::PathResolution(format!(
                "{} does not exist",
                path.display()
            )));
        }
        Ok(path)
    }

    fn generate(
        &self,
        image_id: ImageId,
        fingerprint: &Fingerprint,
        artifact: Artifact,
        params: &WatermarkParams,
    ) -> Result<Outcome, WatermarkError> {
        // Someone holding the lock before us may have finished it.
        if self.store.exists(&artifact) {
            debug!(image_id, %fingerprint, "cache hit after wait");
            return Ok(Outcome::Cached(artifact));
        }

        self.store.ensure_directory().map_err(WatermarkError::Write)?;
        let bytes = self.backend.render(params)?;

        if self
            .store
            .persist(&artifact, &bytes)
            .map_err(WatermarkError::Write)?
        {
            debug!(image_id, %fingerprint, bytes = bytes.len(), "generated");
            Ok(Outcome::Generated(artifact))
        } else {
            debug!(image_id, %fingerprint, "lost write race, keeping existing artifact");
            Ok(Outcome::Cached(artifact))
        }
    }

    fn acquire(&self, fingerprint: &Fingerprint) -> Arc<Mutex<()>> {
        let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(fingerprint.clone()).or_default())
    }

    fn release(&self, fingerprint: &Fingerprint, lock: Arc<Mutex<()>>) {
        let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map plus ours: nobody else is waiting.
        if Arc::strong_count(&lock) <= 2 {
            map.remove(fingerprint);
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
