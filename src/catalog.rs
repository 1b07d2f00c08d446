//! Catalog access: which images belong to which item.
//!
//! The catalog is owned by the host (a shop's product store, say). This
//! crate needs two answers from it: the main and gallery images of an
//! item, and the public URL of an image rendition. [`Catalog`] is that
//! seam; [`StaticCatalog`] is a JSON-backed implementation used by the
//! CLI harness and tests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Identifier of an image in the host's media store. `0` never names an image.
pub type ImageId = u64;

/// Identifier of a catalog item (product).
pub type ItemId = u64;

/// The rendition label used to look up an image's original upload.
pub const FULL_RENDITION: &str = "full";

/// An item's images as currently stored: a designated main image plus an
/// ordered gallery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemImages {
    pub main: Option<ImageId>,
    pub gallery: Vec<ImageId>,
}

/// Read access to the host's catalog.
pub trait Catalog: Sync {
    /// The item's main and gallery images, or `None` if the item doesn't exist.
    fn item_images(&self, item: ItemId) -> Option<ItemImages>;

    /// Public URL of one rendition of an image.
    fn image_url(&self, image: ImageId, rendition: &str) -> Option<String>;
}

/// URLs for one image: the original upload plus named renditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageUrls {
    pub full: String,
    pub renditions: HashMap<String, String>,
}

/// An in-memory catalog, typically loaded from JSON:
///
/// ```json
/// {
///   "items":  { "7": { "main": 101, "gallery": [102, 103] } },
///   "images": { "101": { "full": "/uploads/a.jpg",
///                        "renditions": { "woocommerce_single": "/uploads/a-600x600.jpg" } } }
/// }
/// ```
///
/// Renditions without an entry resolve to the image's `full` URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticCatalog {
    pub items: HashMap<ItemId, ItemImages>,
    pub images: HashMap<ImageId, ImageUrls>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_item(mut self, item: ItemId, main: Option<ImageId>, gallery: &[ImageId]) -> Self {
        self.items.insert(
            item,
            ItemImages {
                main,
                gallery: gallery.to_vec(),
            },
        );
        self
    }

    pub fn with_image(mut self, image: ImageId, full_url: impl Into<String>) -> Self {
        self.images.entry(image).or_default().full = full_url.into();
        self
    }

    pub fn with_rendition(
        mut self,
        image: ImageId,
        rendition: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        self.images
            .entry(image)
            .or_default()
            .renditions
            .insert(rendition.into(), url.into());
        self
    }
}

impl Catalog for StaticCatalog {
    fn item_images(&self, item: ItemId) -> Option<ItemImages> {
        self.items.get(&item).cloned()
    }

    fn image_url(&self, image: ImageId, rendition: &str) -> Option<String> {
        let urls = self.images.get(&image)?;
        let url = if rendition == FULL_RENDITION {
            &urls.full
        } else {
            urls.renditions.get(rendition).unwrap_or(&urls.full)
        };
        (!url.is_empty()).then(|| url.clone())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
