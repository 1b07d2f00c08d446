//! Eligibility filter: does this image request get a watermark at all?
//!
//! A request is watermarked only when every rule below holds. Rules are
//! checked in order and the first failure short-circuits:
//!
//! | # | Rule | Failure |
//! |---|------|---------|
//! | 1 | Rendering a single item's detail view | [`Ineligible::NotItemDetail`] |
//! | 2 | Source URL is non-empty | [`Ineligible::EmptyUrl`] |
//! | 3 | Source URL is not an artifact already | [`Ineligible::AlreadyWatermarked`] |
//! | 4 | Rendition, if given, is on the allow-list | [`Ineligible::RenditionNotAllowed`] |
//! | 5 | Image id is non-zero | [`Ineligible::NoImage`] |
//! | 6 | Image belongs to *that* item's main or gallery images | [`Ineligible::UnknownItem`], [`Ineligible::NotItemImage`] |
//! | 7 | A watermark image is configured | [`Ineligible::NoWatermark`] |
//!
//! Rule 6 is the one that matters most. The item comes from the request's
//! [`BrowsingContext`], never from ambient "current item" state, so a
//! related-items widget on a detail page can reuse the same rendering path
//! without its images picking up the watermark.

use std::collections::BTreeSet;
use std::fmt;

use crate::catalog::{Catalog, ImageId, ItemId, ItemImages};
use crate::config::WatermarkConfig;
use crate::settings::WatermarkSettings;
use crate::store::is_cache_url;

/// Where the host is rendering the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowsingContext {
    /// The detail page of one catalog item.
    ItemDetail(ItemId),
    /// Category pages, search results, related-item grids.
    Listing,
    /// Administrative screens.
    Admin,
    Other,
}

impl BrowsingContext {
    /// The item whose detail page is being rendered, if any.
    pub fn item(self) -> Option<ItemId> {
        match self {
            BrowsingContext::ItemDetail(item) => Some(item),
            _ => None,
        }
    }
}

/// One image about to be rendered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub image_id: ImageId,
    /// Size/role label; `None` when the host asked for explicit dimensions.
    pub rendition: Option<String>,
    pub context: BrowsingContext,
    /// The URL the host would use if nothing is watermarked.
    pub source_url: String,
}

impl ImageRequest {
    pub fn new(
        image_id: ImageId,
        rendition: Option<&str>,
        context: BrowsingContext,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            image_id,
            rendition: rendition.map(str::to_string),
            context,
            source_url: source_url.into(),
        }
    }
}

/// Why a request passes through untouched. Not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ineligible {
    NotItemDetail,
    EmptyUrl,
    AlreadyWatermarked,
    RenditionNotAllowed(String),
    NoImage,
    UnknownItem(ItemId),
    NotItemImage { image_id: ImageId, item: ItemId },
    NoWatermark,
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligible::NotItemDetail => write!(f, "not an item detail view"),
            Ineligible::EmptyUrl => write!(f, "empty source URL"),
            Ineligible::AlreadyWatermarked => write!(f, "source is already a watermarked artifact"),
            Ineligible::RenditionNotAllowed(r) => write!(f, "rendition '{r}' is not watermarked"),
            Ineligible::NoImage => write!(f, "no image id"),
            Ineligible::UnknownItem(item) => write!(f, "item {item} not found"),
            Ineligible::NotItemImage { image_id, item } => {
                write!(f, "image {image_id} is not an image of item {item}")
            }
            Ineligible::NoWatermark => write!(f, "no watermark image configured"),
        }
    }
}

/// The main image plus gallery images of one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibleImageSet(BTreeSet<ImageId>);

impl EligibleImageSet {
    pub fn from_item(images: &ItemImages) -> Self {
        Self(
            images
                .main
                .into_iter()
                .chain(images.gallery.iter().copied())
                .filter(|&id| id != 0)
                .collect(),
        )
    }

    pub fn contains(&self, image_id: ImageId) -> bool {
        self.0.contains(&image_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = ImageId> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Deployment-level inputs to the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityRules {
    pub allowed_renditions: Vec<String>,
    pub cache_dir_name: String,
}

impl EligibilityRules {
    pub fn from_config(config: &WatermarkConfig) -> Self {
        Self {
            allowed_renditions: config.renditions.allowed.clone(),
            cache_dir_name: config.cache.dir_name.clone(),
        }
    }

    pub fn allows_rendition(&self, rendition: &str) -> bool {
        self.allowed_renditions.iter().any(|r| r == rendition)
    }
}

impl Default for EligibilityRules {
    fn default() -> Self {
        Self::from_config(&WatermarkConfig::default())
    }
}

/// Run the rules in order; `Err` names the first one that failed.
pub fn check(
    request: &ImageRequest,
    settings: &WatermarkSettings,
    rules: &EligibilityRules,
    catalog: &impl Catalog,
) -> Result<(), Ineligible> {
    let item = request.context.item().ok_or(Ineligible::NotItemDetail)?;

    if request.source_url.trim().is_empty() {
        return Err(Ineligible::EmptyUrl);
    }
    if is_cache_url(&request.source_url, &rules.cache_dir_name) {
        return Err(Ineligible::AlreadyWatermarked);
    }
    match &request.rendition {
        Some(rendition) if !rules.allows_rendition(rendition) => {
            return Err(Ineligible::RenditionNotAllowed(rendition.clone()));
        }
        _ => {}
    }
    if request.image_id == 0 {
        return Err(Ineligible::NoImage);
    }

    let images = catalog
        .item_images(item)
        .ok_or(Ineligible::UnknownItem(item))?;
    if !EligibleImageSet::from_item(&images).contains(request.image_id) {
        return Err(Ineligible::NotItemImage {
            image_id: request.image_id,
            item,
        });
    }

    if !settings.has_watermark() {
        return Err(Ineligible::NoWatermark);
    }
    Ok(())
}

pub fn is_eligible(
    request: &ImageRequest,
    settings: &WatermarkSettings,
    rules: &EligibilityRules,
    catalog: &impl Catalog,
) -> bool {
    check(request, settings, rules, catalog).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;

    const SHOE: ItemId = 7;
    const HAT: ItemId = 8;

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_item(SHOE, Some(101), &[102, 103])
            .with_item(HAT, Some(201), &[202])
            .with_item(9, None, &[])
    }

    fn configured() -> WatermarkSettings {
        WatermarkSettings {
            watermark_image_id: 900,
            ..WatermarkSettings::default()
        }
    }

    fn request(image_id: ImageId, rendition: Option<&str>, context: BrowsingContext) -> ImageRequest {
        ImageRequest::new(
            image_id,
            rendition,
            context,
            "https://shop.example/uploads/2024/05/shoe.jpg",
        )
    }

    fn run(req: &ImageRequest) -> Result<(), Ineligible> {
        check(req, &configured(), &EligibilityRules::default(), &catalog())
    }

    // =========================================================================
    // EligibleImageSet
    // =========================================================================

    #[test]
    fn image_set_has_main_and_gallery() {
        let set = EligibleImageSet::from_item(&ItemImages {
            main: Some(1),
            gallery: vec![2, 3, 2, 0],
        });
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(!set.contains(0));
    }

    #[test]
    fn image_set_without_main() {
        let set = EligibleImageSet::from_item(&ItemImages {
            main: None,
            gallery: vec![5],
        });
        assert_eq!(set.len(), 1);
        assert!(set.contains(5));
        assert!(EligibleImageSet::from_item(&ItemImages::default()).is_empty());
    }

    // =========================================================================
    // check: accepted requests
    // =========================================================================

    #[test]
    fn main_and_gallery_images_are_eligible() {
        let ctx = BrowsingContext::ItemDetail(SHOE);
        assert_eq!(run(&request(101, Some("woocommerce_single"), ctx)), Ok(()));
        assert_eq!(
            run(&request(102, Some("woocommerce_gallery_thumbnail"), ctx)),
            Ok(())
        );
        assert_eq!(run(&request(103, Some("full"), ctx)), Ok(()));
    }

    #[test]
    fn missing_rendition_skips_allow_list() {
        assert_eq!(
            run(&request(101, None, BrowsingContext::ItemDetail(SHOE))),
            Ok(())
        );
    }

    // =========================================================================
    // check: each rule
    // =========================================================================

    #[test]
    fn only_item_detail_context() {
        for ctx in [
            BrowsingContext::Listing,
            BrowsingContext::Admin,
            BrowsingContext::Other,
        ] {
            assert_eq!(
                run(&request(101, Some("full"), ctx)),
                Err(Ineligible::NotItemDetail)
            );
        }
    }

    #[test]
    fn empty_url_rejected() {
        let mut req = request(101, Some("full"), BrowsingContext::ItemDetail(SHOE));
        req.source_url = "  ".to_string();
        assert_eq!(run(&req), Err(Ineligible::EmptyUrl));
    }

    #[test]
    fn artifacts_are_not_rewatermarked() {
        let mut req = request(101, Some("full"), BrowsingContext::ItemDetail(SHOE));
        req.source_url =
            "https://shop.example/uploads/watermark-cache/wm-101-full-0123.jpg".to_string();
        assert_eq!(run(&req), Err(Ineligible::AlreadyWatermarked));
    }

    #[test]
    fn other_renditions_pass_through() {
        assert_eq!(
            run(&request(101, Some("thumbnail"), BrowsingContext::ItemDetail(SHOE))),
            Err(Ineligible::RenditionNotAllowed("thumbnail".to_string()))
        );
    }

    #[test]
    fn zero_image_id_rejected() {
        assert_eq!(
            run(&request(0, Some("full"), BrowsingContext::ItemDetail(SHOE))),
            Err(Ineligible::NoImage)
        );
    }

    #[test]
    fn unknown_item_rejected() {
        assert_eq!(
            run(&request(101, Some("full"), BrowsingContext::ItemDetail(404))),
            Err(Ineligible::UnknownItem(404))
        );
    }

    #[test]
    fn other_items_gallery_is_never_watermarked() {
        // 202 is in HAT's gallery, rendered on SHOE's detail page
        assert_eq!(
            run(&request(
                202,
                Some("woocommerce_gallery_thumbnail"),
                BrowsingContext::ItemDetail(SHOE)
            )),
            Err(Ineligible::NotItemImage {
                image_id: 202,
                item: SHOE
            })
        );
        // and the same image is fine on its own page
        assert_eq!(
            run(&request(
                202,
                Some("woocommerce_gallery_thumbnail"),
                BrowsingContext::ItemDetail(HAT)
            )),
            Ok(())
        );
    }

    #[test]
    fn item_without_images() {
        assert_eq!(
            run(&request(101, Some("full"), BrowsingContext::ItemDetail(9))),
            Err(Ineligible::NotItemImage {
                image_id: 101,
                item: 9
            })
        );
    }

    #[test]
    fn unconfigured_watermark_rejected_last() {
        let req = request(101, Some("full"), BrowsingContext::ItemDetail(SHOE));
        let result = check(
            &req,
            &WatermarkSettings::default(),
            &EligibilityRules::default(),
            &catalog(),
        );
        assert_eq!(result, Err(Ineligible::NoWatermark));
        assert!(!is_eligible(
            &req,
            &WatermarkSettings::default(),
            &EligibilityRules::default(),
            &catalog()
        ));
    }

    #[test]
    fn rules_short_circuit_in_order() {
        // Listing context wins over every later failure
        let mut req = request(0, Some("thumbnail"), BrowsingContext::Listing);
        req.source_url = String::new();
        assert_eq!(run(&req), Err(Ineligible::NotItemDetail));

        // Rendition is checked before membership
        let req = request(202, Some("thumbnail"), BrowsingContext::ItemDetail(SHOE));
        assert!(matches!(run(&req), Err(Ineligible::RenditionNotAllowed(_))));
    }

    #[test]
    fn custom_rules() {
        let rules = EligibilityRules {
            allowed_renditions: vec!["large".to_string()],
            cache_dir_name: "wm".to_string(),
        };
        let req = request(101, Some("large"), BrowsingContext::ItemDetail(SHOE));
        assert_eq!(check(&req, &configured(), &rules, &catalog()), Ok(()));
        let req = request(101, Some("full"), BrowsingContext::ItemDetail(SHOE));
        assert!(check(&req, &configured(), &rules, &catalog()).is_err());
    }

    #[test]
    fn reasons_display() {
        assert_eq!(
            Ineligible::NotItemImage {
                image_id: 3,
                item: 4
            }
            .to_string(),
            "image 3 is not an image of item 4"
        );
    }
}
