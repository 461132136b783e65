//! The persisted image manifest and the entities inside it.
//!
//! These types are the only contract between the build pipeline
//! ([`process`](crate::process)) and everything that runs at serve time
//! ([`reader`](crate::reader), [`sources`](crate::sources),
//! [`viewer`](crate::viewer)). They serialize to camelCase JSON:
//!
//! ```json
//! {
//!   "generatedAt": "2026-10-17T09:12:44.120Z",
//!   "widths": [480, 640, 768],
//!   "collections": {
//!     "linee-di-ombra": {
//!       "slug": "linee-di-ombra",
//!       "title": "Linee di Ombra",
//!       "description": null,
//!       "order": 1,
//!       "images": [ { "slug": "alba", "variants": [ ... ], ... } ]
//!     }
//!   }
//! }
//! ```
//!
//! Collections are kept in a [`BTreeMap`] so that two runs over the same
//! content serialize byte-for-byte identically (apart from `generatedAt`).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One resized/re-encoded rendition of a source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageVariant {
    pub width: u32,
    pub height: u32,
    /// Encoded size in bytes.
    pub bytes: u64,
    pub aspect_ratio: f64,
    /// Public location of the rendition, e.g. `/i/linee-di-ombra/w-960/alba.jpg`.
    pub src: String,
}

impl ImageVariant {
    /// Build a variant, deriving the aspect ratio from the dimensions.
    pub fn new(width: u32, height: u32, bytes: u64, src: String) -> Self {
        Self {
            width,
            height,
            bytes,
            aspect_ratio: aspect_ratio(width, height),
            src,
        }
    }
}

/// `width / height`, or the width itself when the height is zero.
pub fn aspect_ratio(width: u32, height: u32) -> f64 {
    if height > 0 {
        width as f64 / height as f64
    } else {
        width as f64
    }
}

/// One logical photograph inside a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntry {
    /// Unique within the owning collection.
    pub slug: String,
    pub document_id: String,
    pub document_uid: Option<String>,
    /// Explicit CMS order, or the position in the collection's reference list.
    pub order: f64,
    pub caption: Option<String>,
    pub credits: Option<String>,
    pub alt: Option<String>,
    /// SHA-256 of the original bytes, hex encoded.
    pub hash: String,
    /// Never empty; widths strictly ascending.
    pub variants: Vec<ImageVariant>,
}

impl ImageEntry {
    pub fn smallest_variant(&self) -> Option<&ImageVariant> {
        self.variants.first()
    }

    pub fn largest_variant(&self) -> Option<&ImageVariant> {
        self.variants.last()
    }
}

/// A named, ordered group of images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEntry {
    pub slug: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<f64>,
    pub images: Vec<ImageEntry>,
}

impl CollectionEntry {
    /// Position of an image by slug.
    pub fn position(&self, image_slug: &str) -> Option<usize> {
        self.images.iter().position(|image| image.slug == image_slug)
    }
}

/// Root aggregate persisted between build time and serve time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    pub generated_at: Option<String>,
    /// Every width the pipeline was configured to attempt, ascending.
    pub widths: Vec<u32>,
    pub collections: BTreeMap<String, CollectionEntry>,
}

impl ImageManifest {
    pub fn image_count(&self) -> usize {
        self.collections.values().map(|c| c.images.len()).sum()
    }

    pub fn variant_count(&self) -> usize {
        self.collections
            .values()
            .flat_map(|c| &c.images)
            .map(|i| i.variants.len())
            .sum()
    }
}

/// Image ordering: `order` ascending, then slug.
pub fn compare_images(a: &ImageEntry, b: &ImageEntry) -> Ordering {
    a.order
        .total_cmp(&b.order)
        .then_with(|| a.slug.cmp(&b.slug))
}

/// Collection ordering: explicit `order` first (ascending), unordered last, then slug.
pub fn compare_collections(a: &CollectionEntry, b: &CollectionEntry) -> Ordering {
    let order_a = a.order.unwrap_or(f64::INFINITY);
    let order_b = b.order.unwrap_or(f64::INFINITY);
    order_a
        .total_cmp(&order_b)
        .then_with(|| a.slug.cmp(&b.slug))
}
