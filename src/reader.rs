//! Loading the persisted manifest at serve time.
//!
//! The manifest on disk is untrusted: it may be hand-edited or written by an
//! older build. [`normalize_manifest`] accepts any JSON value and produces a
//! consistent [`ImageManifest`]:
//!
//! | Field | Rule |
//! |---|---|
//! | `generatedAt` | non-empty string, else absent |
//! | `widths` | numeric values (numbers or numeric strings), positive, rounded, ascending, unique |
//! | collection `slug` | non-empty string, else the map key |
//! | image `slug` | non-empty string, else `image-<position+1>`; repeats get `-2`, `-3`, … in list order |
//! | image `documentId` | non-empty string, else the image slug |
//! | image `order` | numeric, else the position in the list |
//! | image `hash` | non-empty string, else `""` |
//! | variant `width`/`height`/`src` | required; the variant is dropped otherwise |
//! | variant `bytes` | numeric, else 0 |
//! | variant `aspectRatio` | positive number, else `width / height` |
//!
//! Optional strings are trimmed and empty strings become `None`. Images left
//! with no variants are dropped. Only a JSON syntax error is an error.
//!
//! [`ManifestStore`] holds one normalized snapshot behind an [`Arc`] and
//! returns owned copies from every accessor, so callers can never observe or
//! cause mutation of the shared state.

use crate::content::documents::to_numeric;
use crate::naming::SlugRegistry;
use crate::types::{
    CollectionEntry, ImageEntry, ImageManifest, ImageVariant, aspect_ratio, compare_collections,
    compare_images,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Manifest is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

fn optional_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn numeric(value: Option<&Value>) -> Option<f64> {
    value.and_then(to_numeric)
}

fn pixels(value: Option<&Value>) -> Option<u32> {
    numeric(value)
        .map(f64::round)
        .filter(|&f| f >= 1.0 && f <= u32::MAX as f64)
        .map(|f| f as u32)
}

/// Normalize an arbitrary JSON value into a manifest.
pub fn normalize_manifest(value: &Value) -> ImageManifest {
    let generated_at = optional_string(value.get("generatedAt"));

    let mut widths: Vec<u32> = value
        .get("widths")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|w| pixels(Some(w))).collect())
        .unwrap_or_default();
    widths.sort_unstable();
    widths.dedup();

    let mut collections = BTreeMap::new();
    if let Some(raw) = value.get("collections").and_then(Value::as_object) {
        for (key, entry) in raw {
            if let Some(entry) = entry.as_object() {
                let collection = normalize_collection(key, entry);
                collections.insert(collection.slug.clone(), collection);
            }
        }
    }

    ImageManifest {
        generated_at,
        widths,
        collections,
    }
}

fn normalize_collection(key: &str, data: &Map<String, Value>) -> CollectionEntry {
    let mut images: Vec<ImageEntry> = data
        .get("images")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(index, raw)| normalize_image(raw, index))
                .collect()
        })
        .unwrap_or_default();
    // listed order decides who keeps a contested slug
    let mut slugs = SlugRegistry::new();
    for image in &mut images {
        image.slug = slugs.claim(&image.slug);
    }
    images.sort_by(compare_images);

    CollectionEntry {
        slug: optional_string(data.get("slug")).unwrap_or_else(|| key.to_string()),
        title: optional_string(data.get("title")),
        description: optional_string(data.get("description")),
        order: numeric(data.get("order")),
        images,
    }
}

fn normalize_image(raw: &Value, index: usize) -> Option<ImageEntry> {
    let data = raw.as_object()?;

    let mut variants: Vec<ImageVariant> = data
        .get("variants")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(normalize_variant).collect())
        .unwrap_or_default();
    // stable sort, so dedup keeps the first variant listed for each width
    variants.sort_by_key(|v| v.width);
    variants.dedup_by_key(|v| v.width);
    if variants.is_empty() {
        return None;
    }

    let slug = optional_string(data.get("slug")).unwrap_or_else(|| format!("image-{}", index + 1));
    Some(ImageEntry {
        document_id: optional_string(data.get("documentId")).unwrap_or_else(|| slug.clone()),
        document_uid: optional_string(data.get("documentUid")),
        order: numeric(data.get("order")).unwrap_or(index as f64),
        caption: optional_string(data.get("caption")),
        credits: optional_string(data.get("credits")),
        alt: optional_string(data.get("alt")),
        hash: optional_string(data.get("hash")).unwrap_or_default(),
        slug,
        variants,
    })
}

fn normalize_variant(raw: &Value) -> Option<ImageVariant> {
    let data = raw.as_object()?;
    let width = pixels(data.get("width"))?;
    let height = pixels(data.get("height"))?;
    let src = optional_string(data.get("src"))?;
    let bytes = numeric(data.get("bytes"))
        .filter(|&b| b >= 0.0)
        .map(|b| b.round() as u64)
        .unwrap_or(0);
    Some(ImageVariant {
        width,
        height,
        bytes,
        aspect_ratio: numeric(data.get("aspectRatio"))
            .filter(|&r| r > 0.0)
            .unwrap_or_else(|| aspect_ratio(width, height)),
        src,
    })
}

/// Parse manifest text. Fails only if `text` is not JSON at all.
pub fn parse_manifest(text: &str) -> Result<ImageManifest, ReadError> {
    let value: Value = serde_json::from_str(text)?;
    Ok(normalize_manifest(&value))
}

/// Read and normalize the manifest at `path`.
pub fn load_manifest(path: &Path) -> Result<ImageManifest, ReadError> {
    let text = std::fs::read_to_string(path)?;
    parse_manifest(&text)
}

/// An immutable, shareable manifest snapshot.
///
/// Cloning the store is cheap; every accessor returns owned data.
#[derive(Debug, Clone, Default)]
pub struct ManifestStore {
    inner: Arc<ImageManifest>,
}

/// An image together with its collection and position.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionImage {
    pub collection: CollectionEntry,
    pub image: ImageEntry,
    pub index: usize,
}

impl ManifestStore {
    pub fn new(manifest: ImageManifest) -> Self {
        Self {
            inner: Arc::new(manifest),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ReadError> {
        load_manifest(path).map(Self::new)
    }

    /// Borrow the snapshot for read-only work (e.g. source resolution).
    pub fn snapshot(&self) -> &ImageManifest {
        &self.inner
    }

    pub fn manifest(&self) -> ImageManifest {
        (*self.inner).clone()
    }

    /// All collections, explicit order first, then by slug.
    pub fn collections(&self) -> Vec<CollectionEntry> {
        let mut collections: Vec<CollectionEntry> =
            self.inner.collections.values().cloned().collect();
        collections.sort_by(compare_collections);
        collections
    }

    pub fn collection(&self, slug: &str) -> Option<CollectionEntry> {
        self.inner.collections.get(slug).cloned()
    }

    pub fn collection_image(&self, collection_slug: &str, image_slug: &str) -> Option<CollectionImage> {
        let collection = self.inner.collections.get(collection_slug)?;
        let index = collection.position(image_slug)?;
        Some(CollectionImage {
            image: collection.images[index].clone(),
            collection: collection.clone(),
            index,
        })
    }
}
