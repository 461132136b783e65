//! Shared test utilities for the folio test suite.
//!
//! Provides an in-memory [`MockContentSource`], JSON builders for CMS
//! documents, small manifest fixtures, and lookup helpers that panic with a
//! clear message on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let source = MockContentSource::new()
//!     .with_documents("collection", vec![collection_doc("C1", Some("linee"), &[asset_ref("A")])])
//!     .with_documents("image_asset", vec![image_doc("A", Some("alba"), "https://cdn/a.jpg", 1200, 800)])
//!     .with_bytes("https://cdn/a.jpg", b"source");
//!
//! let manifest = sample_manifest(&[("linee", 3)]);
//! let image = find_image(find_collection(&manifest, "linee"), "img-2");
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Value, json};

use crate::content::{ContentSource, FetchError};
use crate::types::{CollectionEntry, ImageEntry, ImageManifest, ImageVariant};

// =========================================================================
// MockContentSource
// =========================================================================

/// In-memory content repository.
///
/// Unknown document types yield an empty list; unknown URLs yield
/// [`FetchError::NotFound`]. Failures can be scripted per URL.
#[derive(Default)]
pub struct MockContentSource {
    documents: HashMap<String, Vec<Value>>,
    bytes: HashMap<String, Vec<u8>>,
    failures: HashMap<String, u16>,
    document_failure: Option<String>,
    byte_requests: Mutex<Vec<String>>,
}

impl MockContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(mut self, doc_type: &str, docs: Vec<Value>) -> Self {
        self.documents.insert(doc_type.to_string(), docs);
        self
    }

    pub fn with_bytes(mut self, url: &str, bytes: &[u8]) -> Self {
        self.bytes.insert(url.to_string(), bytes.to_vec());
        self
    }

    /// Make `url` fail with an HTTP `status` (0 = transport error).
    pub fn with_failure(mut self, url: &str, status: u16) -> Self {
        self.failures.insert(url.to_string(), status);
        self
    }

    /// Make every document request fail with a transport error.
    pub fn with_document_failure(mut self, message: &str) -> Self {
        self.document_failure = Some(message.to_string());
        self
    }

    /// How many times `url` was requested.
    pub fn byte_requests(&self, url: &str) -> usize {
        self.byte_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| *u == url)
            .count()
    }
}

impl ContentSource for MockContentSource {
    fn documents(&self, doc_type: &str) -> Result<Vec<Value>, FetchError> {
        if let Some(message) = &self.document_failure {
            return Err(FetchError::Transport(message.clone()));
        }
        Ok(self.documents.get(doc_type).cloned().unwrap_or_default())
    }

    fn bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.byte_requests.lock().unwrap().push(url.to_string());
        match self.failures.get(url) {
            Some(0) => return Err(FetchError::Transport(format!("connection reset: {url}"))),
            Some(&status) => {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                });
            }
            None => {}
        }
        self.bytes
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_string(),
            })
    }
}

// =========================================================================
// CMS document builders
// =========================================================================

/// A group item linking to an image asset by id.
pub fn asset_ref(id: &str) -> Value {
    json!({ "asset": { "id": id, "type": "image_asset", "link_type": "Document" } })
}

/// A collection document with the given group items.
pub fn collection_doc(id: &str, uid: Option<&str>, items: &[Value]) -> Value {
    json!({
        "id": id,
        "uid": uid,
        "type": "collection",
        "data": {
            "title": [{ "type": "heading1", "text": format!("Title {id}") }],
            "short_description": null,
            "order": null,
            "images": items,
        }
    })
}

/// An image asset document with a source URL and CMS-reported dimensions.
pub fn image_doc(id: &str, uid: Option<&str>, url: &str, width: u32, height: u32) -> Value {
    json!({
        "id": id,
        "uid": uid,
        "type": "image_asset",
        "data": {
            "image": {
                "url": url,
                "alt": format!("Alt {id}"),
                "dimensions": { "width": width, "height": height }
            },
            "caption": null,
            "credits": null,
            "order": null,
        }
    })
}

// =========================================================================
// Manifest fixtures
// =========================================================================

/// Variants at 480 and 960 for `collection/slug`.
pub fn sample_variants(collection: &str, slug: &str) -> Vec<ImageVariant> {
    [(480, 320), (960, 640)]
        .into_iter()
        .map(|(w, h)| ImageVariant::new(w, h, 1000, format!("/i/{collection}/w-{w}/{slug}.jpg")))
        .collect()
}

/// A manifest with one collection per `(slug, image_count)`; images are
/// `img-1`, `img-2`, … in order.
pub fn sample_manifest(collections: &[(&str, usize)]) -> ImageManifest {
    let mut manifest = ImageManifest {
        generated_at: Some("2026-01-01T00:00:00.000Z".to_string()),
        widths: vec![480, 960],
        ..Default::default()
    };
    for (position, &(slug, count)) in collections.iter().enumerate() {
        let images = (1..=count)
            .map(|n| {
                let image_slug = format!("img-{n}");
                ImageEntry {
                    slug: image_slug.clone(),
                    document_id: format!("D{n}"),
                    document_uid: None,
                    order: n as f64,
                    caption: None,
                    credits: None,
                    alt: None,
                    hash: format!("hash-{n}"),
                    variants: sample_variants(slug, &image_slug),
                }
            })
            .collect();
        manifest.collections.insert(
            slug.to_string(),
            CollectionEntry {
                slug: slug.to_string(),
                title: Some(slug.to_string()),
                description: None,
                order: Some(position as f64),
                images,
            },
        );
    }
    manifest
}

// =========================================================================
// Manifest lookups, panicking with a clear message on miss
// =========================================================================

/// Find a collection by slug. Panics if not found.
pub fn find_collection<'a>(manifest: &'a ImageManifest, slug: &str) -> &'a CollectionEntry {
    manifest.collections.get(slug).unwrap_or_else(|| {
        let slugs: Vec<&String> = manifest.collections.keys().collect();
        panic!("collection '{slug}' not found. Available: {slugs:?}")
    })
}

/// Find an image by slug within a collection. Panics if not found.
pub fn find_image<'a>(collection: &'a CollectionEntry, slug: &str) -> &'a ImageEntry {
    collection
        .images
        .iter()
        .find(|i| i.slug == slug)
        .unwrap_or_else(|| {
            panic!(
                "image '{slug}' not found in '{}'. Available: {:?}",
                collection.slug,
                image_slugs(collection)
            )
        })
}

/// Image slugs of a collection, in order.
pub fn image_slugs(collection: &CollectionEntry) -> Vec<&str> {
    collection.images.iter().map(|i| i.slug.as_str()).collect()
}
