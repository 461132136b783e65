//! Responsive source resolution for one image of a collection.
//!
//! [`get_image_sources`] turns a manifest entry into everything a page needs
//! to render the image: the primary URL, a `srcset` string, the `sizes` hint,
//! the content hash, and optionally a [`PreloadDescriptor`] for the neighbor
//! the viewer is likely to show next.

use crate::imaging::EncodeSettings;
use crate::types::{CollectionEntry, ImageEntry, ImageManifest, ImageVariant};
use serde::Serialize;

/// Default `sizes` hint: the image spans the viewport width.
pub const DEFAULT_SIZES: &str = "100vw";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationDirection {
    #[default]
    Forward,
    Backward,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSourceOptions {
    /// `sizes` hint; [`DEFAULT_SIZES`] when absent.
    pub sizes: Option<String>,
    pub direction: NavigationDirection,
    /// Wrap around the ends of the collection when looking for a neighbor.
    pub wrap: bool,
    /// Use the largest variant as the primary source instead of the smallest.
    pub prefer_largest: bool,
}

/// A `<link rel="preload">` hint for the neighboring image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreloadDescriptor {
    pub rel: &'static str,
    #[serde(rename = "as")]
    pub as_: &'static str,
    pub href: String,
    pub imagesrcset: String,
    pub imagesizes: String,
    #[serde(rename = "type")]
    pub mime_type: &'static str,
}

/// Resolved sources for one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSource {
    pub src: String,
    pub src_set: String,
    pub sizes: String,
    pub hash: String,
    pub width: u32,
    pub height: u32,
    pub image: ImageEntry,
    pub collection: CollectionEntry,
    pub preload: Option<PreloadDescriptor>,
}

/// `"<src> <width>w"` for every variant, comma separated.
///
/// ```
/// # use folio::sources::build_src_set;
/// # use folio::types::ImageVariant;
/// let variants = vec![
///     ImageVariant::new(480, 320, 0, "/i/c/w-480/a.jpg".into()),
///     ImageVariant::new(960, 640, 0, "/i/c/w-960/a.jpg".into()),
/// ];
/// assert_eq!(build_src_set(&variants), "/i/c/w-480/a.jpg 480w, /i/c/w-960/a.jpg 960w");
/// ```
pub fn build_src_set(variants: &[ImageVariant]) -> String {
    variants
        .iter()
        .map(|v| format!("{} {}w", v.src, v.width))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Index of the neighbor of `index` in a list of `len` items.
fn neighbor_index(index: usize, len: usize, direction: NavigationDirection, wrap: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let target = match direction {
        NavigationDirection::Forward => index as isize + 1,
        NavigationDirection::Backward => index as isize - 1,
    };
    let len = len as isize;
    let target = if wrap { target.rem_euclid(len) } else { target };
    (0..len).contains(&target).then_some(target as usize)
}

/// Preload hint for the image next to `index`, if there is one.
///
/// Single-image collections never preload.
pub fn preload_for(
    collection: &CollectionEntry,
    index: usize,
    direction: NavigationDirection,
    sizes: &str,
    wrap: bool,
) -> Option<PreloadDescriptor> {
    if collection.images.len() <= 1 {
        return None;
    }
    let target = neighbor_index(index, collection.images.len(), direction, wrap)?;
    let image = &collection.images[target];
    let largest = image.largest_variant()?;
    Some(PreloadDescriptor {
        rel: "preload",
        as_: "image",
        href: largest.src.clone(),
        imagesrcset: build_src_set(&image.variants),
        imagesizes: sizes.to_string(),
        mime_type: EncodeSettings::MIME_TYPE,
    })
}

/// Resolve sources for `image_slug` in `collection_slug`.
///
/// Returns `None` if either slug is unknown or the image has no variants.
pub fn get_image_sources(
    manifest: &ImageManifest,
    collection_slug: &str,
    image_slug: &str,
    options: &ImageSourceOptions,
) -> Option<ImageSource> {
    let collection = manifest.collections.get(collection_slug)?;
    let index = collection.position(image_slug)?;
    let image = &collection.images[index];
    let primary = if options.prefer_largest {
        image.largest_variant()?
    } else {
        image.smallest_variant()?
    };

    let sizes = options.sizes.as_deref().unwrap_or(DEFAULT_SIZES);
    let preload = preload_for(collection, index, options.direction, sizes, options.wrap);

    Some(ImageSource {
        src: primary.src.clone(),
        src_set: build_src_set(&image.variants),
        sizes: sizes.to_string(),
        hash: image.hash.clone(),
        width: primary.width,
        height: primary.height,
        image: image.clone(),
        collection: collection.clone(),
        preload,
    })
}

/// Slug of the image next to `image_slug`, if there is one.
pub fn next_image_slug(
    manifest: &ImageManifest,
    collection_slug: &str,
    image_slug: &str,
    direction: NavigationDirection,
    wrap: bool,
) -> Option<String> {
    let collection = manifest.collections.get(collection_slug)?;
    let index = collection.position(image_slug)?;
    let target = neighbor_index(index, collection.images.len(), direction, wrap)?;
    Some(collection.images[target].slug.clone())
}
