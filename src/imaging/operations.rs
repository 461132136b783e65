//! High-level image operations.
//!
//! [`generate_variants`] combines the width calculations with backend
//! execution: it decides which widths to render for one source image, asks
//! the backend for each, writes the encoded bytes to disk, and returns the
//! manifest entries describing them.
//!
//! Derivatives land at `<output_root>/<collection>/w-<width>/<image>.jpg` and
//! are served from `<url_prefix>/<collection>/w-<width>/<image>.jpg`.

use super::backend::{BackendError, ImageBackend};
use super::calculations::target_widths;
use super::params::EncodeSettings;
use crate::types::ImageVariant;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Run-wide settings for derivative generation.
#[derive(Debug, Clone)]
pub struct VariantConfig {
    /// Candidate widths, ascending.
    pub preset: Vec<u32>,
    pub max_width: u32,
    pub settings: EncodeSettings,
    pub output_root: PathBuf,
    /// Public URL prefix, e.g. `/i`.
    pub url_prefix: String,
}

/// One source image to render.
#[derive(Debug, Clone, Copy)]
pub struct VariantRequest<'a> {
    pub source: &'a [u8],
    pub collection_slug: &'a str,
    pub image_slug: &'a str,
    /// Width reported by the CMS, if any.
    pub original_width: Option<u32>,
}

/// Path of a derivative relative to the output root.
pub fn variant_relative_path(collection_slug: &str, width: u32, image_slug: &str) -> PathBuf {
    Path::new(collection_slug)
        .join(format!("w-{width}"))
        .join(format!("{image_slug}.{}", EncodeSettings::EXTENSION))
}

/// Public URL of a derivative.
///
/// ```
/// # use folio::imaging::operations::variant_src;
/// assert_eq!(variant_src("/i", "alba", 960, "one"), "/i/alba/w-960/one.jpg");
/// assert_eq!(variant_src("/i/", "alba", 480, "one"), "/i/alba/w-480/one.jpg");
/// ```
pub fn variant_src(url_prefix: &str, collection_slug: &str, width: u32, image_slug: &str) -> String {
    format!(
        "{}/{collection_slug}/w-{width}/{image_slug}.{}",
        url_prefix.trim_end_matches('/'),
        EncodeSettings::EXTENSION
    )
}

/// Render every applicable width of one source image and write the results.
///
/// A width the backend fails to render is logged and skipped. Two target
/// widths that collapse onto the same output width keep only the first.
/// Filesystem errors abort.
///
/// The returned variants are sorted by ascending width; the list is empty only
/// if every width failed.
pub fn generate_variants(
    backend: &impl ImageBackend,
    request: &VariantRequest,
    config: &VariantConfig,
) -> Result<Vec<ImageVariant>> {
    let widths = target_widths(&config.preset, config.max_width, request.original_width);
    let mut variants: Vec<ImageVariant> = Vec::with_capacity(widths.len());

    let renditions = backend.resize_widths(request.source, &widths, config.settings);
    for (target, result) in widths.into_iter().zip(renditions) {
        let rendition = match result {
            Ok(r) => r,
            Err(BackendError::Io(e)) => return Err(BackendError::Io(e)),
            Err(e) => {
                warn!(
                    collection = request.collection_slug,
                    image = request.image_slug,
                    width = target,
                    "skipping width: {e}"
                );
                continue;
            }
        };

        if variants.iter().any(|v| v.width == rendition.width) {
            debug!(
                image = request.image_slug,
                requested = target,
                actual = rendition.width,
                "duplicate output width"
            );
            continue;
        }

        let relative = variant_relative_path(request.collection_slug, rendition.width, request.image_slug);
        let path = config.output_root.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &rendition.data)?;

        variants.push(ImageVariant::new(
            rendition.width,
            rendition.height,
            rendition.data.len() as u64,
            variant_src(
                &config.url_prefix,
                request.collection_slug,
                rendition.width,
                request.image_slug,
            ),
        ));
    }

    variants.sort_by_key(|v| v.width);
    Ok(variants)
}
