//! Manifest building: CMS documents in, derivative files and manifest out.
//!
//! One call to [`build_manifest`] is a full rebuild:
//!
//! 1. Fetch every collection and image asset document.
//! 2. Clear and recreate the image root (stale derivatives never survive).
//!    A failed document fetch leaves the previous build untouched.
//! 3. For each collection, resolve its image references through an
//!    [`AssetIndex`], claim slugs in reference order, then render the images
//!    in parallel.
//! 4. Write the manifest atomically once everything has been processed.
//!
//! ## Output Structure
//!
//! ```text
//! public/i/
//! ├── linee-di-ombra/
//! │   ├── w-480/
//! │   │   ├── alba.jpg
//! │   │   └── bruma.jpg
//! │   ├── w-960/
//! │   │   └── ...
//! │   └── w-1200/
//! │       └── alba.jpg           # native width of a 1200px original
//! └── ...
//! generated/
//! └── image-manifest.json
//! ```
//!
//! ## Failure policy
//!
//! Per-item problems (unresolvable reference, missing source URL, a 404 on the
//! source bytes, an image that yields no variants) are skipped with a warning
//! and a [`ProcessEvent::ImageSkipped`]. Anything else coming out of the
//! content source aborts the run before the manifest is written.
//!
//! ## Parallel Processing
//!
//! Images of a collection are processed in parallel using
//! [rayon](https://docs.rs/rayon). Slugs are claimed sequentially beforehand,
//! so the result does not depend on scheduling.

use crate::cache::{CacheStats, SourceCache, hash_bytes};
use crate::config::{ConfigError, FolioConfig};
use crate::content::{
    AssetIndex, CollectionDocument, ContentSource, FetchError, ImageAssetDocument, ResolvedAsset,
    SkipReason,
};
use crate::imaging::{
    BackendError, ImageBackend, VariantConfig, VariantRequest, generate_variants,
};
use crate::naming::{SlugRegistry, slugify};
use crate::types::{CollectionEntry, ImageEntry, ImageManifest, compare_images};
use chrono::{SecondsFormat, Utc};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("Failed to persist manifest: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Progress events emitted during a build.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// A collection is about to be processed; `image_count` counts references.
    CollectionStarted { slug: String, image_count: usize },
    ImageProcessed {
        collection: String,
        slug: String,
        widths: Vec<u32>,
    },
    /// The reference at `position` (0-based) was left out.
    ImageSkipped {
        collection: String,
        position: usize,
        reason: SkipReason,
    },
}

/// Outcome of a build.
#[derive(Debug)]
pub struct BuildResult {
    pub manifest: ImageManifest,
    pub manifest_path: PathBuf,
    pub cache_stats: CacheStats,
    pub skipped: usize,
}

/// A reference that resolved and got its slug, waiting to be rendered.
struct ImageJob<'a> {
    position: usize,
    slug: String,
    asset: ResolvedAsset<'a>,
}

enum ImageOutcome {
    Processed(ImageEntry),
    Skipped { position: usize, reason: SkipReason },
}

/// Rebuild all derivatives and write the manifest.
pub fn build_manifest<S: ContentSource + ?Sized>(
    source: &S,
    backend: &impl ImageBackend,
    config: &FolioConfig,
    events: Option<Sender<ProcessEvent>>,
) -> Result<BuildResult, ProcessError> {
    config.validate()?;

    let emit = |event: ProcessEvent| {
        if let Some(tx) = &events {
            tx.send(event).ok();
        }
    };

    let collections: Vec<CollectionDocument> = source
        .documents(&config.content.collection_type)?
        .iter()
        .map(CollectionDocument::from_value)
        .collect();
    let assets: Vec<ImageAssetDocument> = source
        .documents(&config.content.image_type)?
        .iter()
        .map(ImageAssetDocument::from_value)
        .collect();
    info!(
        collections = collections.len(),
        assets = assets.len(),
        "fetched content"
    );

    // nothing is deleted until the content API has answered
    clear_output_root(&config.output.image_root)?;
    info!(root = %config.output.image_root.display(), "cleared output root");

    let index = AssetIndex::new(&assets);
    let cache = SourceCache::new(source);
    let preset = config.images.preset();
    let variant_config = VariantConfig {
        preset: preset.clone(),
        max_width: config.images.max_width,
        settings: config.images.encode_settings(),
        output_root: config.output.image_root.clone(),
        url_prefix: config.images.url_prefix.clone(),
    };

    let mut manifest = ImageManifest {
        generated_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        widths: preset,
        collections: BTreeMap::new(),
    };
    let mut collection_slugs = SlugRegistry::new();
    let mut skipped = 0;

    for doc in &collections {
        let slug = collection_slugs.claim(&slugify(doc.uid.as_deref(), &doc.id));
        emit(ProcessEvent::CollectionStarted {
            slug: slug.clone(),
            image_count: doc.references.len(),
        });

        let mut image_slugs = SlugRegistry::new();
        let mut jobs = Vec::with_capacity(doc.references.len());
        let mut outcomes = Vec::new();
        for (position, reference) in doc.references.iter().enumerate() {
            match index.resolve(reference.as_ref(), &config.content.image_type) {
                Ok(asset) => {
                    let base = slugify(asset.document.uid.as_deref(), &asset.document.id);
                    jobs.push(ImageJob {
                        position,
                        slug: image_slugs.claim(&base),
                        asset,
                    });
                }
                Err(reason) => outcomes.push(ImageOutcome::Skipped { position, reason }),
            }
        }

        let rendered: Vec<ImageOutcome> = jobs
            .par_iter()
            .map(|job| process_image(job, &slug, &cache, backend, &variant_config))
            .collect::<Result<_, _>>()?;
        outcomes.extend(rendered);

        let mut images = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                ImageOutcome::Processed(entry) => {
                    emit(ProcessEvent::ImageProcessed {
                        collection: slug.clone(),
                        slug: entry.slug.clone(),
                        widths: entry.variants.iter().map(|v| v.width).collect(),
                    });
                    images.push(entry);
                }
                ImageOutcome::Skipped { position, reason } => {
                    warn!(collection = %slug, position, "skipping image: {reason}");
                    skipped += 1;
                    emit(ProcessEvent::ImageSkipped {
                        collection: slug.clone(),
                        position,
                        reason,
                    });
                }
            }
        }
        images.sort_by(compare_images);

        manifest.collections.insert(
            slug.clone(),
            CollectionEntry {
                slug,
                title: doc.title.clone(),
                description: doc.description.clone(),
                order: doc.order,
                images,
            },
        );
    }

    write_manifest(&config.output.manifest_path, &manifest)?;
    info!(
        path = %config.output.manifest_path.display(),
        images = manifest.image_count(),
        variants = manifest.variant_count(),
        "manifest written"
    );

    Ok(BuildResult {
        manifest,
        manifest_path: config.output.manifest_path.clone(),
        cache_stats: cache.stats(),
        skipped,
    })
}

fn process_image<S: ContentSource + ?Sized>(
    job: &ImageJob,
    collection_slug: &str,
    cache: &SourceCache<S>,
    backend: &impl ImageBackend,
    variant_config: &VariantConfig,
) -> Result<ImageOutcome, ProcessError> {
    let doc = job.asset.document;
    let bytes = match cache.get(job.asset.url) {
        Ok(bytes) => bytes,
        Err(FetchError::NotFound { url }) => {
            return Ok(ImageOutcome::Skipped {
                position: job.position,
                reason: SkipReason::SourceNotFound { url },
            });
        }
        Err(e) => return Err(e.into()),
    };

    let variants = generate_variants(
        backend,
        &VariantRequest {
            source: &bytes,
            collection_slug,
            image_slug: &job.slug,
            original_width: doc.width,
        },
        variant_config,
    )?;
    if variants.is_empty() {
        return Ok(ImageOutcome::Skipped {
            position: job.position,
            reason: SkipReason::NoVariants {
                document_id: doc.id.clone(),
            },
        });
    }

    Ok(ImageOutcome::Processed(ImageEntry {
        slug: job.slug.clone(),
        document_id: doc.id.clone(),
        document_uid: doc.uid.clone(),
        order: doc.order.unwrap_or(job.position as f64),
        caption: doc.caption.clone(),
        credits: doc.credits.clone(),
        alt: doc.alt.clone(),
        hash: hash_bytes(&bytes),
        variants,
    }))
}

/// Remove everything under `root` and recreate it empty.
pub fn clear_output_root(root: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(root) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::create_dir_all(root)
}

/// Write `manifest` as pretty JSON with a trailing newline.
///
/// The JSON goes to a temp file in the destination directory, which is then
/// renamed over `path`; readers see the old manifest or the new one, never a
/// partial file.
pub fn write_manifest(path: &Path, manifest: &ImageManifest) -> Result<(), ProcessError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut json = serde_json::to_string_pretty(manifest)?;
    json.push('\n');

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
