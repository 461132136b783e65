//! CLI output formatting.
//!
//! Output leads with identity (collection slug, image position and slug);
//! details such as widths, skip reasons and URLs follow on indented lines.
//!
//! ## Build
//!
//! ```text
//! linee-di-ombra (3 images)
//!     001 alba: 480, 960, 1200
//!     002 skipped: source image https://… not found
//!     003 bruma: 480, 960
//! Manifest: generated/image-manifest.json
//! 2 collections, 5 images, 12 variants (1 skipped)
//! Sources: 5 downloaded
//! ```
//!
//! ## Check
//!
//! ```text
//! 001 linee-di-ombra "Linee di ombra" (2 images)
//!     001 alba (3 variants, 480-1200px)
//!     002 bruma (2 variants, 480-960px)
//! ```
//!
//! Each `format_*` function returns lines for testability; `print_*` wrappers
//! write them to stdout.

use crate::process::{BuildResult, ProcessEvent};
use crate::sources::ImageSource;
use crate::types::{ImageEntry, ImageManifest, compare_collections};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn join_widths(widths: &[u32]) -> String {
    widths
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Build
// ============================================================================

pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::CollectionStarted { slug, image_count } => {
            vec![format!("{} ({})", slug, plural(*image_count, "image"))]
        }
        ProcessEvent::ImageProcessed { slug, widths, .. } => {
            // position is not carried on the event; the slug is the identity
            vec![format!("{}{}: {}", indent(1), slug, join_widths(widths))]
        }
        ProcessEvent::ImageSkipped {
            position, reason, ..
        } => vec![format!(
            "{}{} skipped: {}",
            indent(1),
            format_index(position + 1),
            reason
        )],
    }
}

/// Closing lines of a build: where the manifest went and what it holds.
pub fn format_build_summary(result: &BuildResult) -> Vec<String> {
    let manifest = &result.manifest;
    let mut totals = format!(
        "{}, {}, {}",
        plural(manifest.collections.len(), "collection"),
        plural(manifest.image_count(), "image"),
        plural(manifest.variant_count(), "variant"),
    );
    if result.skipped > 0 {
        totals.push_str(&format!(" ({} skipped)", result.skipped));
    }
    vec![
        format!("Manifest: {}", result.manifest_path.display()),
        totals,
        format!("Sources: {}", result.cache_stats),
    ]
}

// ============================================================================
// Check
// ============================================================================

fn image_line(position: usize, image: &ImageEntry) -> String {
    let range = match (image.smallest_variant(), image.largest_variant()) {
        (Some(small), Some(large)) if small.width == large.width => format!("{}px", small.width),
        (Some(small), Some(large)) => format!("{}-{}px", small.width, large.width),
        _ => "no widths".to_string(),
    };
    format!(
        "{}{} {} ({}, {})",
        indent(1),
        format_index(position),
        image.slug,
        plural(image.variants.len(), "variant"),
        range
    )
}

/// Inventory of a manifest, collections in display order.
pub fn format_manifest_summary(manifest: &ImageManifest) -> Vec<String> {
    let mut collections: Vec<_> = manifest.collections.values().collect();
    collections.sort_by(|a, b| compare_collections(a, b));

    let mut lines = Vec::new();
    for (i, collection) in collections.iter().enumerate() {
        let title = match collection.title.as_deref() {
            Some(t) if !t.is_empty() && t != collection.slug => format!(" \"{t}\""),
            _ => String::new(),
        };
        lines.push(format!(
            "{} {}{} ({})",
            format_index(i + 1),
            collection.slug,
            title,
            plural(collection.images.len(), "image")
        ));
        for (j, image) in collection.images.iter().enumerate() {
            lines.push(image_line(j + 1, image));
        }
    }
    if !manifest.widths.is_empty() {
        lines.push(format!("Widths: {}", join_widths(&manifest.widths)));
    }
    if let Some(generated_at) = &manifest.generated_at {
        lines.push(format!("Generated: {generated_at}"));
    }
    lines
}

// ============================================================================
// Sources
// ============================================================================

pub fn format_image_source(source: &ImageSource) -> Vec<String> {
    let mut lines = vec![
        format!("{}/{}", source.collection.slug, source.image.slug),
        format!("{}src: {} ({}x{})", indent(1), source.src, source.width, source.height),
        format!("{}srcset: {}", indent(1), source.src_set),
        format!("{}sizes: {}", indent(1), source.sizes),
        format!("{}hash: {}", indent(1), source.hash),
    ];
    if let Some(alt) = source.image.alt.as_deref() {
        lines.push(format!("{}alt: {}", indent(1), alt));
    }
    match &source.preload {
        Some(preload) => lines.push(format!("{}preload: {}", indent(1), preload.href)),
        None => lines.push(format!("{}preload: none", indent(1))),
    }
    lines
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

pub fn print_build_summary(result: &BuildResult) {
    print_lines(format_build_summary(result));
}

pub fn print_manifest_summary(manifest: &ImageManifest) {
    print_lines(format_manifest_summary(manifest));
}

pub fn print_image_source(source: &ImageSource) {
    print_lines(format_image_source(source));
}
