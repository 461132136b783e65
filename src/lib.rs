//! # Folio
//!
//! Build-time image pipeline and gallery runtime for a photo archive whose
//! content lives in a headless CMS (Prismic). Collections and image assets are
//! edited in the CMS; Folio turns them into static, responsive JPEG
//! derivatives plus a JSON manifest that pages read at render time.
//!
//! # Architecture
//!
//! ```text
//! 1. Build    CMS documents  →  public/i/<collection>/w-<width>/<slug>.jpg
//!                            →  generated/image-manifest.json
//! 2. Read     manifest       →  collections, images, responsive sources
//! 3. View     collection     →  navigation + screensaver state machine
//! ```
//!
//! The manifest is the only contract between the build and everything after
//! it. Builds are full rebuilds: the image root is wiped, every referenced
//! source is fetched once, and the manifest is written atomically at the end.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`process`] | Build orchestration: fetch, resolve, render, write the manifest |
//! | [`content`] | Content source trait, Prismic REST client, document parsing and reference resolution |
//! | [`cache`] | Per-run source byte cache and content hashing |
//! | [`imaging`] | Width ladder arithmetic, resize/encode backend, variant files |
//! | [`naming`] | Slug derivation and collision handling |
//! | [`types`] | Manifest types shared by the build and the readers |
//! | [`reader`] | Tolerant manifest loading and lookup |
//! | [`sources`] | `src`/`srcset`/preload resolution for one image |
//! | [`viewer`] | Gallery navigation, deep-link position, screensaver |
//! | [`config`] | `folio.toml` loading, validation and endpoint resolution |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## JPEG Output, Doubled Width Ladder
//!
//! Derivatives are baseline JPEG so every browser renders them without
//! `<picture>` fallbacks. The configured base widths are doubled for high
//! density screens, then capped at the original's width: an image is never
//! upscaled, and a small original gets a variant at its native width instead.
//!
//! ## Deterministic Slugs
//!
//! Image slugs are claimed in reference order before any work is parallelized,
//! so the same CMS content always produces the same file names regardless of
//! which downloads finish first.
//!
//! ## Skip, Don't Fail
//!
//! A broken reference or a missing source image drops one image with a
//! warning. Only failures of the content API itself abort a build. A failed
//! document fetch leaves the previous derivatives and manifest in place.

pub mod cache;
pub mod config;
pub mod content;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod process;
pub mod reader;
pub mod sources;
pub mod types;
pub mod viewer;

#[cfg(test)]
pub(crate) mod test_helpers;
