//! Source byte cache and content hashing for one build run.
//!
//! A single image asset may be referenced by several collections (or several
//! times by one). The builder fetches its bytes through [`SourceCache`], which
//! downloads each unique URL at most once per run and hands out shared
//! [`Arc`] buffers afterwards.
//!
//! # Design
//!
//! The cache is a read-through map keyed by URL. Each URL owns a slot with
//! its own lock, so two rayon workers asking for the same URL at the same time
//! result in one download while the second waits; workers on different URLs
//! never block each other. Failed fetches are not cached.
//!
//! There is no eviction and nothing is persisted: the cache lives exactly as
//! long as one `build_manifest` call. The output root is wiped at the start of
//! every run, so there is nothing on disk to reuse across runs.
//!
//! ## Content hashes
//!
//! Every manifest image carries the SHA-256 of its original bytes
//! ([`hash_bytes`]). Encoding is deterministic, so an unchanged hash means the
//! derivatives are byte-identical to the previous run's, and consumers can use
//! it as a change signal.

use crate::content::{ContentSource, FetchError};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

type Slot = Arc<Mutex<Option<Arc<Vec<u8>>>>>;

/// Per-run read-through cache of source image bytes.
pub struct SourceCache<'a, S: ContentSource + ?Sized> {
    source: &'a S,
    slots: Mutex<HashMap<String, Slot>>,
    hits: AtomicU32,
    fetches: AtomicU32,
}

impl<'a, S: ContentSource + ?Sized> SourceCache<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            slots: Mutex::new(HashMap::new()),
            hits: AtomicU32::new(0),
            fetches: AtomicU32::new(0),
        }
    }

    fn slot(&self, url: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(url.to_string()).or_default().clone()
    }

    /// Bytes behind `url`, downloading them on first use.
    pub fn get(&self, url: &str) -> Result<Arc<Vec<u8>>, FetchError> {
        let slot = self.slot(url);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bytes) = guard.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(url, "source cache hit");
            return Ok(Arc::clone(bytes));
        }

        let bytes = Arc::new(self.source.bytes(url)?);
        self.fetches.fetch_add(1, Ordering::Relaxed);
        *guard = Some(Arc::clone(&bytes));
        Ok(bytes)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
        }
    }
}

/// SHA-256 of `bytes` as lowercase hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Summary of source cache use for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub fetches: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.fetches
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} downloaded, {} reused ({} total)",
                self.fetches,
                self.hits,
                self.total()
            )
        } else {
            write!(f, "{} downloaded", self.fetches)
        }
    }
}
