//! Content fetching: documents and source image bytes from the headless CMS.
//!
//! The build pipeline only talks to the CMS through [`ContentSource`], which
//! has two capabilities:
//!
//! - **documents**: every document of one custom type, as raw JSON
//! - **bytes**: the raw bytes behind a URL
//!
//! Both report [`FetchError::NotFound`] separately from other failures so the
//! builder can treat a missing image as a skippable item while aborting on
//! anything that looks like a transport problem.
//!
//! Raw documents are loosely typed. [`documents`] is the single normalization
//! boundary that turns them into fully-populated structs with defaults.

pub mod documents;
mod http;

pub use documents::{
    AssetIndex, AssetLink, CollectionDocument, ImageAssetDocument, ResolvedAsset, SkipReason,
};
pub use http::HttpContentSource;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("not found: {url}")]
    NotFound { url: String },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

/// Read access to the content repository.
///
/// `Sync` so a single source can be shared across rayon workers.
pub trait ContentSource: Sync {
    /// All documents of `doc_type`, in repository order.
    fn documents(&self, doc_type: &str) -> Result<Vec<serde_json::Value>, FetchError>;

    /// Raw bytes behind `url`.
    fn bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
