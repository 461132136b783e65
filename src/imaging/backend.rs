//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the seam between derivative planning and
//! pixel work. The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend); tests use the recording
//! [`MockBackend`](tests::MockBackend).

use super::params::{EncodeSettings, ResizeParams};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// One encoded derivative, still in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    /// Actual output width; may be narrower than requested.
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Trait for image processing backends.
pub trait ImageBackend: Sync {
    /// Decode `params.source`, fit it inside `params.width` without enlarging,
    /// and encode the result.
    fn resize(&self, params: &ResizeParams) -> Result<Rendition, BackendError>;

    /// Render `source` at each of `widths`, one result per width in order.
    ///
    /// Backends that can share one decode across widths should override this.
    fn resize_widths(
        &self,
        source: &[u8],
        widths: &[u32],
        settings: EncodeSettings,
    ) -> Vec<Result<Rendition, BackendError>> {
        widths
            .iter()
            .map(|&width| {
                self.resize(&ResizeParams {
                    source,
                    width,
                    settings,
                })
            })
            .collect()
    }
}
