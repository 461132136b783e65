//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between [`operations`](super::operations) (which decides which
//! widths to render and where they go) and the [`backend`](super::backend)
//! (which does the pixel work).
//!
//! Encoding is fixed: baseline JPEG, 4:2:0 chroma subsampling, one quality
//! value. Nothing in the settings depends on time or randomness, so the same
//! source bytes and width always encode to the same output bytes.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(82)
    }
}

/// Encoder configuration shared by every derivative of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeSettings {
    pub quality: Quality,
}

impl EncodeSettings {
    /// File extension of encoded derivatives.
    pub const EXTENSION: &'static str = "jpg";
    /// MIME type of encoded derivatives.
    pub const MIME_TYPE: &'static str = "image/jpeg";
}

/// Parameters for one resize-and-encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeParams<'a> {
    /// Encoded source bytes.
    pub source: &'a [u8],
    /// Requested width; the backend never enlarges past the source width.
    pub width: u32,
    pub settings: EncodeSettings,
}
