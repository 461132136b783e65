//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `image::load_from_memory` (format sniffed from bytes) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (baseline, 4:2:0) |
//!
//! Alpha is flattened by converting to RGB8 before encoding; JPEG has no
//! alpha channel.

use super::backend::{BackendError, ImageBackend, Rendition};
use super::calculations::fit_inside;
use super::params::{EncodeSettings, Quality, ResizeParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(source: &[u8]) -> Result<DynamicImage, BackendError> {
    if source.is_empty() {
        return Err(BackendError::ProcessingFailed(
            "Failed to decode source: empty input".to_string(),
        ));
    }
    image::load_from_memory(source)
        .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode source: {e}")))
}

fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
    rgb.write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
    Ok(buf)
}

fn render(img: &DynamicImage, target: u32, quality: Quality) -> Result<Rendition, BackendError> {
    let (width, height) = fit_inside((img.width(), img.height()), target);
    let data = if width == img.width() && height == img.height() {
        encode_jpeg(img, quality)?
    } else {
        encode_jpeg(&img.resize_exact(width, height, FilterType::Lanczos3), quality)?
    };
    Ok(Rendition {
        width,
        height,
        data,
    })
}

impl ImageBackend for RustBackend {
    fn resize(&self, params: &ResizeParams) -> Result<Rendition, BackendError> {
        let img = decode(params.source)?;
        render(&img, params.width, params.settings.quality)
    }

    /// Decodes `source` once and renders every width from the same pixels.
    fn resize_widths(
        &self,
        source: &[u8],
        widths: &[u32],
        settings: EncodeSettings,
    ) -> Vec<Result<Rendition, BackendError>> {
        match decode(source) {
            Ok(img) => widths
                .iter()
                .map(|&width| render(&img, width, settings.quality))
                .collect(),
            Err(e) => {
                let message = e.to_string();
                widths
                    .iter()
                    .map(|_| Err(BackendError::ProcessingFailed(message.clone())))
                    .collect()
            }
        }
    }
}
