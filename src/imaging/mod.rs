//! Image processing: width ladders, resize and JPEG encoding.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Resize → JPEG** | Lanczos3 + `JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for width and dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`generate_variants`], combining calculations + backend + disk

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, Rendition};
pub use calculations::{fit_inside, target_widths, width_preset};
pub use operations::{VariantConfig, VariantRequest, generate_variants};
pub use params::{EncodeSettings, Quality, ResizeParams};
pub use rust_backend::RustBackend;
