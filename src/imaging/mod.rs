//! Image processing: codec backend, geometry, typefaces and header palette.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (format sniffed from content) |
//! | **Scale to slot** | `DynamicImage::resize` with Lanczos3 |
//! | **Composite** | `image::imageops::overlay` |
//! | **Text** | `ab_glyph` outline fonts via `imageproc`, `font8x8` fallback |
//! | **Encode → JPEG** | `image::codecs::jpeg::JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure geometry (slot grids, fit-within, cyclic indices)
//! - **Parameters**: Encoding quality
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Palette**: Header colour extraction and gradient fill
//! - **Text**: [`Typeface`] loading, measuring and drawing

pub mod backend;
mod calculations;
pub mod palette;
mod params;
pub mod rust_backend;
pub mod text;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{Rect, center_offset, cyclic_indices, fit_within, split_extent};
pub use params::Quality;
pub use rust_backend::RustBackend;
pub use text::{Typeface, TypefaceError};
