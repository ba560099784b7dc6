//! Codec backend built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP, BMP) | `image::ImageReader` with content sniffing |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//!
//! Sticker downloads are frequently mislabelled (WebP data in a `.png`), so
//! decoding sniffs the format from the file header instead of trusting the
//! extension.

use super::backend::{BackendError, ImageBackend};
use super::params::Quality;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader, RgbaImage};
use std::io::BufWriter;
use std::path::Path;

/// Pure Rust backend using the `image` crate.
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

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        let decode_err = |message: String| BackendError::Decode {
            path: path.display().to_string(),
            message,
        };
        ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| decode_err(e.to_string()))
    }

    fn encode_jpeg(
        &self,
        raster: &RgbaImage,
        path: &Path,
        quality: Quality,
    ) -> Result<(), BackendError> {
        // JPEG has no alpha channel; pages are opaque anyway.
        let rgb = DynamicImage::ImageRgba8(raster.clone()).to_rgb8();
        let file = std::fs::File::create(path)?;
        let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality.value());
        DynamicImage::ImageRgb8(rgb)
            .write_with_encoder(encoder)
            .map_err(|e| BackendError::Encode {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }
}
