//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait covers the two operations that touch encoded
//! bytes: decoding a source image and encoding a finished page. Everything in
//! between (scaling, compositing, text) works on in-memory rasters.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use a mock that
//! synthesizes rasters and records every decode, so slot assignment can be
//! checked without real image files.

use super::params::Quality;
use image::{DynamicImage, RgbaImage};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },
    #[error("Failed to encode {path}: {message}")]
    Encode { path: String, message: String },
}

/// Trait for image codec backends.
pub trait ImageBackend: Sync {
    /// Decode an image file into a raster.
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Encode a page raster as JPEG at the given quality.
    fn encode_jpeg(
        &self,
        raster: &RgbaImage,
        path: &Path,
        quality: Quality,
    ) -> Result<(), BackendError>;
}
