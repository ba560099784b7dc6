//! Shared test utilities for the sticker-sheets test suite.
//!
//! Builds source trees in a temp directory and a config sized for fast tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let source = tmp.path().join("collections");
//! write_fake_images(&source.join("01 Kitty"), 5);   // names only, for the mock backend
//! write_png_images(&source.join("Bunny"), 3);       // decodable, for RustBackend
//!
//! let config = test_config(&source, &tmp.path().join("output"));
//! ```

use crate::config::{BatchConfig, HeaderConfig, ProcessingConfig};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};

// =========================================================================
// Source trees
// =========================================================================

/// Create `dir` with `n` placeholder files named `000.png`, `001.png`, ...
///
/// The contents are not images; pair with `MockBackend`.
pub fn write_fake_images(dir: &Path, n: usize) -> Vec<PathBuf> {
    std::fs::create_dir_all(dir).unwrap();
    (0..n)
        .map(|i| {
            let path = dir.join(format!("{i:03}.png"));
            std::fs::write(&path, b"fake").unwrap();
            path
        })
        .collect()
}

/// Create `dir` with `n` small decodable PNGs, each a different colour.
pub fn write_png_images(dir: &Path, n: usize) -> Vec<PathBuf> {
    std::fs::create_dir_all(dir).unwrap();
    (0..n)
        .map(|i| {
            let path = dir.join(format!("{i:03}.png"));
            let shade = (i * 40 % 256) as u8;
            RgbaImage::from_pixel(16 + i as u32, 12, Rgba([shade, 90, 255 - shade, 255]))
                .save(&path)
                .unwrap();
            path
        })
        .collect()
}

// =========================================================================
// Config
// =========================================================================

/// Small canvas, low threshold, no prompt, ASCII header text.
pub fn test_config(source: &Path, output: &Path) -> BatchConfig {
    BatchConfig {
        source_root: source.to_path_buf(),
        output_root: output.to_path_buf(),
        min_images: 2,
        auto_start: true,
        canvas_size: [120, 160],
        header: HeaderConfig {
            count_label: "{count} stickers".into(),
            ..HeaderConfig::default()
        },
        processing: ProcessingConfig {
            max_workers: Some(2),
        },
        ..BatchConfig::default()
    }
}
