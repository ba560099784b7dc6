//! Collection discovery.
//!
//! Stage 1 of the batch pipeline. Walks the immediate subdirectories of the
//! source root and turns each one into a [`Collection`] or an [`Exclusion`].
//!
//! ## Directory Structure
//!
//! ```text
//! collections/                     # Source root
//! ├── 01 春意慵懒kitty/             # Collection: title "春意慵懒kitty"
//! │   ├── 001.png                  # Images, ordered by filename
//! │   ├── 002.png
//! │   ├── tab_on.png               # UI element: ignored (exclude marker)
//! │   └── notes.txt                # Not an image: ignored
//! ├── Bunny·Daily/                 # Collection: title "Bunny", subtitle "Daily"
//! │   └── ...
//! ├── tiny/                        # Excluded: fewer than min_images
//! └── .cache/                      # Hidden: skipped
//! ```
//!
//! The scan is non-recursive and read-only. Only a missing or unreadable
//! source root is an error; problems with individual subdirectories become
//! exclusions so the rest of the batch still runs.

use crate::config::{BatchConfig, RESERVED_OUTPUT_NAMES};
use crate::naming::{self, SlugAllocator};
use serde::Serialize;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Source root does not exist: {0}")]
    NotFound(PathBuf),
    #[error("Source root is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Cannot read source root {0}: {1}")]
    Unreadable(PathBuf, #[source] std::io::Error),
}

/// Accepted image extensions, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Stem keywords that mark an image as the collection's main image.
const MAIN_IMAGE_KEYWORDS: &[&str] = &["main", "cover", "01", "1_"];

/// How many leading images are considered for the main image.
const MAIN_IMAGE_WINDOW: usize = 5;

/// One source directory that passed the minimum-image check.
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub root_path: PathBuf,
    /// Directory name as found on disk.
    pub dir_name: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Sanitized, run-unique title used for paths and archive names.
    pub slug: String,
    /// Eligible images in filename order.
    pub images: Vec<PathBuf>,
    /// Index into `images` of the cover avatar.
    pub main_image: usize,
}

impl Collection {
    /// The cover avatar, or `None` for a collection without images.
    pub fn main_image_path(&self) -> Option<&Path> {
        self.images.get(self.main_image).map(PathBuf::as_path)
    }
}

/// Why a subdirectory is not rendered.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    #[error("insufficient images ({found} found, {required} required)")]
    InsufficientImages { found: usize, required: usize },
    #[error("unreadable directory: {message}")]
    Unreadable { message: String },
}

/// A subdirectory that was skipped, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct Exclusion {
    pub dir_name: String,
    pub path: PathBuf,
    pub reason: ExclusionReason,
}

/// Result of scanning the source root.
#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub collections: Vec<Collection>,
    pub excluded: Vec<Exclusion>,
}

/// Scanner inputs taken from the batch config.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub min_images: usize,
    pub exclude_markers: Vec<String>,
    /// Directories never treated as collections (e.g. an output root
    /// that lives inside the source root).
    pub skip_dirs: Vec<PathBuf>,
    /// Names a collection slug must not take.
    pub reserved_slugs: Vec<String>,
}

impl ScanOptions {
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            min_images: config.min_images,
            exclude_markers: config.scan.exclude_markers.clone(),
            skip_dirs: vec![config.output_root.clone()],
            reserved_slugs: RESERVED_OUTPUT_NAMES.iter().map(|n| n.to_string()).collect(),
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from_config(&BatchConfig::default())
    }
}

pub fn scan(root: &Path, options: &ScanOptions) -> Result<ScanReport, ScanError> {
    if !root.exists() {
        return Err(ScanError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|e| ScanError::Unreadable(root.to_path_buf(), e))?;

    let skip: Vec<PathBuf> = options
        .skip_dirs
        .iter()
        .filter_map(|p| p.canonicalize().ok())
        .collect();

    let mut report = ScanReport::default();
    let mut slugs = SlugAllocator::with_reserved(options.reserved_slugs.iter().cloned());
    // A collection always has at least one image
    let required = options.min_images.max(1);

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry in source root");
                continue;
            }
        };
        let path = entry.path();
        if is_hidden(entry.file_name()) || !path.is_dir() {
            continue;
        }
        if path
            .canonicalize()
            .is_ok_and(|canonical| skip.contains(&canonical))
        {
            debug!(path = %path.display(), "skipping output directory");
            continue;
        }

        let dir_name = entry.file_name().to_string_lossy().to_string();
        let images = match collect_images(path, &options.exclude_markers) {
            Ok(images) => images,
            Err(e) => {
                report.excluded.push(Exclusion {
                    dir_name,
                    path: path.to_path_buf(),
                    reason: ExclusionReason::Unreadable {
                        message: e.to_string(),
                    },
                });
                continue;
            }
        };

        if images.len() < required {
            report.excluded.push(Exclusion {
                dir_name,
                path: path.to_path_buf(),
                reason: ExclusionReason::InsufficientImages {
                    found: images.len(),
                    required,
                },
            });
            continue;
        }

        let parsed = naming::parse_collection_name(&dir_name);
        let slug = slugs.allocate(&parsed.title);
        let main_image = select_main_image(&images);
        report.collections.push(Collection {
            root_path: path.to_path_buf(),
            dir_name,
            title: parsed.title,
            subtitle: parsed.subtitle,
            slug,
            images,
            main_image,
        });
    }

    Ok(report)
}

/// List eligible image files directly inside `dir`, sorted by filename.
fn collect_images(dir: &Path, exclude_markers: &[String]) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut images = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let path = entry.path();
        if is_hidden(entry.file_name()) || !path.is_file() || !is_image(path) {
            continue;
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        if exclude_markers.iter().any(|m| stem.contains(m.as_str())) {
            continue;
        }
        images.push(path.to_path_buf());
    }
    Ok(images)
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Pick the cover avatar: the first of the leading images whose stem carries
/// a main-image keyword, otherwise the first image.
fn select_main_image(images: &[PathBuf]) -> usize {
    images
        .iter()
        .take(MAIN_IMAGE_WINDOW)
        .position(|img| {
            let stem = img
                .file_stem()
                .map(|s| s.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            MAIN_IMAGE_KEYWORDS.iter().any(|kw| stem.contains(kw))
        })
        .unwrap_or(0)
}
