//! Batch configuration.
//!
//! One immutable [`BatchConfig`] is loaded per run and passed by reference into
//! every stage. Nothing reads configuration from globals.
//!
//! ## Config File
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source_root = "collections"   # Directory of collection subdirectories
//! output_root = "output"        # Where pages and archives are written
//! min_images = 15               # Collections with fewer images are excluded
//! auto_start = false            # Skip the interactive confirmation
//! # font_path = "title.ttf"     # TrueType/OpenType font for header text
//! quality = 95                  # JPEG quality (1-100)
//! canvas_size = [1200, 1600]    # Page size in pixels
//!
//! [templates]
//! cover = true
//! grid1 = true
//! grid2 = true
//! grid3 = true
//!
//! [scan]
//! exclude_markers = ["_key", "_s.", "tab_off", "tab_on"]
//!
//! [header]
//! # avatar = "avatar.png"       # Fixed avatar instead of the collection's main image
//! icons = []                    # Icon assets drawn at the top-right of the cover
//! count_label = "共 {count} 张"  # Empty string disables the label
//!
//! [processing]
//! # max_workers = 4             # Omit for auto (= CPU cores)
//! ```
//!
//! Relative paths are resolved against the directory that holds the config
//! file. Unknown keys are rejected to catch typos early.

use crate::layout::MIN_CANVAS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Run configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Directory whose immediate subdirectories are the collections.
    pub source_root: PathBuf,
    /// Directory that receives per-collection pages and `_zip_packages/`.
    pub output_root: PathBuf,
    /// Minimum number of eligible images for a collection to be rendered.
    pub min_images: usize,
    /// Skip the confirmation prompt between scan and render.
    pub auto_start: bool,
    /// Font used for header text. Falls back to a built-in bitmap font.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
    /// JPEG quality for rendered pages.
    pub quality: u32,
    /// Page size as `[width, height]`.
    pub canvas_size: [u32; 2],
    pub templates: TemplateToggles,
    pub scan: ScanConfig,
    pub header: HeaderConfig,
    pub processing: ProcessingConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("collections"),
            output_root: PathBuf::from("output"),
            min_images: 15,
            auto_start: false,
            font_path: None,
            quality: 95,
            canvas_size: [1200, 1600],
            templates: TemplateToggles::default(),
            scan: ScanConfig::default(),
            header: HeaderConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        let [w, h] = self.canvas_size;
        if w < MIN_CANVAS.0 || h < MIN_CANVAS.1 {
            return Err(ConfigError::Validation(format!(
                "canvas_size must be at least {}x{}",
                MIN_CANVAS.0, MIN_CANVAS.1
            )));
        }
        if self.min_images == 0 {
            return Err(ConfigError::Validation(
                "min_images must be at least 1".into(),
            ));
        }
        if !self.templates.any_enabled() {
            return Err(ConfigError::Validation(
                "at least one template must be enabled".into(),
            ));
        }
        if self.processing.max_workers == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_workers must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Rebase every relative path onto `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        rebase(&mut self.source_root);
        rebase(&mut self.output_root);
        if let Some(font) = self.font_path.as_mut() {
            rebase(font);
        }
        if let Some(avatar) = self.header.avatar.as_mut() {
            rebase(avatar);
        }
        for icon in &mut self.header.icons {
            rebase(icon);
        }
    }

    /// Directory that holds collection and aggregate archives.
    pub fn packages_dir(&self) -> PathBuf {
        self.output_root.join(PACKAGES_DIR)
    }

    /// Path of the JSON run report.
    pub fn report_path(&self) -> PathBuf {
        self.output_root.join(REPORT_FILE)
    }
}

/// Name of the archive directory inside the output root.
pub const PACKAGES_DIR: &str = "_zip_packages";

/// Name of the JSON run report inside the output root.
pub const REPORT_FILE: &str = "_processing_report.json";

/// Entries of the output root that no collection may be written to.
pub const RESERVED_OUTPUT_NAMES: &[&str] = &[PACKAGES_DIR, REPORT_FILE];

/// Per-template enable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateToggles {
    pub cover: bool,
    pub grid1: bool,
    pub grid2: bool,
    pub grid3: bool,
}

impl Default for TemplateToggles {
    fn default() -> Self {
        Self {
            cover: true,
            grid1: true,
            grid2: true,
            grid3: true,
        }
    }
}

impl TemplateToggles {
    pub fn any_enabled(&self) -> bool {
        self.cover || self.grid1 || self.grid2 || self.grid3
    }
}

/// Scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Files whose stem contains any of these markers are ignored
    /// (tab icons, key art and other UI elements shipped with sticker packs).
    pub exclude_markers: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude_markers: ["_key", "_s.", "tab_off", "tab_on"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Cover header settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderConfig {
    /// Fixed avatar asset. When absent the collection's main image is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<PathBuf>,
    /// Icon assets drawn right-aligned at the top of the header.
    pub icons: Vec<PathBuf>,
    /// Image count label; `{count}` is replaced with the collection size.
    pub count_label: String,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            avatar: None,
            icons: Vec::new(),
            count_label: "共 {count} 张".to_string(),
        }
    }
}

impl HeaderConfig {
    /// Render the count label for a collection, or `None` when disabled.
    pub fn count_text(&self, count: usize) -> Option<String> {
        if self.count_label.is_empty() {
            None
        } else {
            Some(self.count_label.replace("{count}", &count.to_string()))
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of collections rendered at once.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_workers(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_workers.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Parse and validate a config from TOML text.
pub fn parse_config(content: &str) -> Result<BatchConfig, ConfigError> {
    let config: BatchConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
///
/// A missing file yields the defaults (rebased onto the file's directory).
/// Relative paths are resolved against the file's directory.
pub fn load_config(path: &Path) -> Result<BatchConfig, ConfigError> {
    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut config = if path.exists() {
        parse_config(&fs::read_to_string(path)?)?
    } else {
        BatchConfig::default()
    };
    config.resolve_paths(base);
    Ok(config)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Sticker Sheets Configuration
# ============================
# All settings are optional. Values shown below are the defaults.
# Relative paths are resolved against the directory of this file.
# Unknown keys will cause an error.

# Directory whose immediate subdirectories are sticker collections.
source_root = "collections"

# Pages go to <output_root>/<title>/, archives to <output_root>/_zip_packages/.
output_root = "output"

# Collections with fewer eligible images are excluded from the run.
min_images = 15

# Start rendering right after the scan without asking for confirmation.
auto_start = false

# TrueType/OpenType font for the cover title, subtitle and count label.
# When unset or unreadable a built-in bitmap font is used.
# font_path = "title.ttf"

# JPEG quality of the rendered pages (1 = worst, 100 = best).
quality = 95

# Page size as [width, height] in pixels.
canvas_size = [1200, 1600]

# ---------------------------------------------------------------------------
# Templates: cover (header + 3x3 grid) and three 3x5 grid pages
# ---------------------------------------------------------------------------
[templates]
cover = true
grid1 = true
grid2 = true
grid3 = true

# ---------------------------------------------------------------------------
# Scanning
# ---------------------------------------------------------------------------
[scan]
# Image files whose name contains one of these markers are skipped.
exclude_markers = ["_key", "_s.", "tab_off", "tab_on"]

# ---------------------------------------------------------------------------
# Cover header
# ---------------------------------------------------------------------------
[header]
# Fixed avatar image. When unset the collection's main image is used.
# avatar = "avatar.png"

# Icons drawn at the top-right corner of the header.
icons = []

# Image count label. {count} is replaced; an empty string hides the label.
count_label = "共 {count} 张"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum collections rendered in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_workers = 4
"##
}
