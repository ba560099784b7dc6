//! The fixed four-page template set.
//!
//! Every collection gets the same pages, in the same order:
//!
//! | # | Template | Slots | Source positions |
//! |---|----------|-------|------------------|
//! | 1 | cover    | 9     | `0..9`  mod n    |
//! | 2 | grid1    | 15    | `0..15` mod n    |
//! | 3 | grid2    | 15    | `15..30` mod n   |
//! | 4 | grid3    | 15    | `30..45` mod n   |
//!
//! Positions wrap modulo the collection size, so a small collection repeats
//! its images rather than leaving slots empty. Planning is pure
//! ([`plan_template_set`]); [`build_template_set`] renders the plan and keeps
//! going past a failed page.

use crate::config::{BatchConfig, TemplateToggles};
use crate::imaging::{ImageBackend, Typeface, cyclic_indices};
use crate::layout::{self, HeaderContent, PageRenderError, PageSpec};
use crate::scan::Collection;
use crate::types::RenderIssue;
use image::RgbaImage;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// Slots on each grid page.
const GRID_SLOTS: usize = 15;

/// Extension of every rendered page.
pub const PAGE_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    Cover,
    Grid1,
    Grid2,
    Grid3,
}

impl Template {
    /// All templates in page order.
    pub const ALL: [Template; 4] = [
        Template::Cover,
        Template::Grid1,
        Template::Grid2,
        Template::Grid3,
    ];

    /// Enabled templates in page order.
    pub fn enabled(toggles: &TemplateToggles) -> Vec<Template> {
        Self::ALL
            .into_iter()
            .filter(|t| match t {
                Template::Cover => toggles.cover,
                Template::Grid1 => toggles.grid1,
                Template::Grid2 => toggles.grid2,
                Template::Grid3 => toggles.grid3,
            })
            .collect()
    }

    pub fn label(self) -> &'static str {
        match self {
            Template::Cover => "cover",
            Template::Grid1 => "grid1",
            Template::Grid2 => "grid2",
            Template::Grid3 => "grid3",
        }
    }

    /// 1-based position in the full set. Disabled templates keep their number.
    pub fn page_number(self) -> usize {
        match self {
            Template::Cover => 1,
            Template::Grid1 => 2,
            Template::Grid2 => 3,
            Template::Grid3 => 4,
        }
    }

    /// `01_cover_<slug>.jpg`, `02_grid1_<slug>.jpg`, ...
    pub fn file_name(self, slug: &str) -> String {
        format!(
            "{:02}_{}_{}.{}",
            self.page_number(),
            self.label(),
            slug,
            PAGE_EXTENSION
        )
    }

    pub fn page_spec(self, canvas: (u32, u32)) -> PageSpec {
        match self {
            Template::Cover => PageSpec::cover(canvas),
            _ => PageSpec::grid(canvas),
        }
    }

    /// First source position consumed by this template.
    fn start(self) -> usize {
        match self {
            Template::Cover | Template::Grid1 => 0,
            Template::Grid2 => GRID_SLOTS,
            Template::Grid3 => 2 * GRID_SLOTS,
        }
    }

    /// Image positions for each slot, wrapping modulo `available`.
    pub fn slot_indices(self, slots: usize, available: usize) -> Vec<usize> {
        cyclic_indices(self.start(), slots, available)
    }
}

/// One page to render: which template, which images, which file.
#[derive(Debug, Clone)]
pub struct PagePlan {
    pub template: Template,
    pub spec: PageSpec,
    /// Index into the collection's images for each slot.
    pub image_indices: Vec<usize>,
    pub output_filename: String,
}

/// Plan the enabled pages for a collection.
pub fn plan_template_set(collection: &Collection, config: &BatchConfig) -> Vec<PagePlan> {
    let [w, h] = config.canvas_size;
    Template::enabled(&config.templates)
        .into_iter()
        .map(|template| {
            let spec = template.page_spec((w, h));
            let image_indices = template.slot_indices(spec.slot_count(), collection.images.len());
            PagePlan {
                template,
                spec,
                image_indices,
                output_filename: template.file_name(&collection.slug),
            }
        })
        .collect()
}

/// A composed page waiting to be persisted.
#[derive(Debug)]
pub struct RenderedPage {
    /// 0-based position among the rendered pages.
    pub page_index: usize,
    pub template: Template,
    pub collection_slug: String,
    pub raster: RgbaImage,
    pub output_filename: String,
    pub issues: Vec<RenderIssue>,
}

/// A page that could not be composed at all.
#[derive(Debug)]
pub struct PageFailure {
    pub template: Template,
    pub output_filename: String,
    pub error: PageRenderError,
}

/// Result of rendering one collection's template set.
#[derive(Debug, Default)]
pub struct TemplateSet {
    /// Successfully composed pages in template order.
    pub pages: Vec<RenderedPage>,
    pub failures: Vec<PageFailure>,
}

/// Render every enabled page of `collection`.
///
/// A page that fails is recorded and the remaining pages are still rendered.
pub fn build_template_set(
    backend: &impl ImageBackend,
    typeface: &Typeface,
    collection: &Collection,
    config: &BatchConfig,
) -> TemplateSet {
    let count_text = config.header.count_text(collection.images.len());
    let avatar = config
        .header
        .avatar
        .as_deref()
        .or_else(|| collection.main_image_path());
    // No avatar means no images, so every page fails its slot check
    let header = avatar.map(|avatar| HeaderContent {
        title: &collection.title,
        subtitle: collection.subtitle.as_deref(),
        avatar,
        count_text: count_text.as_deref(),
        icons: &config.header.icons,
    });

    let mut set = TemplateSet::default();
    for plan in plan_template_set(collection, config) {
        let images: Vec<&Path> = plan
            .image_indices
            .iter()
            .map(|&i| collection.images[i].as_path())
            .collect();
        let page_header = plan.spec.header.as_ref().and(header.as_ref());

        match layout::render_page(backend, typeface, &plan.spec, &images, page_header) {
            Ok(composition) => set.pages.push(RenderedPage {
                page_index: set.pages.len(),
                template: plan.template,
                collection_slug: collection.slug.clone(),
                raster: composition.raster,
                output_filename: plan.output_filename,
                issues: composition.issues,
            }),
            Err(error) => {
                warn!(
                    collection = %collection.title,
                    page = %plan.output_filename,
                    %error,
                    "page render failed"
                );
                set.failures.push(PageFailure {
                    template: plan.template,
                    output_filename: plan.output_filename,
                    error,
                });
            }
        }
    }
    set
}
