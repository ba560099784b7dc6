//! Page composition.
//!
//! A [`PageSpec`] fixes the canvas size, the slot grid and (for the cover) the
//! header zone. [`render_page`] fills it from an ordered list of image paths:
//!
//! ```text
//! Cover (W×H)                          Grid page (W×H)
//! ┌──────────────────────────────┐     ┌─────────┬─────────┬─────────┐
//! │ ┌──────┐        Title     ◯ ◯│     │    0    │    1    │    2    │
//! │ │avatar│      Subtitle       │     ├─────────┼─────────┼─────────┤
//! │ └──────┘      共 48 张        │     │    3    │    4    │    5    │
//! ├─────────┬─────────┬──────────┤     ├─────────┼─────────┼─────────┤
//! │    0    │    1    │    2     │     │   ...   │   ...   │   ...   │
//! ├─────────┼─────────┼──────────┤     ├─────────┼─────────┼─────────┤
//! │    3    │    4    │    5     │     │         │         │         │
//! ├─────────┼─────────┼──────────┤     ├─────────┼─────────┼─────────┤
//! │    6    │    7    │    8     │     │   12    │   13    │   14    │
//! └─────────┴─────────┴──────────┘     └─────────┴─────────┴─────────┘
//! ```
//!
//! Images are scaled to fit their slot and centred on white. A source that
//! cannot be decoded becomes a grey placeholder and a [`RenderIssue`]; only
//! problems with the page itself (an impossible canvas) are errors.

use crate::imaging::palette::{self, FALLBACK_COLOR};
use crate::imaging::{ImageBackend, Rect, Typeface, center_offset, fit_within};
use crate::types::RenderIssue;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect as PixelRect;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PageRenderError {
    #[error("Canvas {width}x{height} is too large to allocate")]
    CanvasTooLarge { width: u32, height: u32 },
    #[error("Canvas {width}x{height} is smaller than {}x{}", MIN_CANVAS.0, MIN_CANVAS.1)]
    CanvasTooSmall { width: u32, height: u32 },
    #[error("Page needs {needed} images, got {got}")]
    NotEnoughImages { needed: usize, got: usize },
    #[error("Cover page rendered without header content")]
    MissingHeader,
}

/// Upper bound on a single page raster.
const MAX_CANVAS_BYTES: u64 = 512 * 1024 * 1024;

/// Smallest canvas on which every slot and header region is non-empty.
pub const MIN_CANVAS: (u32, u32) = (30, 50);

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PLACEHOLDER: Rgba<u8> = Rgba([240, 240, 240, 255]);
const ICON_PLACEHOLDER: Rgba<u8> = Rgba([200, 200, 200, 255]);
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Header text sizes at the reference width; scaled with the canvas.
const REFERENCE_WIDTH: f32 = 1200.0;
const TITLE_SIZE: f32 = 72.0;
const SUBTITLE_SIZE: f32 = 42.0;
const COUNT_SIZE: f32 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Cover,
    Grid,
}

/// Reserved regions of the cover header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderZone {
    pub area: Rect,
    pub avatar: Rect,
    pub text_region: Rect,
    pub icon_size: u32,
    pub margin: u32,
}

impl HeaderZone {
    /// Square icon rectangles, right-aligned along the top margin.
    pub fn icon_rects(&self, count: usize) -> Vec<Rect> {
        let gap = self.icon_size / 4;
        let step = self.icon_size + gap;
        let right = self.area.right().saturating_sub(self.margin);
        (0..count as u32)
            .rev()
            .map(|i| {
                let x = right.saturating_sub(self.icon_size + i * step);
                Rect::new(x, self.area.y + self.margin, self.icon_size, self.icon_size)
            })
            .collect()
    }
}

/// Fixed layout definition of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpec {
    pub kind: PageKind,
    pub canvas: (u32, u32),
    /// Slot rectangles, row-major.
    pub slots: Vec<Rect>,
    pub header: Option<HeaderZone>,
}

impl PageSpec {
    /// Cover: header over the top 40%, 3×3 slots below.
    pub fn cover(canvas: (u32, u32)) -> Self {
        let (w, h) = canvas;
        let header_h = h * 2 / 5;
        let margin = w / 20;
        let side = header_h * 5 / 8;
        let avatar = Rect::new(margin, (header_h - side) / 2, side, side);
        let text_x = avatar.right() + margin;
        let text_region = Rect::new(text_x, 0, w.saturating_sub(text_x + margin), header_h);
        let header = HeaderZone {
            area: Rect::new(0, 0, w, header_h),
            avatar,
            text_region,
            icon_size: (w / 25).max(1),
            margin: w / 40,
        };
        Self {
            kind: PageKind::Cover,
            canvas,
            slots: Rect::new(0, header_h, w, h - header_h).grid(3, 3),
            header: Some(header),
        }
    }

    /// Grid page: 3 columns × 5 rows over the whole canvas.
    pub fn grid(canvas: (u32, u32)) -> Self {
        let (w, h) = canvas;
        Self {
            kind: PageKind::Grid,
            canvas,
            slots: Rect::new(0, 0, w, h).grid(5, 3),
            header: None,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

/// Text and assets drawn into the cover header.
#[derive(Debug, Clone)]
pub struct HeaderContent<'a> {
    pub title: &'a str,
    pub subtitle: Option<&'a str>,
    pub avatar: &'a Path,
    pub count_text: Option<&'a str>,
    pub icons: &'a [PathBuf],
}

/// A composed page raster plus the recoveries made while drawing it.
#[derive(Debug)]
pub struct Composition {
    pub raster: RgbaImage,
    pub issues: Vec<RenderIssue>,
}

/// Compose one page.
///
/// `images` must hold at least `spec.slot_count()` paths; slot `i` receives
/// `images[i]`.
pub fn render_page(
    backend: &impl ImageBackend,
    typeface: &Typeface,
    spec: &PageSpec,
    images: &[&Path],
    header: Option<&HeaderContent<'_>>,
) -> Result<Composition, PageRenderError> {
    let (width, height) = spec.canvas;
    if images.len() < spec.slot_count() {
        return Err(PageRenderError::NotEnoughImages {
            needed: spec.slot_count(),
            got: images.len(),
        });
    }
    if width < MIN_CANVAS.0 || height < MIN_CANVAS.1 {
        return Err(PageRenderError::CanvasTooSmall { width, height });
    }
    let bytes = (width as u64)
        .checked_mul(height as u64)
        .and_then(|px| px.checked_mul(4));
    if bytes.is_none_or(|b| b > MAX_CANVAS_BYTES) {
        return Err(PageRenderError::CanvasTooLarge { width, height });
    }

    let mut canvas = RgbaImage::from_pixel(width, height, WHITE);
    let mut issues = Vec::new();

    if let Some(zone) = &spec.header {
        let content = header.ok_or(PageRenderError::MissingHeader)?;
        draw_header(backend, typeface, &mut canvas, zone, content, &mut issues);
    }

    for (slot, (rect, path)) in spec.slots.iter().zip(images).enumerate() {
        match backend.decode(path) {
            Ok(img) => draw_fitted(&mut canvas, &img, *rect),
            Err(e) => {
                debug!(slot, path = %path.display(), error = %e, "slot placeholder");
                fill(&mut canvas, *rect, PLACEHOLDER);
                issues.push(RenderIssue::SlotPlaceholder {
                    slot,
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(Composition {
        raster: canvas,
        issues,
    })
}

fn draw_header(
    backend: &impl ImageBackend,
    typeface: &Typeface,
    canvas: &mut RgbaImage,
    zone: &HeaderZone,
    content: &HeaderContent<'_>,
    issues: &mut Vec<RenderIssue>,
) {
    let avatar = match backend.decode(content.avatar) {
        Ok(img) => Some(img),
        Err(e) => {
            issues.push(RenderIssue::AvatarPlaceholder {
                path: content.avatar.display().to_string(),
                message: e.to_string(),
            });
            None
        }
    };

    let color = avatar
        .as_ref()
        .map(palette::dominant_color)
        .unwrap_or(FALLBACK_COLOR);
    palette::fill_gradient(canvas, zone.area, color);

    match &avatar {
        Some(img) => {
            let square = img
                .resize_to_fill(zone.avatar.width, zone.avatar.height, FilterType::Lanczos3)
                .to_rgba8();
            imageops::overlay(canvas, &square, zone.avatar.x as i64, zone.avatar.y as i64);
        }
        None => fill(canvas, zone.avatar, PLACEHOLDER),
    }

    draw_header_text(typeface, canvas, zone, content, issues);

    for (rect, path) in zone.icon_rects(content.icons.len()).into_iter().zip(content.icons) {
        match backend.decode(path) {
            Ok(icon) => {
                let icon = icon
                    .resize_to_fill(rect.width, rect.height, FilterType::Lanczos3)
                    .to_rgba8();
                imageops::overlay(canvas, &icon, rect.x as i64, rect.y as i64);
            }
            Err(e) => {
                let r = (rect.width / 2) as i32;
                let center = (rect.x as i32 + r, rect.y as i32 + r);
                draw_filled_circle_mut(canvas, center, r, ICON_PLACEHOLDER);
                issues.push(RenderIssue::IconPlaceholder {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Title, subtitle and count label stacked and centred in the text region.
fn draw_header_text(
    typeface: &Typeface,
    canvas: &mut RgbaImage,
    zone: &HeaderZone,
    content: &HeaderContent<'_>,
    issues: &mut Vec<RenderIssue>,
) {
    let scale = canvas.width() as f32 / REFERENCE_WIDTH;
    let lines: Vec<(&str, f32)> = [
        Some((content.title, TITLE_SIZE)),
        content.subtitle.map(|s| (s, SUBTITLE_SIZE)),
        content.count_text.map(|c| (c, COUNT_SIZE)),
    ]
    .into_iter()
    .flatten()
    .filter(|(text, _)| !text.is_empty())
    .map(|(text, size)| (text, (size * scale).max(1.0)))
    .collect();

    let measured: Vec<(u32, u32)> = lines
        .iter()
        .map(|(text, size)| typeface.measure(text, *size))
        .collect();
    let gap = (zone.text_region.height / 20).max(1);
    let block_h: u32 = measured.iter().map(|&(_, h)| h).sum::<u32>()
        + gap * (lines.len() as u32).saturating_sub(1);

    let region = zone.text_region;
    let mut y = region.y + region.height.saturating_sub(block_h) / 2;
    for ((text, size), (w, h)) in lines.iter().zip(&measured) {
        let (dx, _) = center_offset((*w, *h), (region.width, region.height));
        typeface.draw(
            canvas,
            text,
            *size,
            ((region.x + dx) as i32, y as i32),
            TEXT_COLOR,
        );
        let missing = typeface.missing_glyphs(text);
        if !missing.is_empty() {
            issues.push(RenderIssue::MissingGlyphs {
                text: text.to_string(),
                chars: missing.into_iter().collect(),
            });
        }
        y += h + gap;
    }
}

/// Scale `img` to fit `slot` and overlay it centred.
fn draw_fitted(canvas: &mut RgbaImage, img: &DynamicImage, slot: Rect) {
    let (w, h) = fit_within((img.width(), img.height()), (slot.width, slot.height));
    let scaled = img.resize_exact(w, h, FilterType::Lanczos3).to_rgba8();
    let (dx, dy) = center_offset((w, h), (slot.width, slot.height));
    imageops::overlay(
        canvas,
        &scaled,
        (slot.x + dx) as i64,
        (slot.y + dy) as i64,
    );
}

fn fill(canvas: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    let px = PixelRect::at(rect.x as i32, rect.y as i32).of_size(rect.width, rect.height);
    draw_filled_rect_mut(canvas, px, color);
}
