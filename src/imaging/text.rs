//! Header text rendering.
//!
//! A [`Typeface`] is either an outline font loaded from the configured asset
//! (rasterized with `ab_glyph` through `imageproc`) or the built-in 8×8 bitmap
//! font from `font8x8`, scaled up by whole pixels. The bitmap font has no CJK
//! coverage, so callers ask [`Typeface::missing_glyphs`] and record the gap
//! instead of silently drawing holes.

use ab_glyph::{Font, FontVec, PxScale};
use font8x8::{BASIC_FONTS, GREEK_FONTS, HIRAGANA_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect as PixelRect;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypefaceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid font data: {0}")]
    InvalidFont(String),
}

/// Glyph cell size of the built-in bitmap font.
const BITMAP_CELL: u32 = 8;

/// A loaded font, or the built-in bitmap fallback.
pub enum Typeface {
    Outline(FontVec),
    Bitmap,
}

impl Typeface {
    /// Load a TrueType/OpenType font file.
    pub fn load(path: &Path) -> Result<Self, TypefaceError> {
        let data = std::fs::read(path)?;
        FontVec::try_from_vec(data)
            .map(Typeface::Outline)
            .map_err(|e| TypefaceError::InvalidFont(e.to_string()))
    }

    /// The built-in bitmap font.
    pub fn builtin() -> Self {
        Typeface::Bitmap
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Typeface::Bitmap)
    }

    /// Width and height of `text` rendered at `size` pixels.
    pub fn measure(&self, text: &str, size: f32) -> (u32, u32) {
        match self {
            Typeface::Outline(font) => text_size(PxScale::from(size), font, text),
            Typeface::Bitmap => {
                let cell = BITMAP_CELL * bitmap_dot(size);
                (cell * text.chars().count() as u32, cell)
            }
        }
    }

    /// Visible characters this typeface cannot draw.
    pub fn missing_glyphs(&self, text: &str) -> Vec<char> {
        let mut missing: Vec<char> = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .filter(|&c| match self {
                Typeface::Outline(font) => font.glyph_id(c).0 == 0,
                Typeface::Bitmap => bitmap_glyph(c).is_none(),
            })
            .collect();
        missing.dedup();
        missing
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    pub fn draw(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        size: f32,
        (x, y): (i32, i32),
        color: Rgba<u8>,
    ) {
        match self {
            Typeface::Outline(font) => {
                draw_text_mut(canvas, color, x, y, PxScale::from(size), font, text)
            }
            Typeface::Bitmap => draw_bitmap_text(canvas, text, bitmap_dot(size), (x, y), color),
        }
    }
}

/// Screen pixels per bitmap-font dot for a requested text size.
fn bitmap_dot(size: f32) -> u32 {
    ((size / BITMAP_CELL as f32).round() as u32).max(1)
}

fn bitmap_glyph(c: char) -> Option<[u8; 8]> {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| GREEK_FONTS.get(c))
        .or_else(|| HIRAGANA_FONTS.get(c))
}

fn draw_bitmap_text(canvas: &mut RgbaImage, text: &str, dot: u32, (x, y): (i32, i32), color: Rgba<u8>) {
    let advance = (BITMAP_CELL * dot) as i32;
    for (i, c) in text.chars().enumerate() {
        // Unknown characters keep their cell so the rest of the line stays put
        let Some(rows) = bitmap_glyph(c) else {
            continue;
        };
        let origin_x = x + i as i32 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..BITMAP_CELL {
                if bits & (1 << col) != 0 {
                    let px = origin_x + (col * dot) as i32;
                    let py = y + (row as u32 * dot) as i32;
                    draw_filled_rect_mut(canvas, PixelRect::at(px, py).of_size(dot, dot), color);
                }
            }
        }
    }
}
