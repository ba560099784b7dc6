//! Header colours derived from the cover avatar.

use super::calculations::Rect;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, Rgba, RgbaImage};
use std::collections::BTreeMap;

/// Used when the avatar is missing or entirely near-white.
pub const FALLBACK_COLOR: Rgb<u8> = Rgb([254, 207, 120]);

/// Pixels closer than this to pure white count as background.
const WHITE_DISTANCE: f64 = 30.0;

/// Width of a quantisation bucket per channel.
const BUCKET: u8 = 32;

/// Side of the downsampled analysis image.
const SAMPLE_SIZE: u32 = 100;

/// Darkening applied at the bottom of the header gradient.
const GRADIENT_DEPTH: f64 = 0.15;

/// Most prominent non-background colour of an image.
///
/// The image is composited onto white and downsampled; near-white pixels are
/// dropped, the rest are bucketed per channel. The winning bucket's pixels are
/// averaged so the result is a real colour from the image rather than a
/// bucket corner. Ties go to the lowest bucket so the result is deterministic.
pub fn dominant_color(img: &DynamicImage) -> Rgb<u8> {
    let sample = img
        .resize_exact(SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Triangle)
        .to_rgba8();

    let mut buckets: BTreeMap<[u8; 3], (u32, [u64; 3])> = BTreeMap::new();
    for px in sample.pixels() {
        let [r, g, b] = over_white(*px);
        let dist = (((255 - r as i32).pow(2) + (255 - g as i32).pow(2) + (255 - b as i32).pow(2))
            as f64)
            .sqrt();
        if dist <= WHITE_DISTANCE {
            continue;
        }
        let key = [r / BUCKET, g / BUCKET, b / BUCKET];
        let entry = buckets.entry(key).or_insert((0, [0; 3]));
        entry.0 += 1;
        entry.1[0] += r as u64;
        entry.1[1] += g as u64;
        entry.1[2] += b as u64;
    }

    // max_by_key keeps the last maximum; iterate in reverse so the lowest key wins ties
    buckets
        .values()
        .rev()
        .max_by_key(|(count, _)| *count)
        .map(|&(count, sums)| {
            let n = count as u64;
            Rgb([
                (sums[0] / n) as u8,
                (sums[1] / n) as u8,
                (sums[2] / n) as u8,
            ])
        })
        .unwrap_or(FALLBACK_COLOR)
}

/// Composite a pixel onto opaque white.
fn over_white(px: Rgba<u8>) -> [u8; 3] {
    let a = px[3] as u32;
    let blend = |c: u8| ((c as u32 * a + 255 * (255 - a)) / 255) as u8;
    [blend(px[0]), blend(px[1]), blend(px[2])]
}

/// Fill `area` with `color`, darkening linearly toward the bottom edge.
pub fn fill_gradient(canvas: &mut RgbaImage, area: Rect, color: Rgb<u8>) {
    let height = area.height.max(1) as f64;
    for dy in 0..area.height {
        let factor = 1.0 - GRADIENT_DEPTH * (dy as f64 / height);
        let shade = |c: u8| (c as f64 * factor).round() as u8;
        let px = Rgba([shade(color[0]), shade(color[1]), shade(color[2]), 255]);
        for dx in 0..area.width {
            canvas.put_pixel(area.x + dx, area.y + dy, px);
        }
    }
}
