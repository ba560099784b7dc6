//! Pure geometry for page layout.
//!
//! All functions here are pure and testable without any I/O or images.

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Whether the two rectangles share any pixel.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Split into a `rows × cols` grid, row-major.
    ///
    /// Cell boundaries sit at `origin + i * extent / n`, so the cells tile the
    /// rectangle exactly: no gaps, no overlap, leftover pixels spread across
    /// cells instead of piling up in the last one.
    pub fn grid(&self, rows: u32, cols: u32) -> Vec<Rect> {
        let xs = split_extent(self.x, self.width, cols);
        let ys = split_extent(self.y, self.height, rows);
        ys.iter()
            .flat_map(|&(y, h)| xs.iter().map(move |&(x, w)| Rect::new(x, y, w, h)))
            .collect()
    }
}

/// Divide `[origin, origin + extent)` into `parts` contiguous spans.
pub fn split_extent(origin: u32, extent: u32, parts: u32) -> Vec<(u32, u32)> {
    let edge = |i: u32| origin + (extent as u64 * i as u64 / parts as u64) as u32;
    (0..parts).map(|i| (edge(i), edge(i + 1) - edge(i))).collect()
}

/// Largest size with the source aspect ratio that fits inside `bounds`.
///
/// Scales up or down. Never returns a zero dimension.
///
/// ```
/// # use sticker_sheets::imaging::fit_within;
/// // Wide sticker in a 400x320 slot: width-bound
/// assert_eq!(fit_within((800, 400), (400, 320)), (400, 200));
/// // Small square sticker scales up to the slot height
/// assert_eq!(fit_within((100, 100), (400, 320)), (320, 320));
/// ```
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;
    if src_w == 0 || src_h == 0 {
        return (max_w.max(1), max_h.max(1));
    }
    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}

/// Offset that centers `inner` inside `outer` (clamped at zero).
pub fn center_offset(inner: (u32, u32), outer: (u32, u32)) -> (u32, u32) {
    (
        outer.0.saturating_sub(inner.0) / 2,
        outer.1.saturating_sub(inner.1) / 2,
    )
}

/// Source positions for `slots` consecutive slots starting at `start`,
/// wrapping modulo `available`.
///
/// Returns an empty list when nothing is available.
pub fn cyclic_indices(start: usize, slots: usize, available: usize) -> Vec<usize> {
    if available == 0 {
        return Vec::new();
    }
    (start..start + slots).map(|i| i % available).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_extent_even() {
        assert_eq!(
            split_extent(0, 1200, 3),
            vec![(0, 400), (400, 400), (800, 400)]
        );
    }

    #[test]
    fn split_extent_spreads_remainder() {
        let spans = split_extent(10, 100, 3);
        assert_eq!(spans, vec![(10, 33), (43, 33), (76, 34)]);
        let total: u32 = spans.iter().map(|&(_, w)| w).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn grid_is_row_major() {
        let cells = Rect::new(0, 0, 1200, 1600).grid(5, 3);
        assert_eq!(cells.len(), 15);
        assert_eq!(cells[0], Rect::new(0, 0, 400, 320));
        assert_eq!(cells[1], Rect::new(400, 0, 400, 320));
        assert_eq!(cells[3], Rect::new(0, 320, 400, 320));
        assert_eq!(cells[14], Rect::new(800, 1280, 400, 320));
    }

    #[test]
    fn grid_cells_tile_without_overlap() {
        let area = Rect::new(7, 13, 301, 457);
        let cells = area.grid(5, 3);
        for (i, a) in cells.iter().enumerate() {
            assert!(area.contains(a));
            for b in &cells[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
        let covered: u64 = cells
            .iter()
            .map(|c| c.width as u64 * c.height as u64)
            .sum();
        assert_eq!(covered, 301 * 457);
    }

    #[test]
    fn overlap_and_containment() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(a.overlaps(&Rect::new(9, 9, 5, 5)));
        assert!(!a.overlaps(&Rect::new(10, 0, 5, 5)));
        assert!(a.contains(&Rect::new(2, 2, 8, 8)));
        assert!(!a.contains(&Rect::new(2, 2, 9, 8)));
    }

    #[test]
    fn fit_within_tall_source() {
        assert_eq!(fit_within((200, 800), (400, 320)), (80, 320));
    }

    #[test]
    fn fit_within_exact_aspect() {
        assert_eq!(fit_within((800, 640), (400, 320)), (400, 320));
    }

    #[test]
    fn fit_within_degenerate_source() {
        assert_eq!(fit_within((0, 10), (40, 30)), (40, 30));
    }

    #[test]
    fn fit_within_never_zero() {
        assert_eq!(fit_within((10000, 1), (400, 320)), (400, 1));
    }

    #[test]
    fn center_offset_letterbox() {
        assert_eq!(center_offset((400, 200), (400, 320)), (0, 60));
        assert_eq!(center_offset((500, 500), (400, 320)), (0, 0));
    }

    #[test]
    fn cyclic_indices_wraps() {
        assert_eq!(
            cyclic_indices(15, 15, 5),
            vec![0, 1, 2, 3, 4, 0, 1, 2, 3, 4, 0, 1, 2, 3, 4]
        );
        assert_eq!(cyclic_indices(0, 3, 10), vec![0, 1, 2]);
        assert_eq!(cyclic_indices(9, 3, 10), vec![9, 0, 1]);
        assert!(cyclic_indices(0, 3, 0).is_empty());
    }
}
