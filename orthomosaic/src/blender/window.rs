use common::Buffer2;

use crate::image::{Image, Placement};
use crate::pyramid::reflect;

/// Region of the padded canvas decomposed for one tile.
///
/// The tile rectangle is grown by `3 * 2^bands` pixels, clipped to the canvas
/// and snapped outward to multiples of `2^bands`, so every pyramid level of the
/// window maps onto whole accumulator pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FeedWindow {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    /// Tile position inside the window.
    pub left: usize,
    pub top: usize,
}

impl FeedWindow {
    /// `tile` must lie inside the `canvas_width` x `canvas_height` working canvas,
    /// whose dimensions are multiples of `2^num_bands`.
    pub fn new(
        tile: &Placement,
        canvas_width: usize,
        canvas_height: usize,
        num_bands: usize,
    ) -> Self {
        let (x, width, left) = snap_axis(
            tile.offset.x as i64,
            tile.width as i64,
            canvas_width as i64,
            num_bands,
        );
        let (y, height, top) = snap_axis(
            tile.offset.y as i64,
            tile.height as i64,
            canvas_height as i64,
            num_bands,
        );
        Self {
            x,
            y,
            width,
            height,
            left,
            top,
        }
    }

    /// Window origin and size at pyramid level `level`.
    pub fn at_level(&self, level: usize) -> (usize, usize, usize, usize) {
        (
            self.x >> level,
            self.y >> level,
            self.width >> level,
            self.height >> level,
        )
    }

    /// Mirrors tile pixels outward to fill the window.
    pub fn pad_reflect(&self, tile: &Image<i16>) -> Image<i16> {
        let (w, h) = tile.size();
        Buffer2::from_fn(self.width, self.height, |x, y| {
            let sx = reflect(x as isize - self.left as isize, w);
            let sy = reflect(y as isize - self.top as isize, h);
            tile[(sx, sy)]
        })
    }

    /// Places the mask in the window; everything outside the tile is zero.
    pub fn pad_zero<T: Copy + Default>(&self, mask: &Buffer2<T>) -> Buffer2<T> {
        let (w, h) = mask.size();
        let mut out = Buffer2::new_default(self.width, self.height);
        for y in 0..h {
            let dst = &mut out.row_mut(self.top + y)[self.left..self.left + w];
            dst.copy_from_slice(mask.row(y));
        }
        out
    }
}

fn snap_axis(start: i64, len: i64, canvas: i64, num_bands: usize) -> (usize, usize, usize) {
    let align = 1i64 << num_bands;
    let gap = 3 * align;

    let lo = (start - gap).max(0);
    let hi = (start + len + gap).min(canvas);

    let mut lo = (lo >> num_bands) << num_bands;
    let size = (hi - lo + align - 1) / align * align;
    let mut hi = lo + size;

    let overflow = (hi - canvas).max(0);
    lo -= overflow;
    hi -= overflow;

    debug_assert!(lo >= 0 && lo <= start && start + len <= hi);
    (lo as usize, (hi - lo) as usize, (start - lo) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_grows_and_aligns() {
        // 3 bands: align 8, gap 24.
        let tile = Placement::new(50, 40, 30, 20);
        let window = FeedWindow::new(&tile, 256, 128, 3);
        assert_eq!(window.x, 24);
        assert_eq!(window.y, 16);
        assert_eq!(window.width, 80);
        assert_eq!(window.height, 72);
        assert_eq!((window.left, window.top), (26, 24));
        assert_eq!(window.x % 8, 0);
        assert_eq!(window.width % 8, 0);
    }

    #[test]
    fn test_window_clips_to_canvas() {
        let tile = Placement::new(0, 100, 64, 28);
        let window = FeedWindow::new(&tile, 64, 128, 3);
        assert_eq!((window.x, window.width), (0, 64));
        assert_eq!((window.y, window.height), (72, 56));
        assert_eq!(window.y + window.height, 128);
        assert_eq!(window.top, 28);
    }

    #[test]
    fn test_window_levels_halve() {
        let tile = Placement::new(50, 40, 30, 20);
        let window = FeedWindow::new(&tile, 256, 128, 3);
        assert_eq!(window.at_level(0), (24, 16, 80, 72));
        assert_eq!(window.at_level(1), (12, 8, 40, 36));
        assert_eq!(window.at_level(3), (3, 2, 10, 9));
    }

    #[test]
    fn test_pad_reflect_mirrors_edges() {
        let tile = Image::from_fn(2, 1, |x, _| [x as i16 + 1; 3]);
        let window = FeedWindow {
            x: 0,
            y: 0,
            width: 6,
            height: 2,
            left: 2,
            top: 0,
        };
        let padded = window.pad_reflect(&tile);
        let row: Vec<i16> = padded.row(0).iter().map(|p| p[0]).collect();
        assert_eq!(row, vec![2, 1, 1, 2, 2, 1]);
        assert_eq!(padded.row(1), padded.row(0));
    }

    #[test]
    fn test_pad_zero_keeps_outside_empty() {
        let mask = Buffer2::new_filled(2, 2, 255u8);
        let window = FeedWindow {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
            left: 1,
            top: 2,
        };
        let padded = window.pad_zero(&mask);
        assert_eq!(padded.iter().filter(|&&v| v == 255).count(), 4);
        assert_eq!(padded[(1, 2)], 255);
        assert_eq!(padded[(2, 3)], 255);
        assert_eq!(padded[(0, 2)], 0);
        assert_eq!(padded[(1, 1)], 0);
    }
}
