//! Canvas-wide split of weight between overlapping tiles.

use std::ops::Range;

use common::Buffer2;

use crate::error::{Error, Result};
use crate::image::{Canvas, Mask, Placement};

/// Shares 255 units of weight per canvas pixel among the tiles covering it,
/// in proportion to their feathered coverage.
///
/// Totals are collected for every tile first. Tiles are then committed in
/// feed order, and each one receives the difference of the floored cumulative
/// shares before and after it, so the shares of all tiles covering a pixel
/// add up to exactly 255.
pub(crate) struct WeightLedger {
    canvas: Canvas,
    total: Buffer2<u32>,
    committed: Buffer2<u32>,
}

impl WeightLedger {
    pub fn try_new(canvas: Canvas) -> Result<Self> {
        let allocate = || {
            Buffer2::try_new_default(canvas.width, canvas.height).map_err(|_| Error::Allocation {
                what: "coverage totals",
                width: canvas.width,
                height: canvas.height,
            })
        };
        Ok(Self {
            canvas,
            total: allocate()?,
            committed: allocate()?,
        })
    }

    pub fn add_total(&mut self, placement: &Placement, coverage: &Mask) {
        accumulate(&mut self.total, self.canvas, placement, coverage);
    }

    pub fn commit(&mut self, placement: &Placement, coverage: &Mask) {
        accumulate(&mut self.committed, self.canvas, placement, coverage);
    }

    /// Weight mask for the next tile in feed order.
    ///
    /// Where no tile has any coverage, or off the canvas, the tile's ownership
    /// is used instead.
    pub fn weight_mask(&self, placement: &Placement, coverage: &Mask, ownership: &Mask) -> Mask {
        let (xs, ys) = visible(placement, self.canvas);
        Mask::from_fn(placement.width, placement.height, |x, y| {
            if !xs.contains(&x) || !ys.contains(&y) {
                return ownership[(x, y)];
            }
            let canvas_xy = to_canvas(placement, x, y);
            let total = self.total[canvas_xy] as u64;
            if total == 0 {
                return ownership[(x, y)];
            }
            let before = self.committed[canvas_xy] as u64;
            let after = before + coverage[(x, y)] as u64;
            (after * 255 / total - before * 255 / total) as u8
        })
    }
}

fn accumulate(
    target: &mut Buffer2<u32>,
    canvas: Canvas,
    placement: &Placement,
    coverage: &Mask,
) {
    let (xs, ys) = visible(placement, canvas);
    if xs.is_empty() {
        return;
    }
    for y in ys {
        let (cx, cy) = to_canvas(placement, xs.start, y);
        let row = &mut target.row_mut(cy)[cx..cx + xs.len()];
        for (dst, &c) in row.iter_mut().zip(&coverage.row(y)[xs.clone()]) {
            *dst += c as u32;
        }
    }
}

fn to_canvas(placement: &Placement, x: usize, y: usize) -> (usize, usize) {
    (
        (placement.offset.x as i64 + x as i64) as usize,
        (placement.offset.y as i64 + y as i64) as usize,
    )
}

/// Tile-local column and row ranges that land on the canvas.
fn visible(placement: &Placement, canvas: Canvas) -> (Range<usize>, Range<usize>) {
    let axis = |offset: i32, len: usize, limit: usize| {
        let start = (-(offset as i64)).clamp(0, len as i64) as usize;
        let end = (limit as i64 - offset as i64).clamp(0, len as i64) as usize;
        start..end.max(start)
    };
    (
        axis(placement.offset.x, placement.width, canvas.width),
        axis(placement.offset.y, placement.height, canvas.height),
    )
}
