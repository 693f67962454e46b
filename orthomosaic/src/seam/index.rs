//! Uniform grid over tile footprints for candidate lookup.

use glam::IVec2;

use crate::image::Placement;

/// Buckets tiles by the grid cells their footprints touch.
///
/// Every bucket lists tile indices in ascending order, so iterating a bucket
/// visits candidates in the same order as a linear scan would.
#[derive(Debug)]
pub(crate) struct TileIndex {
    origin: IVec2,
    cell_size: i64,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<usize>>,
}

impl TileIndex {
    /// Builds the grid with cells as large as the mean tile extent.
    pub fn build(placements: &[Placement]) -> Self {
        if placements.is_empty() {
            return Self {
                origin: IVec2::ZERO,
                cell_size: 1,
                cols: 0,
                rows: 0,
                cells: Vec::new(),
            };
        }

        let origin = placements
            .iter()
            .map(|p| p.offset)
            .reduce(IVec2::min)
            .unwrap_or(IVec2::ZERO);
        let end = placements
            .iter()
            .map(Placement::bottom_right)
            .reduce(IVec2::max)
            .unwrap_or(IVec2::ZERO);

        let total_extent: usize = placements.iter().map(|p| p.width.max(p.height)).sum();
        let cell_size = (total_extent / placements.len()).max(1) as i64;
        let cols = ((end.x as i64 - origin.x as i64).max(1) as u64).div_ceil(cell_size as u64);
        let rows = ((end.y as i64 - origin.y as i64).max(1) as u64).div_ceil(cell_size as u64);

        let mut index = Self {
            origin,
            cell_size,
            cols: cols as usize,
            rows: rows as usize,
            cells: vec![Vec::new(); (cols * rows) as usize],
        };

        for (tile, placement) in placements.iter().enumerate() {
            if placement.width == 0 || placement.height == 0 {
                continue;
            }
            let (c0, r0) = index.cell_of(placement.offset);
            let (c1, r1) = index.cell_of(placement.bottom_right() - IVec2::ONE);
            for row in r0..=r1 {
                for col in c0..=c1 {
                    index.cells[row * index.cols + col].push(tile);
                }
            }
        }

        tracing::debug!(
            tiles = placements.len(),
            cols = index.cols,
            rows = index.rows,
            cell_size,
            "Built seam tile index"
        );
        index
    }

    /// Cell coordinates of a point inside the grid bounds.
    fn cell_of(&self, point: IVec2) -> (usize, usize) {
        let col = (point.x as i64 - self.origin.x as i64) / self.cell_size;
        let row = (point.y as i64 - self.origin.y as i64) / self.cell_size;
        (col as usize, row as usize)
    }

    /// Tiles whose footprint may contain `point`, in ascending index order.
    pub fn candidates(&self, point: IVec2) -> &[usize] {
        let dx = point.x as i64 - self.origin.x as i64;
        let dy = point.y as i64 - self.origin.y as i64;
        if dx < 0 || dy < 0 {
            return &[];
        }
        let (col, row) = ((dx / self.cell_size) as usize, (dy / self.cell_size) as usize);
        if col >= self.cols || row >= self.rows {
            return &[];
        }
        &self.cells[row * self.cols + col]
    }
}
