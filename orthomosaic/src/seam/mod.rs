//! Voronoi seam ownership with a soft margin.
//!
//! Every usable tile pixel is assigned to the tile whose placement center is
//! nearest, among the tiles that cover the pixel and mark it usable. Around
//! the frontier between the nearest and the runner-up tile, ownership ramps
//! linearly over `2 * overlap_margin` pixels.
//!
//! Ownership values of different tiles are computed independently and are not
//! normalized against each other. Where three or more tiles meet, the values
//! claiming one canvas pixel may sum to more than 255.

mod index;

#[cfg(test)]
mod tests;

use glam::{DVec2, IVec2};
use rayon::prelude::*;

use crate::config::SeamConfig;
use crate::error::{Error, Result};
use crate::image::{Mask, Placement};

use index::TileIndex;

/// One tile as seen by the seam generator.
#[derive(Debug, Clone, Copy)]
pub struct SeamTile<'a> {
    pub placement: Placement,
    /// Nonzero where the tile's pixels are usable. `None` means fully usable.
    pub usability: Option<&'a Mask>,
}

impl<'a> SeamTile<'a> {
    pub fn new(placement: Placement) -> Self {
        Self {
            placement,
            usability: None,
        }
    }

    pub fn with_usability(placement: Placement, usability: &'a Mask) -> Self {
        Self {
            placement,
            usability: Some(usability),
        }
    }

    /// Whether the tile covers canvas point `point` with a usable pixel.
    fn is_usable_at(&self, point: IVec2) -> bool {
        if !self.placement.contains(point) {
            return false;
        }
        match self.usability {
            None => true,
            Some(mask) => {
                let local = point - self.placement.offset;
                mask[(local.x as usize, local.y as usize)] != 0
            }
        }
    }
}

/// Candidate source for the per-pixel scan.
enum Candidates {
    Linear(usize),
    Grid(TileIndex),
}

impl Candidates {
    fn visit(&self, point: IVec2, mut f: impl FnMut(usize)) {
        match self {
            Candidates::Linear(count) => (0..*count).for_each(f),
            Candidates::Grid(index) => index.candidates(point).iter().for_each(|&t| f(t)),
        }
    }
}

/// Computes one ownership mask per tile, each sized like its tile.
///
/// # Arguments
/// * `tiles` - Tile placements with optional usability masks
/// * `config` - Overlap margin and candidate lookup strategy
///
/// # Returns
/// Ownership masks in the order of `tiles`. Pixels unusable in their own tile
/// are always 0.
pub fn generate_ownership_masks(
    tiles: &[SeamTile<'_>],
    config: &SeamConfig,
) -> Result<Vec<Mask>> {
    config.validate()?;
    for tile in tiles {
        if let Some(mask) = tile.usability {
            let expected = (tile.placement.width, tile.placement.height);
            if mask.size() != expected {
                return Err(Error::DimensionMismatch {
                    what: "usability mask",
                    expected,
                    actual: mask.size(),
                });
            }
        }
    }

    let candidates = if config.use_spatial_index {
        let placements: Vec<Placement> = tiles.iter().map(|t| t.placement).collect();
        Candidates::Grid(TileIndex::build(&placements))
    } else {
        Candidates::Linear(tiles.len())
    };
    let centers: Vec<DVec2> = tiles.iter().map(|t| t.placement.center()).collect();

    let masks = (0..tiles.len())
        .into_par_iter()
        .map(|tile| ownership_mask(tile, tiles, &centers, &candidates, config.overlap_margin))
        .collect();

    tracing::info!(
        tiles = tiles.len(),
        overlap_margin = config.overlap_margin,
        spatial_index = config.use_spatial_index,
        "Generated seam ownership masks"
    );
    Ok(masks)
}

fn ownership_mask(
    tile: usize,
    tiles: &[SeamTile<'_>],
    centers: &[DVec2],
    candidates: &Candidates,
    margin: f64,
) -> Mask {
    let own = &tiles[tile];
    let placement = own.placement;

    Mask::from_fn(placement.width, placement.height, |x, y| {
        if own.usability.is_some_and(|mask| mask[(x, y)] == 0) {
            return 0;
        }

        let point = placement.offset + IVec2::new(x as i32, y as i32);
        let sample = point.as_dvec2() + DVec2::splat(0.5);

        let mut nearest = tile;
        let mut nearest_dist = f64::INFINITY;
        let mut runner_up_dist = f64::INFINITY;
        candidates.visit(point, |other| {
            if !tiles[other].is_usable_at(point) {
                return;
            }
            let dist = sample.distance(centers[other]);
            if dist < nearest_dist {
                runner_up_dist = nearest_dist;
                nearest_dist = dist;
                nearest = other;
            } else if dist < runner_up_dist {
                runner_up_dist = dist;
            }
        });

        if runner_up_dist.is_infinite() {
            return u8::MAX;
        }
        let frontier = (runner_up_dist - nearest_dist) * 0.5;
        if nearest == tile {
            ramp(frontier, margin, true)
        } else {
            ramp(-frontier, margin, false)
        }
    })
}

/// Maps a signed frontier offset to ownership.
///
/// With a zero margin an exact tie on the frontier goes to the nearest tile
/// only, which is the lowest index among equidistant tiles.
fn ramp(offset: f64, margin: f64, is_nearest: bool) -> u8 {
    if margin <= 0.0 {
        return if is_nearest { u8::MAX } else { 0 };
    }
    if offset >= margin {
        u8::MAX
    } else if offset < -margin {
        0
    } else {
        ((offset + margin) / (2.0 * margin) * 255.0)
            .round()
            .clamp(0.0, 255.0) as u8
    }
}
