//! End-to-end mosaic composition.
//!
//! [`compose`] runs the whole pipeline over a set of lazily loaded tiles:
//!
//! 1. derive every tile's usability mask and collect coverage totals;
//! 2. generate seam ownership for all tiles at once;
//! 3. feed tiles to the blender one at a time, each with a coverage-derived
//!    weight mask and its ownership as the blend mask;
//! 4. blend.
//!
//! Tile pixels are held only while their tile is being fed.

mod weights;


use anyhow::Context;

use crate::blender::{BlendResult, DualMaskBlender};
use crate::config::MosaicConfig;
use crate::coverage::{
    KEY_COLOR, fill_excluded_with_mean, usability_from_key_color, usability_from_mask_image,
};
use crate::error::Error;
use crate::feather::feather_with;
use crate::image::{Canvas, Image, Mask, Placement};
use crate::seam::{SeamTile, generate_ownership_masks};

use weights::WeightLedger;

/// A tile the pipeline can load on demand.
pub trait TileSource {
    /// Name used in logs and error context.
    fn name(&self) -> &str;

    /// Position and size on the canvas.
    fn placement(&self) -> Placement;

    /// Companion mask image, dark pixels usable. `None` if the tile has none.
    fn load_mask_image(&self) -> anyhow::Result<Option<Image<u8>>>;

    /// Decoded tile pixels.
    fn load_pixels(&self) -> anyhow::Result<Image<u8>>;
}

/// Result of [`compose`].
#[derive(Debug)]
pub struct MosaicOutput {
    pub result: BlendResult,
    pub tiles_fed: usize,
    pub tiles_skipped: usize,
}

/// Tile that passed usability checks.
struct PreparedTile {
    index: usize,
    placement: Placement,
    usability: Mask,
    /// Feathered usability, kept between passes so each tile is feathered once.
    coverage: Mask,
}

/// Composites `tiles` onto `canvas`.
///
/// Tiles that fail to load, or have no usable pixel, are skipped with a
/// warning. Size mismatches between a tile, its placement and its mask image
/// are errors. So is a tile that loaded during preparation but fails when it
/// is fed, since its neighbors have already ceded their overlap to it.
pub fn compose<S: TileSource>(
    tiles: &[S],
    canvas: Canvas,
    config: &MosaicConfig,
) -> anyhow::Result<MosaicOutput> {
    config.validate()?;
    let mut session = DualMaskBlender::new(config.blend)?.prepare(canvas)?;
    let mut ledger = WeightLedger::try_new(canvas)?;

    tracing::info!(
        tiles = tiles.len(),
        width = canvas.width,
        height = canvas.height,
        num_bands = session.num_bands(),
        "Composing mosaic"
    );

    let mut prepared = Vec::with_capacity(tiles.len());
    for (index, tile) in tiles.iter().enumerate() {
        let Some(usability) = load_usability(tile)? else {
            continue;
        };
        if usability.iter().all(|&v| v == 0) {
            tracing::warn!(tile = tile.name(), "Tile has no usable pixels, skipping");
            continue;
        }
        let placement = tile.placement();
        let coverage = feather_with(&usability, &config.feather);
        ledger.add_total(&placement, &coverage);
        prepared.push(PreparedTile {
            index,
            placement,
            usability,
            coverage,
        });
    }

    let seam_tiles: Vec<SeamTile<'_>> = prepared
        .iter()
        .map(|t| SeamTile::with_usability(t.placement, &t.usability))
        .collect();
    let ownership = generate_ownership_masks(&seam_tiles, &config.seam)?;
    drop(seam_tiles);

    for (tile, blend_mask) in prepared.iter().zip(&ownership) {
        let source = &tiles[tile.index];
        let mut pixels = source.load_pixels().with_context(|| {
            format!("Tile '{}' failed to load after seams were placed", source.name())
        })?;
        check_size(source, "tile pixels", pixels.size())?;
        if fill_excluded_with_mean(&mut pixels, &tile.usability).is_none() {
            continue;
        }

        let weight_mask = ledger.weight_mask(&tile.placement, &tile.coverage, blend_mask);
        ledger.commit(&tile.placement, &tile.coverage);

        tracing::debug!(tile = source.name(), "Feeding tile");
        session
            .feed(pixels, &weight_mask, blend_mask, tile.placement.offset)
            .with_context(|| format!("Failed to feed tile '{}'", source.name()))?;
    }

    let tiles_fed = session.tiles_fed();
    let result = session.blend();
    if tiles_fed == 0 {
        tracing::warn!("No tile contributed to the mosaic");
    }
    tracing::info!(
        tiles_fed,
        tiles_skipped = tiles.len() - tiles_fed,
        "Mosaic composed"
    );

    Ok(MosaicOutput {
        result,
        tiles_fed,
        tiles_skipped: tiles.len() - tiles_fed,
    })
}

/// Usability from the mask image, or from the key color when there is none.
///
/// The pixels are decoded here even when a mask image exists, so a tile whose
/// pixels cannot be loaded is dropped before it takes part in seam placement.
/// Returns `None` for tiles that should be skipped.
fn load_usability<S: TileSource>(tile: &S) -> anyhow::Result<Option<Mask>> {
    let placement = tile.placement();
    if placement.width == 0 || placement.height == 0 {
        tracing::warn!(tile = tile.name(), "Tile is empty, skipping");
        return Ok(None);
    }

    let mask_image = match tile.load_mask_image() {
        Ok(mask_image) => mask_image,
        Err(err) => {
            tracing::warn!("Failed to load mask of tile '{}', skipping: {:#}", tile.name(), err);
            return Ok(None);
        }
    };
    let pixels = match tile.load_pixels() {
        Ok(pixels) => pixels,
        Err(err) => {
            tracing::warn!("Failed to load tile '{}', skipping: {:#}", tile.name(), err);
            return Ok(None);
        }
    };
    check_size(tile, "tile pixels", pixels.size())?;

    match mask_image {
        Some(mask_image) => {
            check_size(tile, "mask image", mask_image.size())?;
            Ok(Some(usability_from_mask_image(&mask_image)))
        }
        None => Ok(Some(usability_from_key_color(&pixels, KEY_COLOR))),
    }
}

fn check_size<S: TileSource>(
    tile: &S,
    what: &'static str,
    actual: (usize, usize),
) -> anyhow::Result<()> {
    let placement = tile.placement();
    let expected = (placement.width, placement.height);
    if actual != expected {
        return Err(Error::DimensionMismatch {
            what,
            expected,
            actual,
        })
        .with_context(|| format!("Tile '{}' does not match its placement", tile.name()));
    }
    Ok(())
}
