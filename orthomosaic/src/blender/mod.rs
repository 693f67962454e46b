//! Multi-band blending with separate weight and blend masks.
//!
//! A conventional multi-band blender weights both the pixel sum and the
//! normalizing weight sum with the same mask. Here the two are decoupled:
//!
//! - the *blend mask* gates which pixels are added into the band accumulators
//!   (sharp ownership boundaries, no double exposure);
//! - the *weight mask* feeds the weight accumulators used for normalization
//!   (wide feathering, smooth falloff).
//!
//! The lifecycle is encoded in types: [`DualMaskBlender::prepare`] consumes the
//! blender and yields a [`BlendSession`], and [`BlendSession::blend`] consumes
//! the session. Feeding before `prepare` or blending twice does not compile.

mod policy;
mod window;


use std::borrow::Cow;

use common::Buffer2;
use glam::IVec2;
use rayon::prelude::*;

use crate::config::{BlendConfig, WeightType};
use crate::error::{Error, Result};
use crate::image::{Canvas, Image, Mask, Placement, TileImage, bands_to_rgb8};
use crate::pyramid::{LaplacianPyramid, Pyramid};

pub use policy::WEIGHT_EPS;
use policy::{Fixed16, Float32, WeightPolicy};
use window::FeedWindow;

/// Number of bands actually used for a canvas: the requested count, capped so
/// the coarsest level is not smaller than one pixel, and never below one.
pub fn effective_num_bands(requested: usize, width: usize, height: usize) -> usize {
    let max_len = width.max(height);
    let ceil_log2 = if max_len <= 1 {
        0
    } else {
        (usize::BITS - (max_len - 1).leading_zeros()) as usize
    };
    requested.min(ceil_log2).max(1)
}

/// Unprepared blender holding only its configuration.
#[derive(Debug, Clone)]
pub struct DualMaskBlender {
    config: BlendConfig,
}

impl DualMaskBlender {
    pub fn new(config: BlendConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_bands(num_bands: usize, weight_type: WeightType) -> Result<Self> {
        Self::new(BlendConfig::new(num_bands, weight_type))
    }

    pub fn config(&self) -> &BlendConfig {
        &self.config
    }

    /// Fixes the band count and allocates zeroed accumulators for `canvas`.
    pub fn prepare(self, canvas: Canvas) -> Result<BlendSession> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(Error::InvalidCanvas {
                width: canvas.width,
                height: canvas.height,
            });
        }

        let num_bands = effective_num_bands(self.config.num_bands, canvas.width, canvas.height);
        let align = 1usize << num_bands;
        let working = Canvas::new(
            canvas.width.next_multiple_of(align),
            canvas.height.next_multiple_of(align),
        );

        let accumulators = match self.config.weight_type {
            WeightType::Fixed16 => {
                Accumulators::Fixed16(Accumulator::allocate(working, num_bands)?)
            }
            WeightType::Float32 => {
                Accumulators::Float32(Accumulator::allocate(working, num_bands)?)
            }
        };

        tracing::info!(
            width = canvas.width,
            height = canvas.height,
            working_width = working.width,
            working_height = working.height,
            num_bands,
            requested_bands = self.config.num_bands,
            weight_type = %self.config.weight_type,
            "Prepared blend session"
        );

        Ok(BlendSession {
            canvas,
            working,
            num_bands,
            accumulators,
            tiles_fed: 0,
        })
    }
}

/// Canvas-wide accumulators for one regime.
struct Accumulator<P: WeightPolicy> {
    bands: LaplacianPyramid,
    weights: Pyramid<P::Weight>,
}

enum Accumulators {
    Fixed16(Accumulator<Fixed16>),
    Float32(Accumulator<Float32>),
}

/// A prepared session accepting tiles.
pub struct BlendSession {
    canvas: Canvas,
    working: Canvas,
    num_bands: usize,
    accumulators: Accumulators,
    tiles_fed: usize,
}

/// Composited canvas and its validity mask, sized to the requested canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendResult {
    pub image: Image<i16>,
    /// 255 where at least one tile contributed weight, 0 elsewhere.
    pub mask: Mask,
}

impl BlendResult {
    pub fn to_rgb8(&self) -> Image<u8> {
        bands_to_rgb8(&self.image)
    }

    pub fn valid_pixels(&self) -> usize {
        self.mask.iter().filter(|&&v| v != 0).count()
    }
}

impl BlendSession {
    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Padded canvas the pyramids are built on.
    pub fn working_canvas(&self) -> Canvas {
        self.working
    }

    pub fn tiles_fed(&self) -> usize {
        self.tiles_fed
    }

    /// Adds one tile placed with its top-left corner at `offset`.
    ///
    /// `weight_mask` and `blend_mask` must match the image size. Parts of the
    /// tile outside the canvas are dropped.
    pub fn feed(
        &mut self,
        image: impl Into<TileImage>,
        weight_mask: &Mask,
        blend_mask: &Mask,
        offset: IVec2,
    ) -> Result<()> {
        let image = image.into();
        let size = image.size();
        for (what, mask) in [("weight mask", weight_mask), ("blend mask", blend_mask)] {
            if mask.size() != size {
                return Err(Error::DimensionMismatch {
                    what,
                    expected: size,
                    actual: mask.size(),
                });
            }
        }

        let Some((placement, crop)) = clip_to_canvas(offset, size, self.canvas) else {
            tracing::warn!(
                x = offset.x,
                y = offset.y,
                "Tile lies outside the canvas, skipping"
            );
            return Ok(());
        };
        if weight_mask.iter().all(|&v| v == 0) && blend_mask.iter().all(|&v| v == 0) {
            tracing::debug!(x = offset.x, y = offset.y, "Tile masks are empty, skipping");
            return Ok(());
        }

        let mut bands = image.into_bands();
        let mut weight_mask = Cow::Borrowed(weight_mask);
        let mut blend_mask = Cow::Borrowed(blend_mask);
        if let Some((cx, cy)) = crop {
            let (w, h) = (placement.width, placement.height);
            bands = bands.crop(cx, cy, w, h);
            weight_mask = Cow::Owned(weight_mask.crop(cx, cy, w, h));
            blend_mask = Cow::Owned(blend_mask.crop(cx, cy, w, h));
        }

        let window = FeedWindow::new(
            &placement,
            self.working.width,
            self.working.height,
            self.num_bands,
        );
        tracing::debug!(
            x = placement.offset.x,
            y = placement.offset.y,
            width = placement.width,
            height = placement.height,
            window_x = window.x,
            window_y = window.y,
            window_width = window.width,
            window_height = window.height,
            "Feeding tile"
        );

        let source = LaplacianPyramid::from_bands(window.pad_reflect(&bands), self.num_bands);
        drop(bands);

        match &mut self.accumulators {
            Accumulators::Fixed16(acc) => {
                acc.add(&source, &weight_mask, &blend_mask, &window, self.num_bands)
            }
            Accumulators::Float32(acc) => {
                acc.add(&source, &weight_mask, &blend_mask, &window, self.num_bands)
            }
        }
        self.tiles_fed += 1;
        Ok(())
    }

    /// Normalizes and collapses the accumulators. Terminal.
    pub fn blend(self) -> BlendResult {
        let result = match self.accumulators {
            Accumulators::Fixed16(acc) => acc.finish(self.canvas),
            Accumulators::Float32(acc) => acc.finish(self.canvas),
        };
        tracing::info!(
            tiles_fed = self.tiles_fed,
            valid_pixels = result.valid_pixels(),
            "Blend finished"
        );
        result
    }
}

/// Intersects the tile with the canvas. Returns the clipped placement and, if
/// clipping happened, the crop origin inside the tile.
fn clip_to_canvas(
    offset: IVec2,
    (width, height): (usize, usize),
    canvas: Canvas,
) -> Option<(Placement, Option<(usize, usize)>)> {
    let x0 = (offset.x as i64).max(0);
    let y0 = (offset.y as i64).max(0);
    let x1 = (offset.x as i64 + width as i64).min(canvas.width as i64);
    let y1 = (offset.y as i64 + height as i64).min(canvas.height as i64);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let placement = Placement::new(
        x0 as i32,
        y0 as i32,
        (x1 - x0) as usize,
        (y1 - y0) as usize,
    );
    let crop = (placement.width != width || placement.height != height).then(|| {
        (
            (x0 - offset.x as i64) as usize,
            (y0 - offset.y as i64) as usize,
        )
    });
    Some((placement, crop))
}

impl<P: WeightPolicy> Accumulator<P> {
    fn allocate(working: Canvas, num_bands: usize) -> Result<Self> {
        let bands =
            Pyramid::try_zeroed(working.width, working.height, num_bands).map_err(|_| {
                Error::Allocation {
                    what: "band pyramid",
                    width: working.width,
                    height: working.height,
                }
            })?;
        let weights =
            Pyramid::try_zeroed(working.width, working.height, num_bands).map_err(|_| {
                Error::Allocation {
                    what: "weight pyramid",
                    width: working.width,
                    height: working.height,
                }
            })?;
        Ok(Self { bands, weights })
    }

    fn mask_pyramid(mask: &Mask, window: &FeedWindow, num_bands: usize) -> Pyramid<P::Weight> {
        let weights: Buffer2<P::Weight> = mask.map(|&v| P::from_mask(v));
        Pyramid::gaussian(window.pad_zero(&weights), num_bands)
    }

    fn add(
        &mut self,
        source: &LaplacianPyramid,
        weight_mask: &Mask,
        blend_mask: &Mask,
        window: &FeedWindow,
        num_bands: usize,
    ) {
        let weight_pyr = Self::mask_pyramid(weight_mask, window, num_bands);
        let blend_pyr = Self::mask_pyramid(blend_mask, window, num_bands);

        for level in 0..=num_bands {
            let (x, y, width, height) = window.at_level(level);
            let src = source.level(level);
            let weight = weight_pyr.level(level);
            let blend = blend_pyr.level(level);
            debug_assert_eq!(src.size(), (width, height));
            debug_assert_eq!(weight.size(), (width, height));

            let dst_bands = self.bands.level_mut(level);
            let stride = dst_bands.width();
            let band_rows = &mut dst_bands.pixels_mut()[y * stride..(y + height) * stride];
            let weight_rows =
                &mut self.weights.level_mut(level).pixels_mut()[y * stride..(y + height) * stride];

            band_rows
                .par_chunks_mut(stride)
                .zip(weight_rows.par_chunks_mut(stride))
                .enumerate()
                .for_each(|(row, (dst_row, dst_weight_row))| {
                    let dst_row = &mut dst_row[x..x + width];
                    let dst_weight_row = &mut dst_weight_row[x..x + width];
                    let src_row = src.row(row);
                    let blend_row = blend.row(row);
                    let weight_row = weight.row(row);
                    for i in 0..width {
                        let b = blend_row[i];
                        for c in 0..3 {
                            dst_row[i][c] =
                                dst_row[i][c].saturating_add(P::apply(src_row[i][c], b));
                        }
                        dst_weight_row[i] = P::accumulate(dst_weight_row[i], weight_row[i]);
                    }
                });
        }
    }

    fn finish(self, canvas: Canvas) -> BlendResult {
        let Self { mut bands, weights } = self;

        for (band, weight) in bands.levels_mut().iter_mut().zip(weights.levels()) {
            band.pixels_mut()
                .par_iter_mut()
                .zip(weight.pixels().par_iter())
                .for_each(|(pixel, &total)| {
                    *pixel = pixel.map(|c| P::normalize(c, total));
                });
        }

        let restored = bands.reconstruct();
        let base_weights = weights.level(0);

        let mut image = restored.crop(0, 0, canvas.width, canvas.height);
        let mask = Buffer2::from_fn(canvas.width, canvas.height, |x, y| {
            if P::is_valid(base_weights[(x, y)]) {
                u8::MAX
            } else {
                0
            }
        });
        for (pixel, &valid) in image.iter_mut().zip(mask.iter()) {
            if valid == 0 {
                *pixel = [0; 3];
            }
        }

        BlendResult { image, mask }
    }
}
