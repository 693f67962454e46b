//! Synthetic inputs shared by unit tests.

use std::cell::Cell;

use anyhow::bail;
use common::Buffer2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::image::{Image, Mask, Placement, Rgb};
use crate::mosaic::TileSource;

pub fn solid_tile(width: usize, height: usize, color: Rgb<u8>) -> Image<u8> {
    Image::new_filled(width, height, color)
}

pub fn random_tile(width: usize, height: usize, seed: u64) -> Image<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    Image::from_fn(width, height, |_, _| {
        [
            rng.random_range(0..=255),
            rng.random_range(0..=255),
            rng.random_range(0..=255),
        ]
    })
}

pub fn full_mask(width: usize, height: usize) -> Mask {
    Buffer2::new_filled(width, height, u8::MAX)
}

pub fn widen(image: &Image<u8>) -> Image<i16> {
    image.map(|p| p.map(i16::from))
}

pub fn max_abs_diff(a: &Image<i16>, b: &Image<i16>) -> i16 {
    assert_eq!(a.size(), b.size());
    a.iter()
        .zip(b.iter())
        .flat_map(|(pa, pb)| (0..3).map(move |c| (pa[c] - pb[c]).abs()))
        .max()
        .unwrap_or(0)
}

/// In-memory tile for driver tests.
pub struct MemoryTile {
    pub name: String,
    pub placement: Placement,
    pub pixels: Image<u8>,
    pub mask_image: Option<Image<u8>>,
    /// Number of pixel loads that succeed before every further one fails.
    pub pixel_loads_allowed: Option<usize>,
    pixel_loads: Cell<usize>,
}

impl MemoryTile {
    pub fn new(name: &str, x: i32, y: i32, pixels: Image<u8>) -> Self {
        let placement = Placement::new(x, y, pixels.width(), pixels.height());
        Self {
            name: name.to_string(),
            placement,
            pixels,
            mask_image: None,
            pixel_loads_allowed: None,
            pixel_loads: Cell::new(0),
        }
    }

    pub fn with_mask_image(mut self, mask_image: Image<u8>) -> Self {
        self.mask_image = Some(mask_image);
        self
    }

    pub fn failing(self) -> Self {
        self.failing_after(0)
    }

    pub fn failing_after(mut self, successful_loads: usize) -> Self {
        self.pixel_loads_allowed = Some(successful_loads);
        self
    }
}

impl TileSource for MemoryTile {
    fn name(&self) -> &str {
        &self.name
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn load_mask_image(&self) -> anyhow::Result<Option<Image<u8>>> {
        Ok(self.mask_image.clone())
    }

    fn load_pixels(&self) -> anyhow::Result<Image<u8>> {
        let loads = self.pixel_loads.get();
        self.pixel_loads.set(loads + 1);
        if self.pixel_loads_allowed.is_some_and(|allowed| loads >= allowed) {
            bail!("decoder failed");
        }
        Ok(self.pixels.clone())
    }
}
