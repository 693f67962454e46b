//! Multi-resolution band decomposition.
//!
//! A pyramid with `num_bands` bands has `num_bands + 1` levels. Level 0 is the
//! input resolution and every following level is half the size of its
//! predecessor, rounded up. Gaussian pyramids hold successively blurred copies;
//! Laplacian pyramids hold band-pass residuals with the low-pass base in the
//! last level.

mod kernel;


use std::collections::TryReserveError;

use common::Buffer2;

use crate::image::{Image, Rgb, TileImage};

pub use kernel::{Sample, pyr_down, pyr_up};
pub(crate) use kernel::reflect;

/// Fixed-length arena of level buffers, finest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Pyramid<T> {
    levels: Vec<Buffer2<T>>,
}

/// Band-pass residuals plus low-pass base, in the signed band representation.
pub type LaplacianPyramid = Pyramid<Rgb<i16>>;

/// Size of level `level` for a base of `width` x `height`.
pub fn level_size(width: usize, height: usize, level: usize) -> (usize, usize) {
    (0..level).fold((width, height), |(w, h), _| (w.div_ceil(2), h.div_ceil(2)))
}

impl<T> Pyramid<T> {
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, index: usize) -> &Buffer2<T> {
        &self.levels[index]
    }

    pub fn level_mut(&mut self, index: usize) -> &mut Buffer2<T> {
        &mut self.levels[index]
    }

    pub fn levels(&self) -> &[Buffer2<T>] {
        &self.levels
    }

    pub fn levels_mut(&mut self) -> &mut [Buffer2<T>] {
        &mut self.levels
    }
}

impl<T: Default + Clone> Pyramid<T> {
    /// Allocates `num_bands + 1` zeroed levels for a `width` x `height` base.
    pub fn try_zeroed(
        width: usize,
        height: usize,
        num_bands: usize,
    ) -> Result<Self, TryReserveError> {
        let levels = (0..=num_bands)
            .map(|level| {
                let (w, h) = level_size(width, height, level);
                Buffer2::try_new_default(w, h)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { levels })
    }
}

impl<T: Sample> Pyramid<T> {
    /// Successive blur-and-halve copies of `base`, no residuals.
    pub fn gaussian(base: Buffer2<T>, num_bands: usize) -> Self {
        let mut levels = Vec::with_capacity(num_bands + 1);
        let mut current = base;
        for _ in 0..num_bands {
            let next = pyr_down(&current);
            levels.push(current);
            current = next;
        }
        levels.push(current);
        Self { levels }
    }
}

impl LaplacianPyramid {
    /// Decomposes `image` into `num_bands` residual levels plus a base.
    pub fn decompose(image: TileImage, num_bands: usize) -> Self {
        Self::from_bands(image.into_bands(), num_bands)
    }

    /// Same as [`LaplacianPyramid::decompose`] for input already in band form.
    pub fn from_bands(image: Image<i16>, num_bands: usize) -> Self {
        let mut pyramid = Self::gaussian(image, num_bands);
        // Ascending order: level i + 1 is still the Gaussian level when level i
        // subtracts its expansion.
        for i in 0..num_bands {
            let (width, height) = pyramid.levels[i].size();
            let expanded = pyr_up(&pyramid.levels[i + 1], width, height);
            zip_channels(&mut pyramid.levels[i], &expanded, |a, b| a - b);
        }
        pyramid
    }

    /// Collapses the pyramid back into a level-0 image.
    pub fn reconstruct(self) -> Image<i16> {
        let mut levels = self.levels;
        let Some(mut current) = levels.pop() else {
            return Buffer2::new_default(0, 0);
        };
        while let Some(mut finer) = levels.pop() {
            let (width, height) = finer.size();
            let expanded = pyr_up(&current, width, height);
            zip_channels(&mut finer, &expanded, |a, b| a + b);
            current = finer;
        }
        current
    }
}

fn zip_channels(dst: &mut Image<i16>, src: &Image<i16>, op: impl Fn(i32, i32) -> i32) {
    debug_assert_eq!(dst.size(), src.size());
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        for c in 0..3 {
            d[c] = op(d[c] as i32, s[c] as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        }
    }
}
