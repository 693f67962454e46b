//! 5-tap binomial resampling shared by every pyramid in the crate.
//!
//! `pyr_down` blurs with `[1 4 6 4 1] / 16` in both directions and keeps every
//! second sample. `pyr_up` inserts zeros between samples and applies the same
//! kernel scaled by 4, so a constant image stays constant in both directions.
//! Borders use reflect-101 (`gfedcb|abcdefgh|gfedcba`).

use common::Buffer2;
use rayon::prelude::*;

use crate::image::Rgb;

const KERNEL: [i32; 5] = [1, 4, 6, 4, 1];

/// Total 2D gain of `pyr_down` (16 per direction).
const DOWN_SHIFT: u32 = 8;
/// Total 2D gain of `pyr_up` (8 per direction after zero insertion).
const UP_SHIFT: u32 = 6;

/// A value that can be filtered by the pyramid kernel.
///
/// Integer samples accumulate in `i32` and round half up when narrowed, so
/// the same input always produces the same output. That determinism is what
/// makes Laplacian reconstruction exact.
pub trait Sample: Copy + Default + Send + Sync {
    type Acc: Copy + Send + Sync;

    fn zero() -> Self::Acc;
    fn widen(self) -> Self::Acc;
    fn mul_add(acc: Self::Acc, value: Self::Acc, weight: i32) -> Self::Acc;
    fn narrow(acc: Self::Acc, shift: u32) -> Self;
}

#[inline]
fn round_shift(acc: i32, shift: u32) -> i16 {
    ((acc + (1 << (shift - 1))) >> shift).clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

impl Sample for i16 {
    type Acc = i32;

    #[inline]
    fn zero() -> i32 {
        0
    }

    #[inline]
    fn widen(self) -> i32 {
        self as i32
    }

    #[inline]
    fn mul_add(acc: i32, value: i32, weight: i32) -> i32 {
        acc + value * weight
    }

    #[inline]
    fn narrow(acc: i32, shift: u32) -> i16 {
        round_shift(acc, shift)
    }
}

impl Sample for Rgb<i16> {
    type Acc = [i32; 3];

    #[inline]
    fn zero() -> [i32; 3] {
        [0; 3]
    }

    #[inline]
    fn widen(self) -> [i32; 3] {
        self.map(|c| c as i32)
    }

    #[inline]
    fn mul_add(acc: [i32; 3], value: [i32; 3], weight: i32) -> [i32; 3] {
        [
            acc[0] + value[0] * weight,
            acc[1] + value[1] * weight,
            acc[2] + value[2] * weight,
        ]
    }

    #[inline]
    fn narrow(acc: [i32; 3], shift: u32) -> Rgb<i16> {
        acc.map(|c| round_shift(c, shift))
    }
}

impl Sample for f32 {
    type Acc = f32;

    #[inline]
    fn zero() -> f32 {
        0.0
    }

    #[inline]
    fn widen(self) -> f32 {
        self
    }

    #[inline]
    fn mul_add(acc: f32, value: f32, weight: i32) -> f32 {
        acc + value * weight as f32
    }

    #[inline]
    fn narrow(acc: f32, shift: u32) -> f32 {
        acc / (1u32 << shift) as f32
    }
}

/// Reflect-101 border: the edge sample is not repeated.
#[inline]
pub(crate) fn reflect_101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * n as isize - 2;
    let m = i.rem_euclid(period);
    if m >= n as isize {
        (period - m) as usize
    } else {
        m as usize
    }
}

/// Mirror border with the edge sample repeated (`cba|abcd|dcb`).
#[inline]
pub(crate) fn reflect(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = i.rem_euclid(period);
    if m >= n as isize {
        (period - 1 - m) as usize
    } else {
        m as usize
    }
}

/// Source index and weight of every tap contributing to each output position.
type TapTable = Vec<[(usize, i32); 5]>;

fn down_taps(src_len: usize, dst_len: usize) -> TapTable {
    (0..dst_len)
        .map(|d| {
            std::array::from_fn(|t| {
                let i = 2 * d as isize + t as isize - 2;
                (reflect_101(i, src_len), KERNEL[t])
            })
        })
        .collect()
}

/// Taps over the zero-stuffed grid of length `2 * src_len`; odd grid
/// positions carry zeros and get weight 0.
fn up_taps(src_len: usize, dst_len: usize) -> TapTable {
    let grid_len = 2 * src_len;
    (0..dst_len)
        .map(|d| {
            std::array::from_fn(|t| {
                let j = reflect_101(d as isize + t as isize - 2, grid_len);
                if j % 2 == 0 {
                    (j / 2, KERNEL[t])
                } else {
                    (0, 0)
                }
            })
        })
        .collect()
}

fn filter_separable<T: Sample>(
    src: &Buffer2<T>,
    dst_width: usize,
    dst_height: usize,
    x_taps: &TapTable,
    y_taps: &TapTable,
    shift: u32,
) -> Buffer2<T> {
    let src_height = src.height();

    // Horizontal pass keeps the source row count.
    let mut tmp = vec![T::zero(); dst_width * src_height];
    tmp.par_chunks_mut(dst_width.max(1))
        .zip(src.pixels().par_chunks(src.width().max(1)))
        .for_each(|(tmp_row, src_row)| {
            for (out, taps) in tmp_row.iter_mut().zip(x_taps) {
                let mut acc = T::zero();
                for &(i, w) in taps {
                    if w != 0 {
                        acc = T::mul_add(acc, src_row[i].widen(), w);
                    }
                }
                *out = acc;
            }
        });

    let mut dst = Buffer2::<T>::new_default(dst_width, dst_height);
    dst.pixels_mut()
        .par_chunks_mut(dst_width.max(1))
        .zip(y_taps.par_iter())
        .for_each(|(dst_row, taps)| {
            for (x, out) in dst_row.iter_mut().enumerate() {
                let mut acc = T::zero();
                for &(row, w) in taps {
                    if w != 0 {
                        acc = T::mul_add(acc, tmp[row * dst_width + x], w);
                    }
                }
                *out = T::narrow(acc, shift);
            }
        });
    dst
}

/// Blurs and halves `src`, rounding odd dimensions up.
pub fn pyr_down<T: Sample>(src: &Buffer2<T>) -> Buffer2<T> {
    let dst_width = src.width().div_ceil(2);
    let dst_height = src.height().div_ceil(2);
    if src.is_empty() {
        return Buffer2::new_default(dst_width, dst_height);
    }
    let x_taps = down_taps(src.width(), dst_width);
    let y_taps = down_taps(src.height(), dst_height);
    filter_separable(src, dst_width, dst_height, &x_taps, &y_taps, DOWN_SHIFT)
}

/// Doubles `src` to exactly `dst_width` x `dst_height`.
///
/// The target must be the size `src` was downsampled from, i.e.
/// `dst_width.div_ceil(2) == src.width()` and likewise for height.
pub fn pyr_up<T: Sample>(src: &Buffer2<T>, dst_width: usize, dst_height: usize) -> Buffer2<T> {
    assert!(
        dst_width.div_ceil(2) == src.width() && dst_height.div_ceil(2) == src.height(),
        "pyr_up target {}x{} does not match source {}x{}",
        dst_width,
        dst_height,
        src.width(),
        src.height()
    );
    if src.is_empty() {
        return Buffer2::new_default(dst_width, dst_height);
    }
    let x_taps = up_taps(src.width(), dst_width);
    let y_taps = up_taps(src.height(), dst_height);
    filter_separable(src, dst_width, dst_height, &x_taps, &y_taps, UP_SHIFT)
}
