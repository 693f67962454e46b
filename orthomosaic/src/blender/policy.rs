//! Weight arithmetic for the two accumulation regimes.
//!
//! The regimes are not bit-compatible: a session picks one at construction
//! and never mixes them.

use crate::pyramid::Sample;

/// Accumulated level-0 weight above which an output pixel is valid.
pub const WEIGHT_EPS: f32 = 1e-5;

pub(crate) trait WeightPolicy: Send + Sync + 'static {
    type Weight: Sample;

    /// Maps an 8-bit mask value into this regime's weight scale.
    fn from_mask(value: u8) -> Self::Weight;

    /// Band value scaled by a blend-mask weight.
    fn apply(band: i16, blend: Self::Weight) -> i16;

    fn accumulate(total: Self::Weight, weight: Self::Weight) -> Self::Weight;

    /// Turns a weighted band sum into a weighted average.
    fn normalize(sum: i16, total: Self::Weight) -> i16;

    fn is_valid(total: Self::Weight) -> bool;
}

#[inline]
fn saturate_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Masks pre-scaled to `0..=256`, products shifted right by 8, weights summed raw.
pub(crate) struct Fixed16;

impl WeightPolicy for Fixed16 {
    type Weight = i16;

    #[inline]
    fn from_mask(value: u8) -> i16 {
        // Any positive input stays positive after the shift.
        value as i16 + (value != 0) as i16
    }

    #[inline]
    fn apply(band: i16, blend: i16) -> i16 {
        saturate_i16((band as i32 * blend as i32) >> 8)
    }

    #[inline]
    fn accumulate(total: i16, weight: i16) -> i16 {
        total.saturating_add(weight)
    }

    #[inline]
    fn normalize(sum: i16, total: i16) -> i16 {
        saturate_i16((sum as i32 * 256) / (total as i32 + 1))
    }

    #[inline]
    fn is_valid(total: i16) -> bool {
        total as f32 > WEIGHT_EPS
    }
}

/// Weights in `[0, 1]`, true sums divided by true weight sums.
pub(crate) struct Float32;

impl WeightPolicy for Float32 {
    type Weight = f32;

    #[inline]
    fn from_mask(value: u8) -> f32 {
        value as f32 / 255.0
    }

    #[inline]
    fn apply(band: i16, blend: f32) -> i16 {
        (band as f32 * blend).round() as i16
    }

    #[inline]
    fn accumulate(total: f32, weight: f32) -> f32 {
        total + weight
    }

    #[inline]
    fn normalize(sum: i16, total: f32) -> i16 {
        (sum as f32 / (total + WEIGHT_EPS)).round() as i16
    }

    #[inline]
    fn is_valid(total: f32) -> bool {
        total > WEIGHT_EPS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_mask_scaling_keeps_small_values_positive() {
        assert_eq!(Fixed16::from_mask(0), 0);
        assert_eq!(Fixed16::from_mask(1), 2);
        assert_eq!(Fixed16::from_mask(128), 129);
        assert_eq!(Fixed16::from_mask(255), 256);
    }

    #[test]
    fn test_fixed_apply_shifts_by_eight() {
        assert_eq!(Fixed16::apply(200, 256), 200);
        assert_eq!(Fixed16::apply(200, 129), 100);
        // Arithmetic shift floors negative products.
        assert_eq!(Fixed16::apply(-3, 129), -2);
        assert_eq!(Fixed16::apply(i16::MAX, 256), i16::MAX);
    }

    #[test]
    fn test_fixed_normalize_divides_by_weight_plus_one() {
        // (255 << 8) / 257 truncates to 254.
        assert_eq!(Fixed16::normalize(255, 256), 254);
        assert_eq!(Fixed16::normalize(-100, 256), -99);
        assert_eq!(Fixed16::normalize(0, 0), 0);
        assert_eq!(Fixed16::normalize(1000, 0), i16::MAX);
    }

    #[test]
    fn test_fixed_accumulate_saturates() {
        assert_eq!(Fixed16::accumulate(i16::MAX - 10, 256), i16::MAX);
        assert!(Fixed16::is_valid(1));
        assert!(!Fixed16::is_valid(0));
    }

    #[test]
    fn test_float_round_trip_of_full_weight() {
        let w = Float32::from_mask(255);
        assert_eq!(w, 1.0);
        for band in [-300i16, -1, 0, 1, 255, 4000] {
            let sum = Float32::apply(band, w);
            assert_eq!(Float32::normalize(sum, w), band);
        }
    }

    #[test]
    fn test_float_weighted_average() {
        let a = Float32::apply(100, 0.25);
        let b = Float32::apply(200, 0.75);
        let total = Float32::accumulate(0.25, 0.75);
        assert_eq!(Float32::normalize(a + b, total), 175);
        assert!(!Float32::is_valid(WEIGHT_EPS / 2.0));
    }
}
