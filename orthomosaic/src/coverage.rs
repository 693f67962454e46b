//! Usability masks and tile pixel preparation.
//!
//! A tile's usable area comes either from a companion mask image, where dark
//! pixels are usable, or, when no mask exists, from the tile itself with every
//! pixel of [`KEY_COLOR`] excluded.

use crate::config::FeatherConfig;
use crate::feather::feather_with;
use crate::image::{Image, Mask, Rgb};

/// Fill color marking unusable pixels in tiles shipped without a mask.
pub const KEY_COLOR: Rgb<u8> = [255, 0, 255];

/// Mask image pixels darker than this are usable.
const MASK_IMAGE_THRESHOLD: u32 = 128;

/// Integer luma with weights 11/32, 16/32 and 5/32.
fn gray([r, g, b]: Rgb<u8>) -> u32 {
    (r as u32 * 11 + g as u32 * 16 + b as u32 * 5) / 32
}

/// Converts a companion mask image (dark = usable) to a usability mask.
pub fn usability_from_mask_image(image: &Image<u8>) -> Mask {
    image.map(|&p| {
        if gray(p) < MASK_IMAGE_THRESHOLD {
            u8::MAX
        } else {
            0
        }
    })
}

/// Marks every pixel equal to `key` as unusable.
pub fn usability_from_key_color(image: &Image<u8>, key: Rgb<u8>) -> Mask {
    image.map(|&p| if p == key { 0 } else { u8::MAX })
}

/// Feathered coverage for a tile.
///
/// Uses `usability` when given, otherwise derives it from [`KEY_COLOR`].
pub fn build_coverage_mask(
    image: &Image<u8>,
    usability: Option<&Mask>,
    config: &FeatherConfig,
) -> Mask {
    match usability {
        Some(mask) => feather_with(mask, config),
        None => feather_with(&usability_from_key_color(image, KEY_COLOR), config),
    }
}

/// Replaces unusable pixels with the mean color of the usable ones.
///
/// Returns the fill color, or `None` without touching the image if no pixel
/// is usable.
pub fn fill_excluded_with_mean(image: &mut Image<u8>, usability: &Mask) -> Option<Rgb<u8>> {
    assert_eq!(image.size(), usability.size(), "mask must match image size");

    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for (p, &m) in image.iter().zip(usability.iter()) {
        if m != 0 {
            for c in 0..3 {
                sum[c] += p[c] as u64;
            }
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }

    let mean = sum.map(|s| ((s + count / 2) / count) as u8);
    for (p, &m) in image.iter_mut().zip(usability.iter()) {
        if m == 0 {
            *p = mean;
        }
    }
    Some(mean)
}
