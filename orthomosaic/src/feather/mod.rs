//! Coverage feathering.
//!
//! A binary usability mask is softened into a ramp that reaches zero at every
//! excluded pixel and at the tile's outer border, and saturates at 255 once a
//! pixel is `radius` pixels away from both.

mod distance;


use crate::config::FeatherConfig;
use crate::image::Mask;

pub use distance::distance_transform;

/// Softens `mask` over `radius` pixels.
///
/// Nonzero input pixels are treated as usable. With `sharp` set, or a radius
/// of one pixel or less, the mask is only normalized to 0/255.
pub fn feather(mask: &Mask, radius: f32, sharp: bool) -> Mask {
    let binary = mask.map(|&v| if v != 0 { u8::MAX } else { 0 });
    if sharp || radius.is_nan() || radius <= 1.0 || binary.is_empty() {
        return binary;
    }

    let distances = distance_transform(&binary);
    let (width, height) = binary.size();
    Mask::from_fn(width, height, |x, y| {
        if binary[(x, y)] == 0 {
            return 0;
        }
        let border = x.min(y).min(width - 1 - x).min(height - 1 - y) as f32;
        let distance = distances[(x, y)].min(border);
        ((distance / radius).min(1.0) * 255.0).round() as u8
    })
}

/// [`feather`] driven by a [`FeatherConfig`].
pub fn feather_with(mask: &Mask, config: &FeatherConfig) -> Mask {
    feather(mask, config.radius, config.sharp)
}
