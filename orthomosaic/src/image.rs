//! Raster types shared by the compositing stages.

use common::Buffer2;
use glam::IVec2;

/// Three-channel pixel in the blending engine's channel order.
pub type Rgb<T> = [T; 3];

/// Three-channel raster.
pub type Image<T> = Buffer2<Rgb<T>>;

/// Single-channel 8-bit mask: 0 = excluded, 255 = fully included.
pub type Mask = Buffer2<u8>;

/// Output canvas dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: usize,
    pub height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

/// Tile footprint on the canvas: top-left offset plus the tile's own size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub offset: IVec2,
    pub width: usize,
    pub height: usize,
}

impl Placement {
    pub fn new(x: i32, y: i32, width: usize, height: usize) -> Self {
        Self {
            offset: IVec2::new(x, y),
            width,
            height,
        }
    }

    /// Exclusive bottom-right corner.
    pub fn bottom_right(&self) -> IVec2 {
        self.offset + IVec2::new(self.width as i32, self.height as i32)
    }

    pub fn contains(&self, point: IVec2) -> bool {
        let br = self.bottom_right();
        point.x >= self.offset.x && point.y >= self.offset.y && point.x < br.x && point.y < br.y
    }

    /// Geometric center in canvas coordinates.
    pub fn center(&self) -> glam::DVec2 {
        self.offset.as_dvec2() + glam::DVec2::new(self.width as f64, self.height as f64) * 0.5
    }
}

/// Tile pixels as handed to the blender.
#[derive(Debug, Clone)]
pub enum TileImage {
    /// Decoded 8-bit source pixels.
    U8(Image<u8>),
    /// Pixels already widened to the band representation.
    I16(Image<i16>),
}

impl TileImage {
    pub fn width(&self) -> usize {
        match self {
            TileImage::U8(image) => image.width(),
            TileImage::I16(image) => image.width(),
        }
    }

    pub fn height(&self) -> usize {
        match self {
            TileImage::U8(image) => image.height(),
            TileImage::I16(image) => image.height(),
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// Widens to the signed band representation without copying `I16` input.
    pub fn into_bands(self) -> Image<i16> {
        match self {
            TileImage::U8(image) => image.map(|p| p.map(i16::from)),
            TileImage::I16(image) => image,
        }
    }
}

impl From<Image<u8>> for TileImage {
    fn from(image: Image<u8>) -> Self {
        TileImage::U8(image)
    }
}

impl From<Image<i16>> for TileImage {
    fn from(image: Image<i16>) -> Self {
        TileImage::I16(image)
    }
}

/// Saturates band values back to 8-bit.
pub fn bands_to_rgb8(image: &Image<i16>) -> Image<u8> {
    image.map(|p| p.map(|c| c.clamp(0, u8::MAX as i16) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_contains_is_half_open() {
        let placement = Placement::new(10, 20, 5, 4);
        assert!(placement.contains(IVec2::new(10, 20)));
        assert!(placement.contains(IVec2::new(14, 23)));
        assert!(!placement.contains(IVec2::new(15, 23)));
        assert!(!placement.contains(IVec2::new(14, 24)));
        assert!(!placement.contains(IVec2::new(9, 20)));
    }

    #[test]
    fn test_placement_center() {
        let placement = Placement::new(-4, 2, 8, 6);
        assert_eq!(placement.center(), glam::DVec2::new(0.0, 5.0));
        assert_eq!(placement.bottom_right(), IVec2::new(4, 8));
    }

    #[test]
    fn test_into_bands_widens_u8() {
        let image = TileImage::from(Image::new_filled(2, 2, [255u8, 0, 7]));
        let bands = image.into_bands();
        assert!(bands.iter().all(|&p| p == [255, 0, 7]));
    }

    #[test]
    fn test_bands_to_rgb8_saturates() {
        let bands = Image::new(3, 1, vec![[-5i16, 0, 300], [128, 255, 256], [1, 2, 3]]);
        let rgb = bands_to_rgb8(&bands);
        assert_eq!(rgb.pixels(), &[[0, 0, 255], [128, 255, 255], [1, 2, 3]]);
    }
}
