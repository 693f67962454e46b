//! Orthomosaic - seamless compositing of georeferenced image tiles.
//!
//! This library provides the building blocks of an orthomosaic pipeline:
//! - Laplacian pyramid decomposition and reconstruction
//! - A multi-band blender with separate weight and blend masks
//! - Voronoi seam ownership with a soft margin around each frontier
//! - Coverage feathering from usability masks
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use orthomosaic::{Canvas, MosaicConfig, compose};
//!
//! let config = MosaicConfig::from_yaml(&std::fs::read_to_string("mosaic.yaml")?)?;
//! let output = compose(&tiles, Canvas::new(20_000, 15_000), &config)?;
//!
//! println!("Blended {} tiles", output.tiles_fed);
//! ```

pub mod blender;
pub mod config;
pub mod coverage;
pub mod error;
pub mod feather;
pub mod image;
pub mod mosaic;
pub mod pyramid;
pub mod seam;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Raster types
// ============================================================================

pub use image::{Canvas, Image, Mask, Placement, Rgb, TileImage, bands_to_rgb8};

// ============================================================================
// Configuration and errors
// ============================================================================

pub use config::{BlendConfig, FeatherConfig, MAX_BANDS, MosaicConfig, SeamConfig, WeightType};
pub use error::{Error, Result};

// ============================================================================
// Pyramids and blending
// ============================================================================

pub use blender::{BlendResult, BlendSession, DualMaskBlender, WEIGHT_EPS, effective_num_bands};
pub use pyramid::{LaplacianPyramid, Pyramid, pyr_down, pyr_up};

// ============================================================================
// Masks
// ============================================================================

pub use coverage::{
    KEY_COLOR, build_coverage_mask, fill_excluded_with_mean, usability_from_key_color,
    usability_from_mask_image,
};
pub use feather::{distance_transform, feather};
pub use seam::{SeamTile, generate_ownership_masks};

// ============================================================================
// Pipeline
// ============================================================================

pub use mosaic::{MosaicOutput, TileSource, compose};
