//! Compositing configuration.
//!
//! Every config derives serde with `#[serde(default)]`, so a partial YAML
//! document only overrides the fields it names.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::{Error, Result};

/// Largest band count accepted at construction time.
pub const MAX_BANDS: usize = 50;

/// Representation of mask weights inside the blender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WeightType {
    /// 16-bit fixed point: masks scaled to `0..=256`, products shifted right by 8.
    Fixed16,
    /// 32-bit float weights in `[0, 1]`.
    #[default]
    Float32,
}

/// Multi-band blender settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    /// Requested number of bands. The session may use fewer on small canvases.
    pub num_bands: usize,
    pub weight_type: WeightType,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            num_bands: 5,
            weight_type: WeightType::Float32,
        }
    }
}

impl BlendConfig {
    pub fn new(num_bands: usize, weight_type: WeightType) -> Self {
        Self {
            num_bands,
            weight_type,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_BANDS).contains(&self.num_bands) {
            return Err(Error::InvalidBandCount {
                requested: self.num_bands,
                max: MAX_BANDS,
            });
        }
        Ok(())
    }
}

/// Seam ownership settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeamConfig {
    /// Half-width in pixels of the ownership ramp around each Voronoi frontier.
    pub overlap_margin: f64,
    /// Prune candidate tiles with a uniform grid instead of scanning all tiles.
    pub use_spatial_index: bool,
}

impl Default for SeamConfig {
    fn default() -> Self {
        Self {
            overlap_margin: 20.0,
            use_spatial_index: true,
        }
    }
}

impl SeamConfig {
    pub fn with_margin(overlap_margin: f64) -> Self {
        Self {
            overlap_margin,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.overlap_margin.is_finite() || self.overlap_margin < 0.0 {
            return Err(Error::InvalidMargin(self.overlap_margin));
        }
        Ok(())
    }
}

/// Coverage feathering settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatherConfig {
    /// Distance in pixels over which coverage ramps from 0 to 255.
    pub radius: f32,
    /// Skip feathering and keep the binary mask.
    pub sharp: bool,
}

impl Default for FeatherConfig {
    fn default() -> Self {
        Self {
            radius: 512.0,
            sharp: false,
        }
    }
}

impl FeatherConfig {
    pub fn sharp() -> Self {
        Self {
            sharp: true,
            ..Default::default()
        }
    }

    pub fn with_radius(radius: f32) -> Self {
        Self {
            radius,
            sharp: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(Error::InvalidFeatherRadius(self.radius));
        }
        Ok(())
    }
}

/// Settings for a full mosaic run.
///
/// # Examples
///
/// ```
/// use orthomosaic::{MosaicConfig, WeightType};
///
/// let yaml = "blend:\n  num_bands: 8\n  weight_type: fixed16\n";
/// let config = MosaicConfig::from_yaml(yaml).unwrap();
/// assert_eq!(config.blend.num_bands, 8);
/// assert_eq!(config.blend.weight_type, WeightType::Fixed16);
/// assert_eq!(config.seam.overlap_margin, 20.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicConfig {
    pub blend: BlendConfig,
    pub seam: SeamConfig,
    pub feather: FeatherConfig,
}

impl MosaicConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.blend.validate()?;
        self.seam.validate()?;
        self.feather.validate()
    }
}
