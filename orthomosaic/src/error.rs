//! Error types for compositing operations.

use thiserror::Error;

/// Errors reported by the compositing core.
///
/// All of these are raised before any session state is touched, except
/// [`Error::Allocation`], which is reported once and never retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Band count {requested} is outside the supported range 1..={max}")]
    InvalidBandCount { requested: usize, max: usize },

    #[error("Canvas must have non-zero dimensions, got {width}x{height}")]
    InvalidCanvas { width: usize, height: usize },

    #[error("Dimension mismatch for {what}: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Overlap margin must be finite and non-negative, got {0}")]
    InvalidMargin(f64),

    #[error("Feather radius must be finite and non-negative, got {0}")]
    InvalidFeatherRadius(f32),

    #[error("Failed to allocate {what} of {width}x{height} pixels")]
    Allocation {
        what: &'static str,
        width: usize,
        height: usize,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_yml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_band_count_message() {
        let err = Error::InvalidBandCount {
            requested: 60,
            max: 50,
        };
        assert_eq!(
            err.to_string(),
            "Band count 60 is outside the supported range 1..=50"
        );
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = Error::DimensionMismatch {
            what: "blend mask",
            expected: (100, 80),
            actual: (100, 81),
        };
        let msg = err.to_string();
        assert!(msg.contains("blend mask"));
        assert!(msg.contains("80"));
        assert!(msg.contains("81"));
    }

    #[test]
    fn test_allocation_message() {
        let err = Error::Allocation {
            what: "band weights",
            width: 4096,
            height: 2048,
        };
        assert!(err.to_string().contains("4096x2048"));
    }

    #[test]
    fn test_config_error_has_source() {
        use std::error::Error as StdError;

        let yaml_err = serde_yml::from_str::<u32>("not a number").unwrap_err();
        let err = Error::from(yaml_err);
        assert!(err.source().is_some());
    }
}
