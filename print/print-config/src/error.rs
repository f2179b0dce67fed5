//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating configuration records.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A distance or time is negative.
    #[error("{field} must be >= 0, got {value}")]
    Negative {
        /// JSON name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A dimension or step size that must be strictly positive is not.
    #[error("{field} must be > 0, got {value}")]
    NotPositive {
        /// JSON name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A value is NaN or infinite.
    #[error("{field} must be finite, got {value}")]
    NotFinite {
        /// JSON name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The projector reports a zero pixel dimension.
    #[error("projector resolution must be non-zero, got {width}x{height}")]
    InvalidResolution {
        /// Horizontal pixel count.
        width: u32,
        /// Vertical pixel count.
        height: u32,
    },

    /// A stepper count is zero.
    #[error("{field} must be at least 1")]
    ZeroCount {
        /// JSON name of the offending field.
        field: &'static str,
    },

    /// JSON could not be parsed or serialized.
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
