//! LUT error types.

use thiserror::Error;

/// Result type for LUT operations.
pub type LutResult<T> = Result<T, LutError>;

/// Errors that can occur while building or inverting LUTs.
#[derive(Debug, Error)]
pub enum LutError {
    /// LUT data does not match the declared size.
    #[error("invalid LUT size: {0}")]
    InvalidSize(String),

    /// A channel requested for inversion is not monotonic.
    #[error("channel {channel} is not monotonic, cannot invert")]
    NonMonotonic {
        /// Channel index (0 = red / mono, 1 = green, 2 = blue)
        channel: usize,
    },

    /// Invalid input domain.
    #[error("invalid input domain: [{min}, {max}]")]
    InvalidDomain {
        /// Domain minimum
        min: f32,
        /// Domain maximum
        max: f32,
    },
}
