//! Operation error types.

use thiserror::Error;

/// Result type for operation construction and inversion.
pub type OpResult<T> = Result<T, OpError>;

/// Errors raised while building, inverting or composing operations.
#[derive(Debug, Error)]
pub enum OpError {
    /// A matrix cannot be inverted.
    #[error("matrix is singular (|det| = {det:e})")]
    Singular {
        /// Absolute value of the determinant that failed the threshold.
        det: f64,
    },

    /// An operation parameter is outside its legal range.
    #[error("invalid operation parameter: {0}")]
    Invalid(String),

    /// An operation has no closed-form or numeric inverse.
    #[error("operation cannot be inverted: {0}")]
    NotInvertible(String),

    /// LUT construction or inversion failed.
    #[error(transparent)]
    Lut(#[from] chroma_lut::LutError),
}
