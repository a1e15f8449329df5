//! Error types for core buffer and parameter handling.

use thiserror::Error;

/// Result type alias using [`CoreError`] as the error type.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while describing or walking pixel buffers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Image dimensions are zero or would overflow buffer arithmetic.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
        /// Reason why the dimensions are invalid
        reason: String,
    },

    /// A stride does not describe addressable f32 elements.
    ///
    /// Strides are given in bytes and must be multiples of 4 for float
    /// buffers.
    #[error("invalid stride {stride} bytes: {reason}")]
    InvalidStride {
        /// Offending stride in bytes
        stride: isize,
        /// Reason why the stride is invalid
        reason: String,
    },

    /// The described image extends outside the supplied buffer.
    #[error("image walk reaches element {index} but buffer holds {len}")]
    OutOfBounds {
        /// First out-of-range element index
        index: isize,
        /// Buffer length in elements
        len: usize,
    },

    /// A scanline buffer passed to a gather/scatter call is too small.
    #[error("row buffer holds {got} floats, need {need}")]
    RowBufferTooSmall {
        /// Required length in floats
        need: usize,
        /// Supplied length in floats
        got: usize,
    },

    /// Unsupported channel count.
    #[error("unsupported channel count {0}, need at least 3")]
    ChannelCount(usize),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
