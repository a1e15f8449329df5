//! Engine error types.
//!
//! Compilation is the single failure site: kernels never raise per pixel.
//! `MissingFile` is kept distinct from generic IO so callers probing
//! several candidate paths can continue on a miss but stop on corruption.

use std::path::PathBuf;

use chroma_lut::LutError;
use chroma_ops::OpError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised while resolving configs and compiling processors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A color-space, role, look, display or view name did not resolve.
    #[error("unknown {kind} name: '{name}'")]
    UnknownName {
        /// What was being looked up ("color space", "look", ...).
        kind: &'static str,
        /// The name that failed to resolve.
        name: String,
    },

    /// The context could not locate a file on the search path.
    #[error("file '{name}' not found on search path")]
    MissingFile {
        /// The (resolved) file name that was searched for.
        name: String,
    },

    /// A LUT or cache file exists but its contents are not parseable.
    #[error("format error in '{path}': {reason}")]
    Format {
        /// Offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Color-space references or context substitutions form a cycle.
    #[error("cycle detected: {0}")]
    Cycle(String),

    /// A matrix had to be inverted but is singular.
    #[error("matrix is singular (|det| = {det:e})")]
    Singular {
        /// Absolute value of the determinant that failed the threshold.
        det: f64,
    },

    /// A 1D LUT channel requested in the inverse direction is not monotone.
    #[error("LUT channel {channel} is not monotonic, cannot invert")]
    NonMonotonic {
        /// Channel index (0 = red / mono, 1 = green, 2 = blue).
        channel: usize,
    },

    /// A parameter or structural invariant was violated.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// An index into an enumerated list was out of bounds.
    #[error("index {index} out of range (len {len})")]
    OutOfRange {
        /// Requested index.
        index: usize,
        /// Length of the list.
        len: usize,
    },

    /// Underlying filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Persisted cache (de)serialization failure.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl From<OpError> for EngineError {
    fn from(err: OpError) -> Self {
        match err {
            OpError::Singular { det } => EngineError::Singular { det },
            OpError::Invalid(msg) => EngineError::Invalid(msg),
            OpError::NotInvertible(msg) => EngineError::Invalid(msg),
            OpError::Lut(LutError::NonMonotonic { channel }) => {
                EngineError::NonMonotonic { channel }
            }
            OpError::Lut(lut) => EngineError::Invalid(lut.to_string()),
        }
    }
}

impl From<chroma_core::CoreError> for EngineError {
    fn from(err: chroma_core::CoreError) -> Self {
        match err {
            chroma_core::CoreError::Io(io) => EngineError::Io(io),
            other => EngineError::Invalid(other.to_string()),
        }
    }
}

impl From<LutError> for EngineError {
    fn from(err: LutError) -> Self {
        match err {
            LutError::NonMonotonic { channel } => EngineError::NonMonotonic { channel },
            other => EngineError::Invalid(other.to_string()),
        }
    }
}
