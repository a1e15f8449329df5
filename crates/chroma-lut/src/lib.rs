//! # chroma-lut
//!
//! Lookup-table array types and interpolators for the chroma color engine.
//!
//! This crate holds the numeric heart of LUT evaluation. It knows nothing
//! about file formats or transform directions; it stores sampled data and
//! evaluates it:
//!
//! - [`Lut1D`] - per-channel transfer tables with nearest/linear lookup and
//!   an exact inverse built by bisection over monotone channels
//! - [`Lut3D`] - an RGB cube with trilinear and tetrahedral interpolation
//! - [`InvLut3D`] - exact inverse evaluation of a 3D cube via an
//!   extrapolated grid, a spatial range tree and per-tetrahedron solves
//!
//! # Usage
//!
//! ```rust
//! use chroma_lut::{Interpolation, Lut3D};
//!
//! let lut = Lut3D::identity(17);
//! let rgb = lut.apply([0.5, 0.3, 0.2], Interpolation::Tetrahedral);
//! assert!((rgb[0] - 0.5).abs() < 1e-5);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod interp;
mod invert3d;
mod lut1d;
mod lut3d;

pub use error::{LutError, LutResult};
pub use interp::Interpolation;
pub use invert3d::InvLut3D;
pub use lut1d::Lut1D;
pub use lut3d::Lut3D;
