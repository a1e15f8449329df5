//! # chroma-ops
//!
//! The closed set of color operations for the chroma engine, with their
//! CPU kernels, dynamic parameter plumbing and the op-list optimizer.
//!
//! Every kernel works on RGBA-interleaved `f32` buffers in place and
//! leaves alpha alone unless documented otherwise. Direction (forward or
//! inverse) is baked into each op when it is built, so apply never
//! branches on it.
//!
//! # Modules
//!
//! - [`op`] - the [`Op`] sum type tying everything together
//! - [`optimize`] - fixed-point rewrite passes over op lists
//! - [`grading`] - primary and RGB-curve grades
//! - [`dynamic`] - shared mutable parameter handles
//!
//! # Example
//!
//! ```rust
//! use chroma_ops::{MatrixOp, Op, OpKind, optimize};
//!
//! let ops = vec![
//!     Op::new(OpKind::Matrix(MatrixOp::from_scale_offset(2.0, 0.0))),
//!     Op::new(OpKind::Matrix(MatrixOp::from_scale_offset(0.5, 0.0))),
//! ];
//! assert!(optimize(ops).is_empty());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod cdl;
pub mod dynamic;
mod error;
mod exponent;
pub mod exposure_contrast;
pub mod fixed_function;
pub mod grading;
mod hash;
pub mod log;
mod lut_ops;
mod matrix;
pub mod op;
mod optimize;
mod range;

pub use cdl::CdlOp;
pub use dynamic::{DynamicHandle, DynamicProperty, DynamicPropertyKind, DynamicValue};
pub use error::{OpError, OpResult};
pub use exponent::{ExponentOp, ExponentWithLinearOp, NegativeStyle};
pub use exposure_contrast::{ExposureContrastOp, ExposureContrastStyle};
pub use fixed_function::{DoubleLogParams, FixedFunctionOp, FixedFunctionStyle, GamutCompParams};
pub use grading::{
    BSplineCurve, ControlPoint, GradingPrimary, GradingPrimaryOp, GradingRgbCurveOp,
    GradingRgbCurves, GradingRgbm, GradingStyle,
};
pub use hash::ContentHasher;
pub use log::{LogOp, LogParams, LogStyle};
pub use lut_ops::{InvLut3DOp, Lut1DOp, Lut3DOp};
pub use matrix::MatrixOp;
pub use op::{Op, OpKind};
pub use optimize::optimize;
pub use range::RangeOp;
