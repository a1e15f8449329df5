//! 4x4 matrix + offset operation.
//!
//! The workhorse of primary conversions: RGB-to-RGB primaries changes,
//! channel swizzles, scale and offset. Parameters are stored in f64 and
//! applied to f32 pixels.
//!
//! # Formula
//!
//! ```text
//! out = M * in + offset
//! ```
//!
//! The matrix is full 4x4, so alpha may participate when a transform asks
//! for it; the common RGB case leaves row and column 3 at identity.

use glam::{DMat4, DVec4};

use crate::{OpError, OpResult};

/// Determinant magnitude below which inversion is refused.
const SINGULAR_TOL: f64 = 1e-10;

/// Matrix operation: `out = M * in + offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixOp {
    /// The 4x4 matrix (stored column-major via glam).
    pub matrix: DMat4,
    /// Post-multiply offset.
    pub offset: DVec4,
}

impl Default for MatrixOp {
    fn default() -> Self {
        Self::identity()
    }
}

impl MatrixOp {
    /// Identity matrix, zero offset.
    pub fn identity() -> Self {
        Self {
            matrix: DMat4::IDENTITY,
            offset: DVec4::ZERO,
        }
    }

    /// Builds from a row-major 4x4 array and an offset.
    pub fn from_rows(rows: [f64; 16], offset: [f64; 4]) -> Self {
        Self {
            matrix: DMat4::from_cols_array(&rows).transpose(),
            offset: DVec4::from_array(offset),
        }
    }

    /// Builds from a row-major 3x3 RGB matrix and an RGB offset. Alpha is
    /// left untouched.
    pub fn from_rgb(m: [f64; 9], offset: [f64; 3]) -> Self {
        let rows = [
            m[0], m[1], m[2], 0.0, //
            m[3], m[4], m[5], 0.0, //
            m[6], m[7], m[8], 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        Self::from_rows(rows, [offset[0], offset[1], offset[2], 0.0])
    }

    /// Builds a per-channel scale.
    pub fn from_diagonal(scale: [f64; 4]) -> Self {
        Self {
            matrix: DMat4::from_diagonal(DVec4::from_array(scale)),
            offset: DVec4::ZERO,
        }
    }

    /// Uniform RGB scale and offset, alpha untouched.
    pub fn from_scale_offset(scale: f64, offset: f64) -> Self {
        Self {
            matrix: DMat4::from_diagonal(DVec4::new(scale, scale, scale, 1.0)),
            offset: DVec4::new(offset, offset, offset, 0.0),
        }
    }

    /// Row-major matrix coefficients.
    pub fn rows(&self) -> [f64; 16] {
        self.matrix.transpose().to_cols_array()
    }

    /// True when matrix and offset are identity within `tol`.
    pub fn is_identity(&self, tol: f64) -> bool {
        let rows = self.rows();
        for (i, &v) in rows.iter().enumerate() {
            let target = if i % 5 == 0 { 1.0 } else { 0.0 };
            if (v - target).abs() > tol {
                return false;
            }
        }
        self.offset.abs().max_element() <= tol
    }

    /// True when any off-diagonal coefficient is non-zero.
    pub fn has_channel_crosstalk(&self) -> bool {
        let rows = self.rows();
        rows.iter()
            .enumerate()
            .any(|(i, &v)| i % 5 != 0 && v != 0.0)
    }

    /// Composes `self` followed by `then` into a single operation.
    pub fn compose(&self, then: &MatrixOp) -> MatrixOp {
        MatrixOp {
            matrix: then.matrix * self.matrix,
            offset: then.matrix * self.offset + then.offset,
        }
    }

    /// Returns the inverse operation.
    pub fn inverted(&self) -> OpResult<MatrixOp> {
        let det = self.matrix.determinant();
        if det.abs() < SINGULAR_TOL {
            return Err(OpError::Singular { det: det.abs() });
        }
        let inv = self.matrix.inverse();
        Ok(MatrixOp {
            matrix: inv,
            offset: -(inv * self.offset),
        })
    }

    /// Rescales for a change of input encoding: incoming values that used
    /// to span `old_max` now span `new_max`.
    pub fn rescale_input(&mut self, old_max: f64, new_max: f64) {
        let s = old_max / new_max;
        if s != 1.0 {
            self.matrix *= s;
        }
    }

    /// Rescales for a change of output encoding: coefficients and offsets
    /// scale by `new_max / old_max`.
    pub fn rescale_output(&mut self, old_max: f64, new_max: f64) {
        let s = new_max / old_max;
        if s != 1.0 {
            self.matrix *= s;
            self.offset *= s;
        }
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        for px in pixels.chunks_exact_mut(4) {
            let v = DVec4::new(
                f64::from(px[0]),
                f64::from(px[1]),
                f64::from(px[2]),
                f64::from(px[3]),
            );
            let out = self.matrix * v + self.offset;
            px[0] = out.x as f32;
            px[1] = out.y as f32;
            px[2] = out.z as f32;
            px[3] = out.w as f32;
        }
    }
}
