//! ASC CDL (Color Decision List) operation.
//!
//! Slope, Offset, Power per channel, then saturation against a luma
//! vector (Rec.709 by default).
//!
//! # Formula
//!
//! ```text
//! out = clamp01((in * slope + offset) ^ power)    power != 1
//! out = in * slope + offset                       power == 1
//! ```
//!
//! A power of exactly 1 keeps the transfer affine and unclamped, so
//! negative and over-range values survive a pure slope/offset grade.

use chroma_core::REC709_LUMA;

use crate::{OpError, OpResult};

/// Slopes smaller than this are treated as zero when inverting.
const MIN_SLOPE: f64 = 1e-10;

/// Saturation identity tolerance.
const SAT_TOL: f64 = 1e-6;

/// ASC CDL operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CdlOp {
    /// Slope per channel [R, G, B].
    pub slope: [f64; 3],
    /// Offset per channel [R, G, B].
    pub offset: [f64; 3],
    /// Power per channel [R, G, B].
    pub power: [f64; 3],
    /// Saturation (1.0 = no change).
    pub saturation: f64,
    /// Luma weights used by the saturation stage.
    pub luma: [f64; 3],
    /// False applies the inverse grade.
    pub forward: bool,
}

impl CdlOp {
    /// Creates a validated CDL op with Rec.709 luma weights.
    pub fn new(
        slope: [f64; 3],
        offset: [f64; 3],
        power: [f64; 3],
        saturation: f64,
        forward: bool,
    ) -> OpResult<Self> {
        Self::with_luma(slope, offset, power, saturation, REC709_LUMA, forward)
    }

    /// Creates a validated CDL op with explicit luma weights.
    pub fn with_luma(
        slope: [f64; 3],
        offset: [f64; 3],
        power: [f64; 3],
        saturation: f64,
        luma: [f64; 3],
        forward: bool,
    ) -> OpResult<Self> {
        for p in power {
            if !(p > 0.0) {
                return Err(OpError::Invalid(format!("CDL power must be positive: {p}")));
            }
        }
        if !(saturation >= 0.0) {
            return Err(OpError::Invalid(format!(
                "CDL saturation must be non-negative: {saturation}"
            )));
        }
        Ok(Self {
            slope,
            offset,
            power,
            saturation,
            luma,
            forward,
        })
    }

    /// Identity grade.
    pub fn identity() -> Self {
        Self {
            slope: [1.0; 3],
            offset: [0.0; 3],
            power: [1.0; 3],
            saturation: 1.0,
            luma: REC709_LUMA,
            forward: true,
        }
    }

    /// True when the grade changes nothing.
    pub fn is_identity(&self) -> bool {
        self.slope == [1.0; 3]
            && self.offset == [0.0; 3]
            && self.power == [1.0; 3]
            && (self.saturation - 1.0).abs() < SAT_TOL
    }

    /// True when saturation mixes channels.
    pub fn has_channel_crosstalk(&self) -> bool {
        (self.saturation - 1.0).abs() >= SAT_TOL
    }

    /// The inverse grade (same parameters, opposite direction).
    pub fn inverted(&self) -> CdlOp {
        let mut inv = self.clone();
        inv.forward = !self.forward;
        inv
    }

    #[inline]
    fn sop_fwd(x: f32, s: f64, o: f64, p: f64) -> f32 {
        let t = f64::from(x) * s + o;
        if p != 1.0 {
            t.max(0.0).powf(p).clamp(0.0, 1.0) as f32
        } else {
            t as f32
        }
    }

    #[inline]
    fn sop_rev(y: f32, s: f64, o: f64, p: f64) -> f32 {
        let t = if p != 1.0 {
            f64::from(y).clamp(0.0, 1.0).powf(1.0 / p)
        } else {
            f64::from(y)
        };
        if s.abs() < MIN_SLOPE {
            0.0
        } else {
            ((t - o) / s) as f32
        }
    }

    #[inline]
    fn saturate(&self, rgb: [f32; 3], sat: f64) -> [f32; 3] {
        let lum = f64::from(rgb[0]) * self.luma[0]
            + f64::from(rgb[1]) * self.luma[1]
            + f64::from(rgb[2]) * self.luma[2];
        [
            (lum + (f64::from(rgb[0]) - lum) * sat) as f32,
            (lum + (f64::from(rgb[1]) - lum) * sat) as f32,
            (lum + (f64::from(rgb[2]) - lum) * sat) as f32,
        ]
    }

    #[inline]
    fn eval(&self, rgb: [f32; 3]) -> [f32; 3] {
        if self.forward {
            let mut out = [
                Self::sop_fwd(rgb[0], self.slope[0], self.offset[0], self.power[0]),
                Self::sop_fwd(rgb[1], self.slope[1], self.offset[1], self.power[1]),
                Self::sop_fwd(rgb[2], self.slope[2], self.offset[2], self.power[2]),
            ];
            if self.has_channel_crosstalk() {
                out = self.saturate(out, self.saturation);
            }
            out
        } else {
            let mut out = rgb;
            if self.has_channel_crosstalk() && self.saturation > 0.0 {
                out = self.saturate(out, 1.0 / self.saturation);
            }
            [
                Self::sop_rev(out[0], self.slope[0], self.offset[0], self.power[0]),
                Self::sop_rev(out[1], self.slope[1], self.offset[1], self.power[1]),
                Self::sop_rev(out[2], self.slope[2], self.offset[2], self.power[2]),
            ]
        }
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        for px in pixels.chunks_exact_mut(4) {
            let out = self.eval([px[0], px[1], px[2]]);
            px[0] = out[0];
            px[1] = out[1];
            px[2] = out[2];
            // Alpha unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn identity() {
        let cdl = CdlOp::identity();
        assert!(cdl.is_identity());
        let mut px = [0.5f32, 0.3, 0.7, 1.0];
        cdl.apply_rgba(&mut px);
        assert!((px[0] - 0.5).abs() < EPSILON);
        assert!((px[1] - 0.3).abs() < EPSILON);
        assert!((px[2] - 0.7).abs() < EPSILON);
    }

    #[test]
    fn negative_offset_with_power_clamps_to_zero() {
        // slope 1, offset -0.2, power 1.1 on input 0.1: the SOP result is
        // -0.1, the power path clamps it to 0.
        let cdl = CdlOp::new([1.0; 3], [-0.2; 3], [1.1; 3], 1.0, true).unwrap();
        let mut px = [0.1f32, 0.1, 0.1, 1.0];
        cdl.apply_rgba(&mut px);
        assert_eq!(px[0], 0.0);
        assert_eq!(px[1], 0.0);
        assert_eq!(px[2], 0.0);
    }

    #[test]
    fn unity_power_is_unclamped() {
        let cdl = CdlOp::new([1.0; 3], [-0.2; 3], [1.0; 3], 1.0, true).unwrap();
        let mut px = [0.1f32, 1.5, 0.3, 1.0];
        cdl.apply_rgba(&mut px);
        assert!((px[0] + 0.1).abs() < EPSILON);
        assert!((px[1] - 1.3).abs() < EPSILON);
    }

    #[test]
    fn saturation_zero_gives_gray() {
        let cdl = CdlOp::new([1.0; 3], [0.0; 3], [1.0; 3], 0.0, true).unwrap();
        let mut px = [1.0f32, 0.0, 0.0, 1.0];
        cdl.apply_rgba(&mut px);
        let lum = REC709_LUMA[0] as f32;
        assert!((px[0] - lum).abs() < EPSILON);
        assert!((px[1] - lum).abs() < EPSILON);
        assert!((px[2] - lum).abs() < EPSILON);
        assert!(cdl.has_channel_crosstalk());
    }

    #[test]
    fn custom_luma_weights() {
        let cdl =
            CdlOp::with_luma([1.0; 3], [0.0; 3], [1.0; 3], 0.0, [1.0, 0.0, 0.0], true).unwrap();
        let mut px = [0.25f32, 0.9, 0.9, 1.0];
        cdl.apply_rgba(&mut px);
        assert!((px[0] - 0.25).abs() < EPSILON);
        assert!((px[1] - 0.25).abs() < EPSILON);
    }

    #[test]
    fn inverse_round_trips() {
        let cdl = CdlOp::new([1.2, 0.9, 1.1], [0.05, -0.02, 0.0], [1.0; 3], 1.2, true).unwrap();
        let inv = cdl.inverted();
        let mut px = [0.4f32, 0.5, 0.6, 1.0];
        cdl.apply_rgba(&mut px);
        inv.apply_rgba(&mut px);
        assert!((px[0] - 0.4).abs() < 1e-4);
        assert!((px[1] - 0.5).abs() < 1e-4);
        assert!((px[2] - 0.6).abs() < 1e-4);
    }

    #[test]
    fn invalid_params_rejected() {
        assert!(CdlOp::new([1.0; 3], [0.0; 3], [0.0; 3], 1.0, true).is_err());
        assert!(CdlOp::new([1.0; 3], [0.0; 3], [1.0; 3], -0.5, true).is_err());
    }
}
