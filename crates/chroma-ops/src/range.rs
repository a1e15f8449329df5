//! Range operation: affine remap with clamping.
//!
//! Remaps `[min_in, max_in]` onto `[min_out, max_out]` and clamps to the
//! output interval. Any bound may be absent; a missing pair turns the op
//! into a one-sided clamp, and with no bounds at all it is a no-op.
//! Bounds must come in matched pairs: an input minimum requires an output
//! minimum and vice versa.
//!
//! NaN resolves to the lower bound when one exists, otherwise to the
//! upper. Alpha is untouched.

use crate::{OpError, OpResult};

/// Scale is treated as unity when the input interval is this small.
const MIN_INTERVAL: f64 = 1e-12;

/// Range operation over the RGB channels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangeOp {
    /// Lower input bound.
    pub min_in: Option<f64>,
    /// Upper input bound.
    pub max_in: Option<f64>,
    /// Lower output bound.
    pub min_out: Option<f64>,
    /// Upper output bound.
    pub max_out: Option<f64>,
}

impl RangeOp {
    /// Creates a validated range.
    pub fn new(
        min_in: Option<f64>,
        max_in: Option<f64>,
        min_out: Option<f64>,
        max_out: Option<f64>,
    ) -> OpResult<Self> {
        if min_in.is_some() != min_out.is_some() {
            return Err(OpError::Invalid(
                "range minimum must be set on both input and output".into(),
            ));
        }
        if max_in.is_some() != max_out.is_some() {
            return Err(OpError::Invalid(
                "range maximum must be set on both input and output".into(),
            ));
        }
        if let (Some(lo), Some(hi)) = (min_in, max_in) {
            if lo > hi {
                return Err(OpError::Invalid(format!(
                    "range input interval is inverted: [{lo}, {hi}]"
                )));
            }
        }
        if let (Some(lo), Some(hi)) = (min_out, max_out) {
            if lo > hi {
                return Err(OpError::Invalid(format!(
                    "range output interval is inverted: [{lo}, {hi}]"
                )));
            }
        }
        Ok(Self {
            min_in,
            max_in,
            min_out,
            max_out,
        })
    }

    /// Pure clamp to `[lo, hi]` with no remapping.
    pub fn clamp(lo: f64, hi: f64) -> Self {
        Self {
            min_in: Some(lo),
            max_in: Some(hi),
            min_out: Some(lo),
            max_out: Some(hi),
        }
    }

    /// True when the op passes every value through unchanged.
    pub fn is_noop(&self) -> bool {
        self.min_in.is_none() && self.max_in.is_none()
    }

    /// True when the op rescales rather than only clamping.
    pub fn scales(&self) -> bool {
        match (self.min_in, self.max_in, self.min_out, self.max_out) {
            (Some(min_in), Some(max_in), Some(min_out), Some(max_out)) => {
                ((max_in - min_in) - (max_out - min_out)).abs() > 1e-9 || min_in != min_out
            }
            _ => false,
        }
    }

    /// Affine scale and offset for a fully bounded range.
    fn scale_offset(&self) -> Option<(f64, f64)> {
        let (min_in, max_in, min_out, max_out) = (
            self.min_in?,
            self.max_in?,
            self.min_out?,
            self.max_out?,
        );
        let span = max_in - min_in;
        let scale = if span < MIN_INTERVAL {
            1.0
        } else {
            (max_out - min_out) / span
        };
        Some((scale, min_out - min_in * scale))
    }

    /// Affine part as `(scale, offset)`, unity when not rescaling.
    pub fn as_affine(&self) -> (f64, f64) {
        self.scale_offset().unwrap_or((1.0, 0.0))
    }

    /// The inverse range (input and output intervals swapped).
    pub fn inverted(&self) -> RangeOp {
        RangeOp {
            min_in: self.min_out,
            max_in: self.max_out,
            min_out: self.min_in,
            max_out: self.max_in,
        }
    }

    /// Fuses two consecutive clamp-only ranges into one.
    ///
    /// Rescaling ranges are left to the promotion pass; only pure clamps
    /// fuse here. Disjoint intervals collapse to the constant the second
    /// clamp would produce.
    pub fn compose_clamps(&self, then: &RangeOp) -> Option<RangeOp> {
        if self.scales() || then.scales() {
            return None;
        }
        let lo = match (self.min_out, then.min_out) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let hi = match (self.max_out, then.max_out) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        if let (Some(lo_v), Some(hi_v)) = (lo, hi) {
            if lo_v > hi_v {
                // First clamp caps below the second's floor (or the mirror
                // case); everything lands on a single output value.
                let floor_wins = self
                    .max_out
                    .is_some_and(|b1| then.min_out.is_some_and(|a2| a2 > b1));
                let c = if floor_wins { then.min_out } else { then.max_out };
                return Some(RangeOp {
                    min_in: c,
                    max_in: c,
                    min_out: c,
                    max_out: c,
                });
            }
        }
        Some(RangeOp {
            min_in: lo,
            max_in: hi,
            min_out: lo,
            max_out: hi,
        })
    }

    #[inline]
    fn eval(&self, v: f32, scale: f64, offset: f64) -> f32 {
        if v.is_nan() {
            // NaN resolves to a bound rather than propagating.
            return match (self.min_out, self.max_out) {
                (Some(lo), _) => lo as f32,
                (None, Some(hi)) => hi as f32,
                (None, None) => v,
            };
        }
        let mut out = f64::from(v) * scale + offset;
        if let Some(lo) = self.min_out {
            out = out.max(lo);
        }
        if let Some(hi) = self.max_out {
            out = out.min(hi);
        }
        out as f32
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        let (scale, offset) = self.as_affine();
        for px in pixels.chunks_exact_mut(4) {
            px[0] = self.eval(px[0], scale, offset);
            px[1] = self.eval(px[1], scale, offset);
            px[2] = self.eval(px[2], scale, offset);
            // Alpha unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn unpaired_bound_rejected() {
        assert!(RangeOp::new(Some(0.0), None, None, None).is_err());
        assert!(RangeOp::new(None, Some(1.0), None, Some(1.0)).is_ok());
    }

    #[test]
    fn no_bounds_is_noop() {
        let r = RangeOp::default();
        assert!(r.is_noop());
        let mut px = [-0.5f32, 0.5, 2.0, 0.3];
        r.apply_rgba(&mut px);
        assert_eq!(px, [-0.5, 0.5, 2.0, 0.3]);
    }

    #[test]
    fn remaps_and_clamps() {
        let r = RangeOp::new(Some(0.0), Some(1.0), Some(0.5), Some(1.5)).unwrap();
        assert!(r.scales());
        let mut px = [0.0f32, 0.5, 2.0, 1.0];
        r.apply_rgba(&mut px);
        assert!((px[0] - 0.5).abs() < EPSILON);
        assert!((px[1] - 1.0).abs() < EPSILON);
        assert!((px[2] - 1.5).abs() < EPSILON);
        assert!((px[3] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn one_sided_clamp() {
        let r = RangeOp::new(None, Some(1.0), None, Some(1.0)).unwrap();
        let mut px = [-2.0f32, 0.5, 3.0, 1.0];
        r.apply_rgba(&mut px);
        assert_eq!(px[0], -2.0);
        assert_eq!(px[1], 0.5);
        assert_eq!(px[2], 1.0);
    }

    #[test]
    fn nan_resolves_to_lower_bound() {
        let r = RangeOp::clamp(0.0, 1.0);
        let mut px = [f32::NAN, 0.5, 0.5, 1.0];
        r.apply_rgba(&mut px);
        assert_eq!(px[0], 0.0);
    }

    #[test]
    fn nan_resolves_to_upper_when_only_max() {
        let r = RangeOp::new(None, Some(1.0), None, Some(1.0)).unwrap();
        let mut px = [f32::NAN, 0.5, 0.5, 1.0];
        r.apply_rgba(&mut px);
        assert_eq!(px[0], 1.0);
    }

    #[test]
    fn inverse_swaps_intervals() {
        let r = RangeOp::new(Some(0.0), Some(1.0), Some(0.2), Some(0.8)).unwrap();
        let inv = r.inverted();
        let mut px = [0.25f32, 0.5, 0.75, 1.0];
        r.apply_rgba(&mut px);
        inv.apply_rgba(&mut px);
        assert!((px[0] - 0.25).abs() < 1e-5);
        assert!((px[1] - 0.5).abs() < 1e-5);
        assert!((px[2] - 0.75).abs() < 1e-5);
    }

    #[test]
    fn clamp_fusion_intersects() {
        let a = RangeOp::clamp(0.0, 1.0);
        let b = RangeOp::clamp(0.25, 2.0);
        let fused = a.compose_clamps(&b).unwrap();
        assert_eq!(fused.min_out, Some(0.25));
        assert_eq!(fused.max_out, Some(1.0));
    }

    #[test]
    fn disjoint_clamps_collapse_to_constant() {
        let a = RangeOp::clamp(0.0, 0.2);
        let b = RangeOp::clamp(0.5, 1.0);
        let fused = a.compose_clamps(&b).unwrap();
        let mut px = [0.9f32, 0.0, 0.1, 1.0];
        fused.apply_rgba(&mut px);
        assert!((px[0] - 0.5).abs() < EPSILON);
        assert!((px[1] - 0.5).abs() < EPSILON);
    }

    #[test]
    fn scaling_ranges_do_not_fuse() {
        let a = RangeOp::new(Some(0.0), Some(1.0), Some(0.0), Some(2.0)).unwrap();
        let b = RangeOp::clamp(0.0, 1.0);
        assert!(a.compose_clamps(&b).is_none());
    }
}
