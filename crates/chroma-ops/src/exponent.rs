//! Exponent (gamma) operations.
//!
//! Two kernels live here:
//!
//! - [`ExponentOp`] - plain per-channel power function with a choice of
//!   negative-value handling.
//! - [`ExponentWithLinearOp`] - "moncurve" style: a power segment with a
//!   linear toe spliced in below a break point, continuous in value and
//!   slope (sRGB and Rec.709 shapers have this form).

use crate::{OpError, OpResult};

/// Exponents smaller than this cannot be inverted.
const MIN_EXPONENT: f64 = 1e-15;

/// Tolerance for identity detection.
const IDENTITY_TOL: f64 = 1e-6;

/// How a plain power function treats negative input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NegativeStyle {
    /// Clamp negatives to zero before the power.
    #[default]
    Clamp,
    /// Mirror the curve about the origin: `sign(x) * |x|^e`.
    Mirror,
    /// Pass negatives through unchanged.
    PassThru,
}

/// Per-channel power function: `out = in ^ value`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentOp {
    /// Exponent per channel [R, G, B, A].
    pub value: [f64; 4],
    /// Negative-input handling.
    pub style: NegativeStyle,
}

impl ExponentOp {
    /// Creates a validated exponent op.
    pub fn new(value: [f64; 4], style: NegativeStyle) -> OpResult<Self> {
        for v in value {
            if !v.is_finite() || v <= 0.0 {
                return Err(OpError::Invalid(format!("exponent must be positive: {v}")));
            }
        }
        Ok(Self { value, style })
    }

    /// Identity exponent (all ones).
    pub fn identity() -> Self {
        Self {
            value: [1.0; 4],
            style: NegativeStyle::default(),
        }
    }

    /// True when every exponent is 1 within tolerance.
    pub fn is_identity(&self) -> bool {
        self.value.iter().all(|v| (v - 1.0).abs() < IDENTITY_TOL)
    }

    /// Combines two consecutive exponent ops by multiplying exponents.
    /// Styles must match.
    pub fn combine(&self, then: &ExponentOp) -> Option<ExponentOp> {
        if self.style != then.style {
            return None;
        }
        Some(ExponentOp {
            value: [
                self.value[0] * then.value[0],
                self.value[1] * then.value[1],
                self.value[2] * then.value[2],
                self.value[3] * then.value[3],
            ],
            style: self.style,
        })
    }

    /// The inverse op (reciprocal exponents).
    pub fn inverted(&self) -> OpResult<ExponentOp> {
        for v in self.value {
            if v.abs() < MIN_EXPONENT {
                return Err(OpError::NotInvertible("exponent is zero".into()));
            }
        }
        Ok(ExponentOp {
            value: [
                1.0 / self.value[0],
                1.0 / self.value[1],
                1.0 / self.value[2],
                1.0 / self.value[3],
            ],
            style: self.style,
        })
    }

    #[inline]
    fn pow(&self, x: f32, e: f32) -> f32 {
        match self.style {
            NegativeStyle::Clamp => x.max(0.0).powf(e),
            NegativeStyle::Mirror => x.abs().powf(e).copysign(x),
            NegativeStyle::PassThru => {
                if x > 0.0 {
                    x.powf(e)
                } else {
                    x
                }
            }
        }
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        let e = [
            self.value[0] as f32,
            self.value[1] as f32,
            self.value[2] as f32,
            self.value[3] as f32,
        ];
        for px in pixels.chunks_exact_mut(4) {
            for i in 0..4 {
                if e[i] != 1.0 {
                    px[i] = self.pow(px[i], e[i]);
                }
            }
        }
    }
}

/// Power curve with a linear toe below a derived break point.
///
/// For gamma `g` and offset `o` (per channel):
///
/// ```text
/// xBreak = o / (g - 1)
/// K      = o*g / ((g - 1)(1 + o))
/// slope  = g / (1 + o) * K^(g-1)
///
/// y = slope * x                          x <= xBreak
/// y = ((x + o) / (1 + o))^g              x >  xBreak
/// ```
///
/// The two segments meet at `xBreak` with matching value and derivative.
/// Negative input falls on the linear segment. A zero offset degrades to
/// a plain clamped power.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentWithLinearOp {
    /// Gamma per channel [R, G, B, A].
    pub gamma: [f64; 4],
    /// Linear-segment offset per channel [R, G, B, A].
    pub offset: [f64; 4],
    /// False applies the inverse curve.
    pub forward: bool,
}

impl ExponentWithLinearOp {
    /// Creates a validated moncurve op.
    pub fn new(gamma: [f64; 4], offset: [f64; 4], forward: bool) -> OpResult<Self> {
        for i in 0..4 {
            let (g, o) = (gamma[i], offset[i]);
            if !(g.is_finite() && o.is_finite()) || o < 0.0 {
                return Err(OpError::Invalid(format!(
                    "moncurve offset must be non-negative: {o}"
                )));
            }
            if o > 0.0 && g <= 1.0 {
                return Err(OpError::Invalid(format!(
                    "moncurve gamma must exceed 1 when offset is set: {g}"
                )));
            }
            if o == 0.0 && g <= 0.0 {
                return Err(OpError::Invalid(format!("moncurve gamma must be positive: {g}")));
            }
        }
        Ok(Self {
            gamma,
            offset,
            forward,
        })
    }

    /// True when every channel passes values through unchanged.
    pub fn is_identity(&self) -> bool {
        (0..4).all(|i| {
            (self.gamma[i] - 1.0).abs() < IDENTITY_TOL && self.offset[i].abs() < IDENTITY_TOL
        })
    }

    /// The inverse op (same parameters, opposite direction).
    pub fn inverted(&self) -> ExponentWithLinearOp {
        ExponentWithLinearOp {
            gamma: self.gamma,
            offset: self.offset,
            forward: !self.forward,
        }
    }

    #[inline]
    fn fwd(x: f32, g: f64, o: f64) -> f32 {
        if o == 0.0 {
            return (f64::from(x).max(0.0).powf(g)) as f32;
        }
        let x_break = o / (g - 1.0);
        let xd = f64::from(x);
        if xd <= x_break {
            let k = o * g / ((g - 1.0) * (1.0 + o));
            let slope = g / (1.0 + o) * k.powf(g - 1.0);
            (slope * xd) as f32
        } else {
            (((xd + o) / (1.0 + o)).powf(g)) as f32
        }
    }

    #[inline]
    fn rev(y: f32, g: f64, o: f64) -> f32 {
        if o == 0.0 {
            return (f64::from(y).max(0.0).powf(1.0 / g)) as f32;
        }
        let k = o * g / ((g - 1.0) * (1.0 + o));
        let y_break = k.powf(g);
        let slope = g / (1.0 + o) * k.powf(g - 1.0);
        let yd = f64::from(y);
        if yd <= y_break {
            (yd / slope) as f32
        } else {
            ((1.0 + o) * yd.powf(1.0 / g) - o) as f32
        }
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        for px in pixels.chunks_exact_mut(4) {
            for i in 0..4 {
                let (g, o) = (self.gamma[i], self.offset[i]);
                if (g - 1.0).abs() < IDENTITY_TOL && o == 0.0 {
                    continue;
                }
                px[i] = if self.forward {
                    Self::fwd(px[i], g, o)
                } else {
                    Self::rev(px[i], g, o)
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn identity_passthrough() {
        let op = ExponentOp::identity();
        assert!(op.is_identity());
        let mut px = [0.5f32, -0.25, 2.0, 1.0];
        op.apply_rgba(&mut px);
        assert_eq!(px, [0.5, -0.25, 2.0, 1.0]);
    }

    #[test]
    fn clamp_style_zeroes_negatives() {
        let op = ExponentOp::new([2.2, 2.2, 2.2, 1.0], NegativeStyle::Clamp).unwrap();
        let mut px = [-0.5f32, 0.5, 1.0, 0.5];
        op.apply_rgba(&mut px);
        assert_eq!(px[0], 0.0);
        assert!((px[1] - 0.5f32.powf(2.2)).abs() < EPSILON);
        assert_eq!(px[3], 0.5);
    }

    #[test]
    fn mirror_style_is_odd() {
        let op = ExponentOp::new([2.0, 2.0, 2.0, 1.0], NegativeStyle::Mirror).unwrap();
        let mut px = [-0.5f32, 0.5, 0.0, 1.0];
        op.apply_rgba(&mut px);
        assert!((px[0] + 0.25).abs() < EPSILON);
        assert!((px[1] - 0.25).abs() < EPSILON);
    }

    #[test]
    fn passthru_leaves_negatives() {
        let op = ExponentOp::new([2.0, 2.0, 2.0, 1.0], NegativeStyle::PassThru).unwrap();
        let mut px = [-0.5f32, 0.5, 0.0, 1.0];
        op.apply_rgba(&mut px);
        assert_eq!(px[0], -0.5);
    }

    #[test]
    fn combine_multiplies() {
        let a = ExponentOp::new([2.0, 2.0, 2.0, 1.0], NegativeStyle::Clamp).unwrap();
        let b = ExponentOp::new([0.5, 0.5, 0.5, 1.0], NegativeStyle::Clamp).unwrap();
        let c = a.combine(&b).unwrap();
        assert!(c.is_identity());
    }

    #[test]
    fn inverse_round_trips() {
        let op = ExponentOp::new([2.4, 2.4, 2.4, 1.0], NegativeStyle::Clamp).unwrap();
        let inv = op.inverted().unwrap();
        let mut px = [0.18f32, 0.5, 0.9, 1.0];
        op.apply_rgba(&mut px);
        inv.apply_rgba(&mut px);
        assert!((px[0] - 0.18).abs() < EPSILON);
        assert!((px[1] - 0.5).abs() < EPSILON);
    }

    #[test]
    fn moncurve_continuous_at_break() {
        let g = 2.4;
        let o = 0.055;
        let x_break = (o / (g - 1.0)) as f32;
        let below = ExponentWithLinearOp::fwd(x_break - 1e-6, g, o);
        let above = ExponentWithLinearOp::fwd(x_break + 1e-6, g, o);
        assert!((below - above).abs() < 1e-5);
    }

    #[test]
    fn moncurve_matches_srgb_midtone() {
        // sRGB decode: ((x + 0.055) / 1.055)^2.4 above the toe.
        let y = ExponentWithLinearOp::fwd(0.5, 2.4, 0.055);
        let expect = ((0.5f64 + 0.055) / 1.055).powf(2.4) as f32;
        assert!((y - expect).abs() < 1e-6);
    }

    #[test]
    fn moncurve_round_trips() {
        let op =
            ExponentWithLinearOp::new([2.4; 4], [0.055; 4], true).unwrap();
        let inv = op.inverted();
        for v in [-0.1f32, 0.0, 0.01, 0.18, 0.5, 1.0, 2.0] {
            let mut px = [v, v, v, 1.0];
            op.apply_rgba(&mut px);
            inv.apply_rgba(&mut px);
            assert!((px[0] - v).abs() < 1e-5, "v = {v}, got {}", px[0]);
        }
    }

    #[test]
    fn moncurve_negative_is_linear() {
        let y = ExponentWithLinearOp::fwd(-0.2, 2.4, 0.055);
        let y2 = ExponentWithLinearOp::fwd(-0.4, 2.4, 0.055);
        assert!((y2 - 2.0 * y).abs() < 1e-6);
    }

    #[test]
    fn moncurve_validation() {
        assert!(ExponentWithLinearOp::new([1.0; 4], [0.1; 4], true).is_err());
        assert!(ExponentWithLinearOp::new([2.2; 4], [-0.1; 4], true).is_err());
    }
}
