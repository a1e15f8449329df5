//! Grading curve value types.

use crate::{OpError, OpResult};

use super::spline::{self, SplineData};

/// A single curve control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    /// Position along the input axis.
    pub x: f32,
    /// Output value at `x`.
    pub y: f32,
}

impl ControlPoint {
    /// Creates a control point.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One grading curve: control points plus optional per-point slopes.
///
/// A slope of `0.0` means "estimate from the neighbours"; any non-zero
/// entry switches the whole curve to user slopes.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineCurve {
    /// Interpolated control points, x strictly sorted.
    pub control_points: Vec<ControlPoint>,
    /// Per-point slopes, same length as `control_points`.
    pub slopes: Vec<f32>,
}

impl BSplineCurve {
    /// The identity curve `(0,0) -> (1,1)`.
    pub fn identity() -> Self {
        Self {
            control_points: vec![ControlPoint::new(0.0, 0.0), ControlPoint::new(1.0, 1.0)],
            slopes: vec![0.0, 0.0],
        }
    }

    /// Builds a curve from points with estimated slopes.
    pub fn from_points(points: Vec<ControlPoint>) -> OpResult<Self> {
        let slopes = vec![0.0; points.len()];
        let curve = Self {
            control_points: points,
            slopes,
        };
        curve.validate()?;
        Ok(curve)
    }

    /// Checks the curve is usable: at least two points, slopes aligned
    /// with points, and both coordinates non-decreasing.
    pub fn validate(&self) -> OpResult<()> {
        if self.control_points.len() < 2 {
            return Err(OpError::Invalid(format!(
                "grading curve needs at least 2 control points, got {}",
                self.control_points.len()
            )));
        }
        if self.slopes.len() != self.control_points.len() {
            return Err(OpError::Invalid(format!(
                "grading curve has {} slopes for {} control points",
                self.slopes.len(),
                self.control_points.len()
            )));
        }
        for w in self.control_points.windows(2) {
            if w[1].x <= w[0].x {
                return Err(OpError::Invalid(format!(
                    "grading curve x values must increase: {} then {}",
                    w[0].x, w[1].x
                )));
            }
            if w[1].y < w[0].y {
                return Err(OpError::Invalid(format!(
                    "grading curve y values must not decrease: {} then {}",
                    w[0].y, w[1].y
                )));
            }
        }
        Ok(())
    }

    /// True for the exact identity shape.
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

impl Default for BSplineCurve {
    fn default() -> Self {
        Self::identity()
    }
}

/// Index of the red curve.
pub const CURVE_RED: usize = 0;
/// Index of the green curve.
pub const CURVE_GREEN: usize = 1;
/// Index of the blue curve.
pub const CURVE_BLUE: usize = 2;
/// Index of the master curve, applied to all channels after R/G/B.
pub const CURVE_MASTER: usize = 3;

/// The four curves of an RGB-curve grade: R, G, B, then master.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GradingRgbCurves {
    /// Curves in `[CURVE_RED, CURVE_GREEN, CURVE_BLUE, CURVE_MASTER]` order.
    pub curves: [BSplineCurve; 4],
}

impl GradingRgbCurves {
    /// All four curves at identity.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Validates every curve.
    pub fn validate(&self) -> OpResult<()> {
        for curve in &self.curves {
            curve.validate()?;
        }
        Ok(())
    }

    /// True when no curve changes anything.
    pub fn is_identity(&self) -> bool {
        self.curves.iter().all(BSplineCurve::is_identity)
    }
}

/// Fitted splines for the four curves, rebuilt whenever the curve values
/// change. Identity curves store an empty spline and are skipped.
#[derive(Debug, Clone, Default)]
pub struct PreRenderedCurves {
    splines: [SplineData; 4],
    bypass: [bool; 4],
}

impl PreRenderedCurves {
    /// Fits all four curves.
    pub fn from_curves(curves: &GradingRgbCurves) -> Self {
        let mut out = Self::default();
        for i in 0..4 {
            let curve = &curves.curves[i];
            if curve.is_identity() {
                out.bypass[i] = true;
            } else {
                out.splines[i] = spline::fit_spline(&curve.control_points, &curve.slopes);
            }
        }
        out
    }

    /// True when every curve is identity.
    pub fn is_identity(&self) -> bool {
        self.bypass.iter().all(|&b| b)
    }

    /// Evaluates curve `idx` at `v`.
    #[inline]
    pub fn eval(&self, idx: usize, v: f32) -> f32 {
        if self.bypass[idx] {
            v
        } else {
            spline::eval_curve(&self.splines[idx], v, v)
        }
    }

    /// Inverts curve `idx` at `v`.
    #[inline]
    pub fn eval_rev(&self, idx: usize, v: f32) -> f32 {
        if self.bypass[idx] {
            v
        } else {
            spline::eval_curve_rev(&self.splines[idx], v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_identity() {
        assert!(BSplineCurve::identity().is_identity());
        assert!(GradingRgbCurves::identity().is_identity());
    }

    #[test]
    fn validation_rejects_bad_curves() {
        let too_few = BSplineCurve {
            control_points: vec![ControlPoint::new(0.0, 0.0)],
            slopes: vec![0.0],
        };
        assert!(too_few.validate().is_err());

        let unsorted = BSplineCurve::from_points(vec![
            ControlPoint::new(0.5, 0.0),
            ControlPoint::new(0.5, 1.0),
        ]);
        assert!(unsorted.is_err());

        let decreasing = BSplineCurve::from_points(vec![
            ControlPoint::new(0.0, 1.0),
            ControlPoint::new(1.0, 0.0),
        ]);
        assert!(decreasing.is_err());
    }

    #[test]
    fn prerender_bypasses_identity() {
        let pre = PreRenderedCurves::from_curves(&GradingRgbCurves::identity());
        assert!(pre.is_identity());
        assert_eq!(pre.eval(CURVE_RED, 0.37), 0.37);
        assert_eq!(pre.eval_rev(CURVE_MASTER, -1.5), -1.5);
    }

    #[test]
    fn prerender_fits_non_identity() {
        let mut curves = GradingRgbCurves::identity();
        curves.curves[CURVE_GREEN] = BSplineCurve::from_points(vec![
            ControlPoint::new(0.0, 0.0),
            ControlPoint::new(0.5, 0.6),
            ControlPoint::new(1.0, 1.0),
        ])
        .unwrap();
        let pre = PreRenderedCurves::from_curves(&curves);
        assert!(!pre.is_identity());
        assert!((pre.eval(CURVE_GREEN, 0.5) - 0.6).abs() < 1e-5);
        assert_eq!(pre.eval(CURVE_RED, 0.5), 0.5);
    }
}
