//! Grading operations: primary grade and per-channel RGB curves.
//!
//! Both ops read their parameters through a [`DynamicHandle`] so a grade
//! can be rebound after the op list is built. Static grades use the same
//! path with a private handle.

mod curve;
mod primary;
mod spline;

pub use curve::{
    BSplineCurve, ControlPoint, GradingRgbCurves, PreRenderedCurves, CURVE_BLUE, CURVE_GREEN,
    CURVE_MASTER, CURVE_RED,
};
pub use primary::{GradingPrimary, GradingRgbm};
pub use spline::{eval_curve, eval_curve_rev, fit_spline, SplineData};

use crate::dynamic::{DynamicHandle, DynamicProperty};
use crate::OpResult;

/// Encoding the grade parameters are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GradingStyle {
    /// Log-encoded working values.
    #[default]
    Log,
    /// Scene-linear working values, shaped through a lin-to-log curve
    /// for the curve op.
    Linear,
    /// Display-referred video values.
    Video,
}

// Lin-to-log shaper used by the curve op in `Linear` style. Piecewise:
// linear ramp below the break, pure log2 above, continuous at the join.
const LINLOG_XBRK: f32 = 0.004_131_837_473_948_394_6;
const LINLOG_SHIFT: f32 = -0.000_157_849_851_665_374;
// Slope maps mid-gray to 1 inside the log: m = 1 / (0.18 + shift).
const LINLOG_M: f32 = 1.0 / (0.18 + LINLOG_SHIFT);
const LINLOG_GAIN: f32 = 363.034_608_563;
const LINLOG_OFFS: f32 = -7.0;
const LINLOG_YBRK: f32 = -5.5;
const LOG2_E: f32 = 1.442_695_040_888_963_4;

#[inline]
fn lin_to_log(x: f32) -> f32 {
    if x < LINLOG_XBRK {
        x * LINLOG_GAIN + LINLOG_OFFS
    } else {
        LOG2_E * ((x + LINLOG_SHIFT) * LINLOG_M).ln()
    }
}

#[inline]
fn log_to_lin(x: f32) -> f32 {
    if x < LINLOG_YBRK {
        (x - LINLOG_OFFS) / LINLOG_GAIN
    } else {
        x.exp2() * (0.18 + LINLOG_SHIFT) - LINLOG_SHIFT
    }
}

/// Primary grade op (lift/gamma/gain family) bound to a dynamic handle.
#[derive(Debug, Clone)]
pub struct GradingPrimaryOp {
    prop: DynamicHandle,
    dynamic: bool,
    forward: bool,
}

impl GradingPrimaryOp {
    /// Static grade.
    pub fn new(value: GradingPrimary, forward: bool) -> Self {
        Self {
            prop: DynamicProperty::new_primary(value),
            dynamic: false,
            forward,
        }
    }

    /// Marks the grade as externally adjustable.
    pub fn make_dynamic(&mut self) {
        self.dynamic = true;
    }

    /// The parameter handle.
    pub fn handle(&self) -> &DynamicHandle {
        &self.prop
    }

    /// Rebinds the op to a shared handle.
    pub fn bind(&mut self, handle: DynamicHandle) {
        self.prop = handle;
    }

    /// Snapshot of the current grade.
    pub fn value(&self) -> GradingPrimary {
        self.prop.primary()
    }

    /// True when the grade is externally adjustable.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Direction of the op.
    pub fn is_forward(&self) -> bool {
        self.forward
    }

    /// True when the op can never change a pixel. Dynamic grades are
    /// never no-ops, the value may change later.
    pub fn is_noop(&self) -> bool {
        !self.dynamic && self.value().is_identity()
    }

    /// True when saturation mixes channels (or may, once rebound).
    pub fn has_channel_crosstalk(&self) -> bool {
        self.dynamic || self.value().has_channel_crosstalk()
    }

    /// Same grade in the opposite direction, sharing the handle.
    pub fn inverted(&self) -> GradingPrimaryOp {
        GradingPrimaryOp {
            prop: DynamicHandle::clone(&self.prop),
            dynamic: self.dynamic,
            forward: !self.forward,
        }
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        let gp = self.value();
        if gp.is_identity() {
            return;
        }
        for px in pixels.chunks_exact_mut(4) {
            let rgb = [px[0], px[1], px[2]];
            let out = if self.forward {
                gp.apply(rgb)
            } else {
                gp.apply_inverse(rgb)
            };
            px[0] = out[0];
            px[1] = out[1];
            px[2] = out[2];
            // Alpha unchanged
        }
    }
}

/// RGB curve grade op bound to a dynamic handle.
///
/// Forward order is R, G, B channel curves followed by the master curve
/// on every channel; the inverse runs master first, then the channels.
#[derive(Debug, Clone)]
pub struct GradingRgbCurveOp {
    prop: DynamicHandle,
    style: GradingStyle,
    dynamic: bool,
    forward: bool,
}

impl GradingRgbCurveOp {
    /// Static curve grade. Validates and fits the curves.
    pub fn new(curves: GradingRgbCurves, style: GradingStyle, forward: bool) -> OpResult<Self> {
        Ok(Self {
            prop: DynamicProperty::new_rgb_curves(curves)?,
            style,
            dynamic: false,
            forward,
        })
    }

    /// Marks the curves as externally adjustable.
    pub fn make_dynamic(&mut self) {
        self.dynamic = true;
    }

    /// The parameter handle.
    pub fn handle(&self) -> &DynamicHandle {
        &self.prop
    }

    /// Rebinds the op to a shared handle.
    pub fn bind(&mut self, handle: DynamicHandle) {
        self.prop = handle;
    }

    /// Snapshot of the authored curves.
    pub fn curves(&self) -> GradingRgbCurves {
        self.prop.rgb_curves()
    }

    /// Style the curves are applied under.
    pub fn style(&self) -> GradingStyle {
        self.style
    }

    /// True when the curves are externally adjustable.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Direction of the op.
    pub fn is_forward(&self) -> bool {
        self.forward
    }

    /// True when the op can never change a pixel.
    pub fn is_noop(&self) -> bool {
        !self.dynamic && self.prop.with_prerender(PreRenderedCurves::is_identity)
    }

    /// Same curves in the opposite direction, sharing the handle.
    pub fn inverted(&self) -> GradingRgbCurveOp {
        GradingRgbCurveOp {
            prop: DynamicHandle::clone(&self.prop),
            style: self.style,
            dynamic: self.dynamic,
            forward: !self.forward,
        }
    }

    #[inline]
    fn eval_fwd(pre: &PreRenderedCurves, rgb: [f32; 3]) -> [f32; 3] {
        let mut out = [
            pre.eval(CURVE_RED, rgb[0]),
            pre.eval(CURVE_GREEN, rgb[1]),
            pre.eval(CURVE_BLUE, rgb[2]),
        ];
        for v in &mut out {
            *v = pre.eval(CURVE_MASTER, *v);
        }
        out
    }

    #[inline]
    fn eval_rev(pre: &PreRenderedCurves, rgb: [f32; 3]) -> [f32; 3] {
        let m = [
            pre.eval_rev(CURVE_MASTER, rgb[0]),
            pre.eval_rev(CURVE_MASTER, rgb[1]),
            pre.eval_rev(CURVE_MASTER, rgb[2]),
        ];
        [
            pre.eval_rev(CURVE_RED, m[0]),
            pre.eval_rev(CURVE_GREEN, m[1]),
            pre.eval_rev(CURVE_BLUE, m[2]),
        ]
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        let shaped = self.style == GradingStyle::Linear;
        self.prop.with_prerender(|pre| {
            if pre.is_identity() {
                return;
            }
            for px in pixels.chunks_exact_mut(4) {
                let mut rgb = [px[0], px[1], px[2]];
                if shaped {
                    rgb = [lin_to_log(rgb[0]), lin_to_log(rgb[1]), lin_to_log(rgb[2])];
                }
                rgb = if self.forward {
                    Self::eval_fwd(pre, rgb)
                } else {
                    Self::eval_rev(pre, rgb)
                };
                if shaped {
                    rgb = [log_to_lin(rgb[0]), log_to_lin(rgb[1]), log_to_lin(rgb[2])];
                }
                px[0] = rgb[0];
                px[1] = rgb[1];
                px[2] = rgb[2];
                // Alpha unchanged
            }
        });
    }
}
