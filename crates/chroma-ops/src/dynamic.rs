//! Shared dynamic parameter handles.
//!
//! A dynamic property is a value an application can change after a
//! processor has been built, without recompiling the op list. Ops hold an
//! [`Arc`] to the property; the processor hands out the same `Arc` so a
//! write is visible to every op bound to that kind.

use std::sync::{Arc, RwLock};

use crate::grading::{GradingPrimary, GradingRgbCurves, GradingStyle, PreRenderedCurves};
use crate::{OpError, OpResult};

/// Which parameter a dynamic property stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicPropertyKind {
    /// Exposure in stops.
    Exposure,
    /// Contrast multiplier.
    Contrast,
    /// Gamma exponent.
    Gamma,
    /// A full primary grade.
    GradingPrimary,
    /// An RGB curve grade.
    GradingRgbCurve,
    /// A tone grade.
    GradingTone,
}

/// Current value of a dynamic property.
#[derive(Debug, Clone)]
pub enum DynamicValue {
    /// Scalar parameter (exposure, contrast, gamma).
    Double(f64),
    /// Primary grade parameters.
    Primary(GradingPrimary),
    /// Curve grade with its fitted splines.
    RgbCurves {
        /// The authored control points.
        curves: GradingRgbCurves,
        /// Splines refitted on every write.
        prerender: PreRenderedCurves,
    },
}

/// A mutable parameter slot shared between ops and the application.
#[derive(Debug)]
pub struct DynamicProperty {
    kind: DynamicPropertyKind,
    value: RwLock<DynamicValue>,
}

/// Shared handle to a [`DynamicProperty`].
pub type DynamicHandle = Arc<DynamicProperty>;

impl DynamicProperty {
    /// New scalar property.
    pub fn new_double(kind: DynamicPropertyKind, value: f64) -> DynamicHandle {
        Arc::new(Self {
            kind,
            value: RwLock::new(DynamicValue::Double(value)),
        })
    }

    /// New primary-grade property.
    pub fn new_primary(value: GradingPrimary) -> DynamicHandle {
        Arc::new(Self {
            kind: DynamicPropertyKind::GradingPrimary,
            value: RwLock::new(DynamicValue::Primary(value)),
        })
    }

    /// New curve-grade property. Validates and fits the curves.
    pub fn new_rgb_curves(curves: GradingRgbCurves) -> OpResult<DynamicHandle> {
        curves.validate()?;
        let prerender = PreRenderedCurves::from_curves(&curves);
        Ok(Arc::new(Self {
            kind: DynamicPropertyKind::GradingRgbCurve,
            value: RwLock::new(DynamicValue::RgbCurves { curves, prerender }),
        }))
    }

    /// The parameter this property stands for.
    pub fn kind(&self) -> DynamicPropertyKind {
        self.kind
    }

    /// Reads the scalar value. Non-scalar properties yield 0.
    pub fn double(&self) -> f64 {
        let guard = self.value.read().unwrap_or_else(|e| e.into_inner());
        match &*guard {
            DynamicValue::Double(v) => *v,
            _ => {
                debug_assert!(false, "dynamic property {:?} is not a scalar", self.kind);
                0.0
            }
        }
    }

    /// Replaces the scalar value.
    pub fn set_double(&self, value: f64) -> OpResult<()> {
        let mut guard = self.value.write().unwrap_or_else(|e| e.into_inner());
        match &mut *guard {
            DynamicValue::Double(v) => {
                *v = value;
                Ok(())
            }
            _ => Err(OpError::Invalid(format!(
                "dynamic property {:?} does not hold a scalar",
                self.kind
            ))),
        }
    }

    /// Snapshot of the primary grade. Non-primary properties yield the
    /// identity grade.
    pub fn primary(&self) -> GradingPrimary {
        let guard = self.value.read().unwrap_or_else(|e| e.into_inner());
        match &*guard {
            DynamicValue::Primary(p) => p.clone(),
            _ => {
                debug_assert!(false, "dynamic property {:?} is not a primary grade", self.kind);
                GradingPrimary::identity(GradingStyle::Log)
            }
        }
    }

    /// Replaces the primary grade.
    pub fn set_primary(&self, value: GradingPrimary) -> OpResult<()> {
        let mut guard = self.value.write().unwrap_or_else(|e| e.into_inner());
        match &mut *guard {
            DynamicValue::Primary(p) => {
                *p = value;
                Ok(())
            }
            _ => Err(OpError::Invalid(format!(
                "dynamic property {:?} does not hold a primary grade",
                self.kind
            ))),
        }
    }

    /// Snapshot of the authored curves. Non-curve properties yield
    /// identity curves.
    pub fn rgb_curves(&self) -> GradingRgbCurves {
        let guard = self.value.read().unwrap_or_else(|e| e.into_inner());
        match &*guard {
            DynamicValue::RgbCurves { curves, .. } => curves.clone(),
            _ => {
                debug_assert!(false, "dynamic property {:?} is not a curve grade", self.kind);
                GradingRgbCurves::identity()
            }
        }
    }

    /// Runs `f` against the fitted curves under the read lock.
    pub fn with_prerender<R>(&self, f: impl FnOnce(&PreRenderedCurves) -> R) -> R {
        let guard = self.value.read().unwrap_or_else(|e| e.into_inner());
        match &*guard {
            DynamicValue::RgbCurves { prerender, .. } => f(prerender),
            _ => {
                debug_assert!(false, "dynamic property {:?} is not a curve grade", self.kind);
                f(&PreRenderedCurves::default())
            }
        }
    }

    /// Replaces the curves, refitting the splines before the write is
    /// visible to any apply.
    pub fn set_rgb_curves(&self, new_curves: GradingRgbCurves) -> OpResult<()> {
        new_curves.validate()?;
        let fitted = PreRenderedCurves::from_curves(&new_curves);
        let mut guard = self.value.write().unwrap_or_else(|e| e.into_inner());
        match &mut *guard {
            DynamicValue::RgbCurves { curves, prerender } => {
                *curves = new_curves;
                *prerender = fitted;
                Ok(())
            }
            _ => Err(OpError::Invalid(format!(
                "dynamic property {:?} does not hold curves",
                self.kind
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::{BSplineCurve, ControlPoint, CURVE_MASTER};

    #[test]
    fn scalar_read_write() {
        let h = DynamicProperty::new_double(DynamicPropertyKind::Exposure, 1.5);
        assert_eq!(h.kind(), DynamicPropertyKind::Exposure);
        assert_eq!(h.double(), 1.5);
        h.set_double(-0.25).unwrap();
        assert_eq!(h.double(), -0.25);
    }

    #[test]
    fn shared_handle_sees_writes() {
        let h = DynamicProperty::new_double(DynamicPropertyKind::Contrast, 1.0);
        let other = Arc::clone(&h);
        h.set_double(2.0).unwrap();
        assert_eq!(other.double(), 2.0);
    }

    #[test]
    fn curve_write_refits() {
        let h = DynamicProperty::new_rgb_curves(GradingRgbCurves::identity()).unwrap();
        h.with_prerender(|pre| assert!(pre.is_identity()));

        let mut curves = GradingRgbCurves::identity();
        curves.curves[CURVE_MASTER] = BSplineCurve::from_points(vec![
            ControlPoint::new(0.0, 0.0),
            ControlPoint::new(0.5, 0.6),
            ControlPoint::new(1.0, 1.0),
        ])
        .unwrap();
        h.set_rgb_curves(curves).unwrap();
        h.with_prerender(|pre| {
            assert!(!pre.is_identity());
            assert!((pre.eval(CURVE_MASTER, 0.5) - 0.6).abs() < 1e-5);
        });
    }

    #[test]
    fn wrong_variant_write_is_an_error() {
        let h = DynamicProperty::new_double(DynamicPropertyKind::Gamma, 1.0);
        assert!(h.set_rgb_curves(GradingRgbCurves::identity()).is_err());
    }
}
