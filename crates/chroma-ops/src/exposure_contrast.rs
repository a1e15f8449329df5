//! Exposure and contrast adjustment with dynamic parameters.
//!
//! Exposure is in stops, contrast and gamma multiply into a single
//! effective contrast, and everything pivots around a static mid value.
//! All three parameters live behind [`DynamicHandle`]s so viewers can
//! drag them after the processor is built.

use crate::dynamic::{DynamicHandle, DynamicProperty, DynamicPropertyKind};

/// Approximate power relating scene values to video code values.
const VIDEO_OETF_POWER: f64 = 0.546_448_087_431_693_93;

/// Pivot floor, keeps the normalization away from zero.
const MIN_PIVOT: f64 = 0.001;

/// Effective contrast floor.
const MIN_CONTRAST: f64 = 0.001;

/// Default stops-to-log-units step for the logarithmic style.
pub const LOG_EXPOSURE_STEP_DEFAULT: f64 = 0.088;

/// Default log-space mid gray for the logarithmic style.
pub const LOG_MIDGRAY_DEFAULT: f64 = 0.435;

/// Encoding the adjustment operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExposureContrastStyle {
    /// Scene-linear values.
    #[default]
    Linear,
    /// Video code values; exposure and pivot are pre-shaped by the OETF
    /// power.
    Video,
    /// Log-encoded values; exposure becomes an offset.
    Logarithmic,
}

/// Exposure/contrast/gamma op.
#[derive(Debug, Clone)]
pub struct ExposureContrastOp {
    style: ExposureContrastStyle,
    exposure: DynamicHandle,
    contrast: DynamicHandle,
    gamma: DynamicHandle,
    /// Static contrast pivot.
    pub pivot: f64,
    /// Stops-to-log-units step (logarithmic style).
    pub log_exposure_step: f64,
    /// Log-space mid gray (logarithmic style).
    pub log_midgray: f64,
    dynamic_exposure: bool,
    dynamic_contrast: bool,
    dynamic_gamma: bool,
    forward: bool,
}

impl ExposureContrastOp {
    /// Creates the op with static parameter values.
    pub fn new(
        style: ExposureContrastStyle,
        exposure: f64,
        contrast: f64,
        gamma: f64,
        pivot: f64,
        forward: bool,
    ) -> Self {
        Self {
            style,
            exposure: DynamicProperty::new_double(DynamicPropertyKind::Exposure, exposure),
            contrast: DynamicProperty::new_double(DynamicPropertyKind::Contrast, contrast),
            gamma: DynamicProperty::new_double(DynamicPropertyKind::Gamma, gamma),
            pivot,
            log_exposure_step: LOG_EXPOSURE_STEP_DEFAULT,
            log_midgray: LOG_MIDGRAY_DEFAULT,
            dynamic_exposure: false,
            dynamic_contrast: false,
            dynamic_gamma: false,
            forward,
        }
    }

    /// Style of the op.
    pub fn style(&self) -> ExposureContrastStyle {
        self.style
    }

    /// Direction of the op.
    pub fn is_forward(&self) -> bool {
        self.forward
    }

    /// Makes exposure externally adjustable.
    pub fn make_exposure_dynamic(&mut self) {
        self.dynamic_exposure = true;
    }

    /// Makes contrast externally adjustable.
    pub fn make_contrast_dynamic(&mut self) {
        self.dynamic_contrast = true;
    }

    /// Makes gamma externally adjustable.
    pub fn make_gamma_dynamic(&mut self) {
        self.dynamic_gamma = true;
    }

    /// The exposure handle.
    pub fn exposure(&self) -> &DynamicHandle {
        &self.exposure
    }

    /// The contrast handle.
    pub fn contrast(&self) -> &DynamicHandle {
        &self.contrast
    }

    /// The gamma handle.
    pub fn gamma(&self) -> &DynamicHandle {
        &self.gamma
    }

    /// Rebinds one parameter to a shared handle, matched by kind.
    pub fn bind(&mut self, handle: DynamicHandle) {
        match handle.kind() {
            DynamicPropertyKind::Exposure => self.exposure = handle,
            DynamicPropertyKind::Contrast => self.contrast = handle,
            DynamicPropertyKind::Gamma => self.gamma = handle,
            _ => {}
        }
    }

    /// Handles that have been marked dynamic.
    pub fn dynamic_handles(&self) -> Vec<DynamicHandle> {
        let mut out = Vec::new();
        if self.dynamic_exposure {
            out.push(DynamicHandle::clone(&self.exposure));
        }
        if self.dynamic_contrast {
            out.push(DynamicHandle::clone(&self.contrast));
        }
        if self.dynamic_gamma {
            out.push(DynamicHandle::clone(&self.gamma));
        }
        out
    }

    /// True when any parameter is externally adjustable.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic_exposure || self.dynamic_contrast || self.dynamic_gamma
    }

    /// True when the op can never change a pixel. Any dynamic parameter
    /// disqualifies it, the value may change later.
    pub fn is_noop(&self) -> bool {
        !self.is_dynamic()
            && self.exposure.double() == 0.0
            && self.contrast.double() == 1.0
            && self.gamma.double() == 1.0
    }

    /// Same parameters in the opposite direction, sharing the handles.
    pub fn inverted(&self) -> ExposureContrastOp {
        let mut inv = self.clone();
        inv.forward = !self.forward;
        inv
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        let exposure = self.exposure.double();
        let contrast = (self.contrast.double() * self.gamma.double()).max(MIN_CONTRAST);

        match self.style {
            ExposureContrastStyle::Linear => {
                let gain = exposure.exp2();
                let pivot = self.pivot.max(MIN_PIVOT);
                self.apply_gain_pow(pixels, gain, contrast, pivot);
            }
            ExposureContrastStyle::Video => {
                let gain = exposure.exp2().powf(VIDEO_OETF_POWER);
                let pivot = self.pivot.max(MIN_PIVOT).powf(VIDEO_OETF_POWER);
                self.apply_gain_pow(pixels, gain, contrast, pivot);
            }
            ExposureContrastStyle::Logarithmic => {
                let log_pivot = ((self.pivot.max(MIN_PIVOT) / 0.18).log2()
                    * self.log_exposure_step
                    + self.log_midgray)
                    .max(0.0);
                let offset =
                    (exposure * self.log_exposure_step - log_pivot) * contrast + log_pivot;
                if self.forward {
                    for v in rgb_values(pixels) {
                        *v = (f64::from(*v) * contrast + offset) as f32;
                    }
                } else {
                    for v in rgb_values(pixels) {
                        *v = ((f64::from(*v) - offset) / contrast) as f32;
                    }
                }
            }
        }
    }

    /// Gain then power around the pivot, shared by linear and video.
    fn apply_gain_pow(&self, pixels: &mut [f32], gain: f64, contrast: f64, pivot: f64) {
        if self.forward {
            if contrast == 1.0 {
                for v in rgb_values(pixels) {
                    *v = (f64::from(*v) * gain) as f32;
                }
            } else {
                for v in rgb_values(pixels) {
                    let t = f64::from(*v) * gain / pivot;
                    *v = (t.max(0.0).powf(contrast) * pivot) as f32;
                }
            }
        } else if contrast == 1.0 {
            for v in rgb_values(pixels) {
                *v = (f64::from(*v) / gain) as f32;
            }
        } else {
            for v in rgb_values(pixels) {
                let t = (f64::from(*v) / pivot).max(0.0).powf(1.0 / contrast);
                *v = (t * pivot / gain) as f32;
            }
        }
    }
}

/// RGB components of an RGBA buffer, skipping alpha.
fn rgb_values(pixels: &mut [f32]) -> impl Iterator<Item = &mut f32> {
    pixels
        .chunks_exact_mut(4)
        .flat_map(|px| px[..3].iter_mut())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn identity_is_noop() {
        let op = ExposureContrastOp::new(ExposureContrastStyle::Linear, 0.0, 1.0, 1.0, 0.18, true);
        assert!(op.is_noop());
        let mut px = [0.5f32, -0.25, 2.0, 0.7];
        op.apply_rgba(&mut px);
        assert!((px[0] - 0.5).abs() < EPSILON);
        assert!((px[1] + 0.25).abs() < EPSILON);
        assert!((px[3] - 0.7).abs() < EPSILON);
    }

    #[test]
    fn linear_exposure_doubles_per_stop() {
        let op = ExposureContrastOp::new(ExposureContrastStyle::Linear, 1.0, 1.0, 1.0, 0.18, true);
        let mut px = [0.18f32, 0.5, 0.0, 1.0];
        op.apply_rgba(&mut px);
        assert!((px[0] - 0.36).abs() < EPSILON);
        assert!((px[1] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn linear_contrast_pivots() {
        let op = ExposureContrastOp::new(ExposureContrastStyle::Linear, 0.0, 1.5, 1.0, 0.18, true);
        let mut px = [0.18f32, 0.36, 0.09, 1.0];
        op.apply_rgba(&mut px);
        // Pivot value is unchanged, values above move away, below move in.
        assert!((px[0] - 0.18).abs() < EPSILON);
        assert!(px[1] > 0.36);
        assert!(px[2] < 0.09);
    }

    #[test]
    fn linear_round_trips() {
        let op = ExposureContrastOp::new(ExposureContrastStyle::Linear, 0.7, 1.3, 1.1, 0.18, true);
        let inv = op.inverted();
        let mut px = [0.1f32, 0.5, 1.2, 1.0];
        op.apply_rgba(&mut px);
        inv.apply_rgba(&mut px);
        assert!((px[0] - 0.1).abs() < 1e-4);
        assert!((px[1] - 0.5).abs() < 1e-4);
        assert!((px[2] - 1.2).abs() < 1e-4);
    }

    #[test]
    fn video_round_trips() {
        let op = ExposureContrastOp::new(ExposureContrastStyle::Video, -0.5, 1.2, 1.0, 0.18, true);
        let inv = op.inverted();
        let mut px = [0.2f32, 0.6, 0.9, 1.0];
        op.apply_rgba(&mut px);
        inv.apply_rgba(&mut px);
        assert!((px[0] - 0.2).abs() < 1e-4);
        assert!((px[1] - 0.6).abs() < 1e-4);
    }

    #[test]
    fn log_style_is_affine() {
        let op =
            ExposureContrastOp::new(ExposureContrastStyle::Logarithmic, 0.0, 1.0, 1.0, 0.18, true);
        let mut px = [0.435f32, 0.2, 0.8, 1.0];
        op.apply_rgba(&mut px);
        // Identity parameters leave log values alone.
        assert!((px[0] - 0.435).abs() < EPSILON);
        assert!((px[1] - 0.2).abs() < EPSILON);

        let op =
            ExposureContrastOp::new(ExposureContrastStyle::Logarithmic, 1.0, 1.0, 1.0, 0.18, true);
        let mut px = [0.435f32, 0.0, 0.0, 1.0];
        op.apply_rgba(&mut px);
        // One stop in log units is one exposure step.
        assert!((px[0] - (0.435 + 0.088)).abs() < EPSILON, "got {}", px[0]);
    }

    #[test]
    fn log_round_trips() {
        let op =
            ExposureContrastOp::new(ExposureContrastStyle::Logarithmic, 0.8, 1.4, 0.9, 0.18, true);
        let inv = op.inverted();
        let mut px = [0.1f32, 0.435, 0.9, 1.0];
        op.apply_rgba(&mut px);
        inv.apply_rgba(&mut px);
        assert!((px[0] - 0.1).abs() < 1e-5);
        assert!((px[1] - 0.435).abs() < 1e-5);
    }

    #[test]
    fn dynamic_exposure_write_changes_output() {
        let mut op =
            ExposureContrastOp::new(ExposureContrastStyle::Linear, 0.0, 1.0, 1.0, 0.18, true);
        op.make_exposure_dynamic();
        assert!(op.is_dynamic());
        assert!(!op.is_noop());
        assert_eq!(op.dynamic_handles().len(), 1);

        op.exposure().set_double(1.0).unwrap();
        let mut px = [0.18f32, 0.18, 0.18, 1.0];
        op.apply_rgba(&mut px);
        assert!((px[0] - 0.36).abs() < EPSILON);
    }

    #[test]
    fn effective_contrast_is_floored() {
        let op =
            ExposureContrastOp::new(ExposureContrastStyle::Linear, 0.0, 0.0, 0.0, 0.18, true);
        let mut px = [0.5f32, 0.5, 0.5, 1.0];
        op.apply_rgba(&mut px);
        // contrast*gamma of zero clamps to MIN_CONTRAST instead of
        // flattening everything to the pivot.
        let expect = ((0.5f64 / 0.18).powf(0.001) * 0.18) as f32;
        assert!((px[0] - expect).abs() < EPSILON);
    }
}
