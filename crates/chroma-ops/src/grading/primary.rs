//! Primary grading value types: lift/gamma/gain style controls.

use chroma_core::REC709_LUMA;

use super::GradingStyle;

/// Parameters this small are clamped before division in the inverses.
const MIN_DIVISOR: f32 = 1e-6;

/// Identity tolerance for per-stage skip checks.
const STAGE_TOL: f32 = 1e-6;

/// Per-channel control with a master that spans all three.
///
/// Additive stages use `channel + master`, multiplicative stages
/// `channel * master`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingRgbm {
    /// Red adjustment.
    pub red: f32,
    /// Green adjustment.
    pub green: f32,
    /// Blue adjustment.
    pub blue: f32,
    /// Master adjustment applied to every channel.
    pub master: f32,
}

impl GradingRgbm {
    /// All channels zero.
    pub fn zero() -> Self {
        Self::uniform(0.0)
    }

    /// All channels one.
    pub fn one() -> Self {
        Self::uniform(1.0)
    }

    /// Every field set to `v`.
    pub fn uniform(v: f32) -> Self {
        Self {
            red: v,
            green: v,
            blue: v,
            master: v,
        }
    }

    /// Effective RGB for additive stages.
    #[inline]
    pub fn rgb_add(&self) -> [f32; 3] {
        [
            self.red + self.master,
            self.green + self.master,
            self.blue + self.master,
        ]
    }

    /// Effective RGB for multiplicative stages.
    #[inline]
    pub fn rgb_mul(&self) -> [f32; 3] {
        [
            self.red * self.master,
            self.green * self.master,
            self.blue * self.master,
        ]
    }
}

impl Default for GradingRgbm {
    fn default() -> Self {
        Self::zero()
    }
}

/// Primary grade parameters.
///
/// Which fields take part depends on the style:
///
/// - `Log`: brightness, contrast around `pivot`, gamma between the black
///   and white pivots, saturation, clamp.
/// - `Linear`: offset, exposure (stops), contrast around `pivot`,
///   saturation, clamp.
/// - `Video`: lift+offset, gain*contrast around the black pivot, gamma,
///   saturation, clamp.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingPrimary {
    /// Grade style the parameters are interpreted under.
    pub style: GradingStyle,

    /// Additive brightness (Log).
    pub brightness: GradingRgbm,
    /// Multiplicative contrast around the pivot.
    pub contrast: GradingRgbm,
    /// Power applied between the black and white pivots.
    pub gamma: GradingRgbm,
    /// Additive offset (Linear, Video).
    pub offset: GradingRgbm,
    /// Exposure in stops (Linear).
    pub exposure: GradingRgbm,
    /// Shadow lift (Video).
    pub lift: GradingRgbm,
    /// Highlight gain (Video).
    pub gain: GradingRgbm,

    /// Saturation against Rec.709 luma, 1.0 = unchanged.
    pub saturation: f32,
    /// Contrast pivot.
    pub pivot: f32,
    /// Lower gamma pivot.
    pub pivot_black: f32,
    /// Upper gamma pivot.
    pub pivot_white: f32,
    /// Final clamp floor.
    pub clamp_black: f32,
    /// Final clamp ceiling.
    pub clamp_white: f32,
}

impl GradingPrimary {
    /// Identity grade for a style, with the style's customary pivot.
    pub fn identity(style: GradingStyle) -> Self {
        let pivot = match style {
            GradingStyle::Log => -0.2,
            GradingStyle::Linear | GradingStyle::Video => 0.18,
        };
        Self {
            style,
            brightness: GradingRgbm::zero(),
            contrast: GradingRgbm::one(),
            gamma: GradingRgbm::one(),
            offset: GradingRgbm::zero(),
            exposure: GradingRgbm::zero(),
            lift: GradingRgbm::zero(),
            gain: GradingRgbm::one(),
            saturation: 1.0,
            pivot,
            pivot_black: 0.0,
            pivot_white: 1.0,
            clamp_black: f32::NEG_INFINITY,
            clamp_white: f32::INFINITY,
        }
    }

    /// True when the grade changes nothing.
    pub fn is_identity(&self) -> bool {
        self.saturation == 1.0
            && self.clamp_black == f32::NEG_INFINITY
            && self.clamp_white == f32::INFINITY
            && self.brightness == GradingRgbm::zero()
            && self.contrast == GradingRgbm::one()
            && self.gamma == GradingRgbm::one()
            && self.offset == GradingRgbm::zero()
            && self.exposure == GradingRgbm::zero()
            && self.lift == GradingRgbm::zero()
            && self.gain == GradingRgbm::one()
    }

    /// True when saturation mixes channels.
    pub fn has_channel_crosstalk(&self) -> bool {
        (self.saturation - 1.0).abs() >= STAGE_TOL
    }

    /// Forward grade of one RGB triple.
    #[inline]
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        match self.style {
            GradingStyle::Log => self.apply_log(rgb),
            GradingStyle::Linear => self.apply_linear(rgb),
            GradingStyle::Video => self.apply_video(rgb),
        }
    }

    /// Inverse grade of one RGB triple.
    #[inline]
    pub fn apply_inverse(&self, rgb: [f32; 3]) -> [f32; 3] {
        match self.style {
            GradingStyle::Log => self.apply_log_inv(rgb),
            GradingStyle::Linear => self.apply_linear_inv(rgb),
            GradingStyle::Video => self.apply_video_inv(rgb),
        }
    }

    // ====================================================================
    // Log style
    // ====================================================================

    fn apply_log(&self, rgb: [f32; 3]) -> [f32; 3] {
        let brightness = self.brightness.rgb_add();
        let contrast = self.contrast.rgb_mul();
        let gamma = self.gamma.rgb_mul();

        let mut out = rgb;
        for ch in 0..3 {
            out[ch] += brightness[ch];
            out[ch] = (out[ch] - self.pivot) * contrast[ch] + self.pivot;
        }
        if !is_one(&gamma) {
            let range = self.pivot_white - self.pivot_black;
            for ch in 0..3 {
                out[ch] = self.gamma_channel(out[ch], gamma[ch], range);
            }
        }
        out = self.saturate(out);
        self.clamp(out)
    }

    fn apply_log_inv(&self, rgb: [f32; 3]) -> [f32; 3] {
        let brightness = self.brightness.rgb_add();
        let contrast = self.contrast.rgb_mul();
        let gamma = self.gamma.rgb_mul();

        let mut out = self.clamp(rgb);
        out = self.saturate_inv(out);
        if !is_one(&gamma) {
            let range = self.pivot_white - self.pivot_black;
            for ch in 0..3 {
                let inv_g = 1.0 / gamma[ch].abs().max(MIN_DIVISOR);
                out[ch] = self.gamma_channel(out[ch], inv_g, range);
            }
        }
        for ch in 0..3 {
            let inv_c = 1.0 / contrast[ch].abs().max(MIN_DIVISOR);
            out[ch] = (out[ch] - self.pivot) * inv_c + self.pivot;
            out[ch] -= brightness[ch];
        }
        out
    }

    // ====================================================================
    // Linear style
    // ====================================================================

    fn apply_linear(&self, rgb: [f32; 3]) -> [f32; 3] {
        let offset = self.offset.rgb_add();
        let exposure = self.exposure_mul();
        let contrast = self.contrast.rgb_mul();

        let mut out = rgb;
        for ch in 0..3 {
            out[ch] = (out[ch] + offset[ch]) * exposure[ch];
        }
        if !is_one(&contrast) {
            for ch in 0..3 {
                out[ch] = (out[ch] / self.pivot).abs().powf(contrast[ch])
                    * out[ch].signum()
                    * self.pivot;
            }
        }
        out = self.saturate(out);
        self.clamp(out)
    }

    fn apply_linear_inv(&self, rgb: [f32; 3]) -> [f32; 3] {
        let offset = self.offset.rgb_add();
        let exposure = self.exposure_mul();
        let contrast = self.contrast.rgb_mul();

        let mut out = self.clamp(rgb);
        out = self.saturate_inv(out);
        if !is_one(&contrast) {
            for ch in 0..3 {
                let inv_c = 1.0 / contrast[ch].abs().max(MIN_DIVISOR);
                out[ch] =
                    (out[ch] / self.pivot).abs().powf(inv_c) * out[ch].signum() * self.pivot;
            }
        }
        for ch in 0..3 {
            out[ch] /= exposure[ch].abs().max(MIN_DIVISOR);
            out[ch] -= offset[ch];
        }
        out
    }

    // ====================================================================
    // Video style
    // ====================================================================

    fn apply_video(&self, rgb: [f32; 3]) -> [f32; 3] {
        let offset = self.video_offset();
        let slope = self.video_slope();
        let gamma = self.gamma.rgb_mul();

        let mut out = rgb;
        for ch in 0..3 {
            out[ch] += offset[ch];
            out[ch] = (out[ch] - self.pivot_black) * slope[ch] + self.pivot_black;
        }
        if !is_one(&gamma) {
            let range = self.pivot_white - self.pivot_black;
            for ch in 0..3 {
                out[ch] = self.gamma_channel(out[ch], gamma[ch], range);
            }
        }
        out = self.saturate(out);
        self.clamp(out)
    }

    fn apply_video_inv(&self, rgb: [f32; 3]) -> [f32; 3] {
        let offset = self.video_offset();
        let slope = self.video_slope();
        let gamma = self.gamma.rgb_mul();

        let mut out = self.clamp(rgb);
        out = self.saturate_inv(out);
        if !is_one(&gamma) {
            let range = self.pivot_white - self.pivot_black;
            for ch in 0..3 {
                let inv_g = 1.0 / gamma[ch].abs().max(MIN_DIVISOR);
                out[ch] = self.gamma_channel(out[ch], inv_g, range);
            }
        }
        for ch in 0..3 {
            let inv_s = 1.0 / slope[ch].abs().max(MIN_DIVISOR);
            out[ch] = (out[ch] - self.pivot_black) * inv_s + self.pivot_black;
            out[ch] -= offset[ch];
        }
        out
    }

    // ====================================================================
    // Stage helpers
    // ====================================================================

    fn exposure_mul(&self) -> [f32; 3] {
        let e = self.exposure.rgb_add();
        [e[0].exp2(), e[1].exp2(), e[2].exp2()]
    }

    fn video_offset(&self) -> [f32; 3] {
        let lift = self.lift.rgb_add();
        let offset = self.offset.rgb_add();
        [lift[0] + offset[0], lift[1] + offset[1], lift[2] + offset[2]]
    }

    fn video_slope(&self) -> [f32; 3] {
        let gain = self.gain.rgb_mul();
        let contrast = self.contrast.rgb_mul();
        [gain[0] * contrast[0], gain[1] * contrast[1], gain[2] * contrast[2]]
    }

    #[inline]
    fn gamma_channel(&self, val: f32, gamma: f32, range: f32) -> f32 {
        let shifted = val - self.pivot_black;
        let safe_range = range.abs().max(MIN_DIVISOR);
        (shifted.abs() / safe_range).powf(gamma) * shifted.signum() * safe_range
            + self.pivot_black
    }

    #[inline]
    fn saturate(&self, rgb: [f32; 3]) -> [f32; 3] {
        if !self.has_channel_crosstalk() {
            return rgb;
        }
        mix_luma(rgb, self.saturation)
    }

    #[inline]
    fn saturate_inv(&self, rgb: [f32; 3]) -> [f32; 3] {
        if self.saturation == 0.0 || !self.has_channel_crosstalk() {
            return rgb;
        }
        mix_luma(rgb, 1.0 / self.saturation)
    }

    #[inline]
    fn clamp(&self, rgb: [f32; 3]) -> [f32; 3] {
        [
            rgb[0].clamp(self.clamp_black, self.clamp_white),
            rgb[1].clamp(self.clamp_black, self.clamp_white),
            rgb[2].clamp(self.clamp_black, self.clamp_white),
        ]
    }
}

impl Default for GradingPrimary {
    fn default() -> Self {
        Self::identity(GradingStyle::Log)
    }
}

#[inline]
fn is_one(v: &[f32; 3]) -> bool {
    v.iter().all(|c| (c - 1.0).abs() < STAGE_TOL)
}

#[inline]
fn mix_luma(rgb: [f32; 3], sat: f32) -> [f32; 3] {
    let lum = rgb[0] * REC709_LUMA[0] as f32
        + rgb[1] * REC709_LUMA[1] as f32
        + rgb[2] * REC709_LUMA[2] as f32;
    [
        lum + sat * (rgb[0] - lum),
        lum + sat * (rgb[1] - lum),
        lum + sat * (rgb[2] - lum),
    ]
}
