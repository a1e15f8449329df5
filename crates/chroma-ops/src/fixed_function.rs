//! Fixed-function color transforms.
//!
//! A closed set of named, non-parametric (or lightly parametric) kernels:
//! the ACES output-transform helpers (red modifier, glow, surround,
//! gamut compression), chromaticity-space conversions, extended-range
//! HSV, the ST 2084 PQ curve and a three-segment double-log curve.
//!
//! Each style has a forward and an inverse evaluation selected by the
//! op's direction flag.

use crate::{OpError, OpResult};

// ============================================================================
// Style enum and op
// ============================================================================

/// The fixed-function style.
#[derive(Debug, Clone, PartialEq)]
pub enum FixedFunctionStyle {
    /// ACES 0.3/0.7 red modifier (hue-preserving variant).
    AcesRedMod03,
    /// ACES 1.0 red modifier.
    AcesRedMod10,
    /// ACES 0.3/0.7 glow.
    AcesGlow03,
    /// ACES 1.0 glow.
    AcesGlow10,
    /// ACES 1.0 dark-to-dim surround correction.
    AcesDarkToDim10,
    /// ACES 1.3 gamut compression.
    GamutComp13(GamutCompParams),
    /// Rec.2100 HDR surround correction.
    Rec2100Surround {
        /// Surround adjustment exponent (typically 0.78 to 1.0).
        gamma: f32,
    },
    /// RGB to HSV (extended-range; inverse is HSV to RGB).
    RgbToHsv,
    /// CIE XYZ to xyY chromaticity.
    XyzToXyy,
    /// CIE XYZ to u'v'Y chromaticity.
    XyzToUvy,
    /// CIE XYZ to L*u*v* (D65 white).
    XyzToLuv,
    /// Linear (1.0 = 100 nits) to ST 2084 PQ.
    LinToPq,
    /// Linear to a three-segment log/linear/log curve.
    LinToDoubleLog(DoubleLogParams),
}

/// Fixed-function operation.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedFunctionOp {
    /// Which kernel to run.
    pub style: FixedFunctionStyle,
    /// False runs the style's inverse.
    pub forward: bool,
}

impl FixedFunctionOp {
    /// Creates a validated fixed-function op.
    pub fn new(style: FixedFunctionStyle, forward: bool) -> OpResult<Self> {
        if let FixedFunctionStyle::Rec2100Surround { gamma } = style {
            if !(gamma > 0.0) {
                return Err(OpError::Invalid(format!(
                    "surround gamma must be positive: {gamma}"
                )));
            }
        }
        Ok(Self { style, forward })
    }

    /// The inverse op (same style, opposite direction).
    pub fn inverted(&self) -> FixedFunctionOp {
        FixedFunctionOp {
            style: self.style.clone(),
            forward: !self.forward,
        }
    }

    /// True when the kernel mixes channels.
    pub fn has_channel_crosstalk(&self) -> bool {
        !matches!(
            self.style,
            FixedFunctionStyle::LinToPq | FixedFunctionStyle::LinToDoubleLog(_)
        )
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        for px in pixels.chunks_exact_mut(4) {
            let mut rgb = [px[0], px[1], px[2]];
            self.eval(&mut rgb);
            px[0] = rgb[0];
            px[1] = rgb[1];
            px[2] = rgb[2];
            // Alpha unchanged
        }
    }

    fn eval(&self, rgb: &mut [f32; 3]) {
        use FixedFunctionStyle as S;
        match (&self.style, self.forward) {
            (S::AcesRedMod03, true) => red_mod_03_fwd(rgb),
            (S::AcesRedMod03, false) => red_mod_03_inv(rgb),
            (S::AcesRedMod10, true) => red_mod_10_fwd(rgb),
            (S::AcesRedMod10, false) => red_mod_10_inv(rgb),
            (S::AcesGlow03, true) => glow_fwd(rgb, GLOW_03_GAIN, GLOW_03_MID),
            (S::AcesGlow03, false) => glow_03_inv(rgb),
            (S::AcesGlow10, true) => glow_fwd(rgb, GLOW_10_GAIN, GLOW_10_MID),
            (S::AcesGlow10, false) => glow_10_inv(rgb),
            (S::AcesDarkToDim10, true) => surround_pow(rgb, AP1_LUMA, DARK_TO_DIM_GAMMA, 1e-10),
            (S::AcesDarkToDim10, false) => surround_pow(rgb, AP1_LUMA, DIM_TO_DARK_GAMMA, 1e-10),
            (S::GamutComp13(p), true) => gamut_comp_13(rgb, p, gamut_compress),
            (S::GamutComp13(p), false) => gamut_comp_13(rgb, p, gamut_uncompress),
            (S::Rec2100Surround { gamma }, true) => {
                surround_pow(rgb, REC2100_LUMA, *gamma, 1e-4)
            }
            (S::Rec2100Surround { gamma }, false) => {
                surround_pow(rgb, REC2100_LUMA, 1.0 / gamma, 1e-4f32.powf(*gamma))
            }
            (S::RgbToHsv, true) => *rgb = rgb_to_hsv(*rgb),
            (S::RgbToHsv, false) => *rgb = hsv_to_rgb(*rgb),
            (S::XyzToXyy, true) => *rgb = xyz_to_xyy(*rgb),
            (S::XyzToXyy, false) => *rgb = xyy_to_xyz(*rgb),
            (S::XyzToUvy, true) => *rgb = xyz_to_uvy(*rgb),
            (S::XyzToUvy, false) => *rgb = uvy_to_xyz(*rgb),
            (S::XyzToLuv, true) => *rgb = xyz_to_luv(*rgb),
            (S::XyzToLuv, false) => *rgb = luv_to_xyz(*rgb),
            (S::LinToPq, true) => {
                for c in rgb.iter_mut() {
                    *c = lin_to_pq(*c);
                }
            }
            (S::LinToPq, false) => {
                for c in rgb.iter_mut() {
                    *c = pq_to_lin(*c);
                }
            }
            (S::LinToDoubleLog(p), true) => {
                for c in rgb.iter_mut() {
                    *c = lin_to_double_log(*c, p);
                }
            }
            (S::LinToDoubleLog(p), false) => {
                for c in rgb.iter_mut() {
                    *c = double_log_to_lin(*c, p);
                }
            }
        }
    }
}

// ============================================================================
// Chromaticity conversions
// ============================================================================

fn xyz_to_xyy(xyz: [f32; 3]) -> [f32; 3] {
    let d = xyz[0] + xyz[1] + xyz[2];
    let d = if d == 0.0 { 0.0 } else { 1.0 / d };
    [xyz[0] * d, xyz[1] * d, xyz[1]]
}

fn xyy_to_xyz(xyy: [f32; 3]) -> [f32; 3] {
    let [x, y, y_lum] = xyy;
    let d = if y == 0.0 { 0.0 } else { 1.0 / y };
    [y_lum * x * d, y_lum, y_lum * (1.0 - x - y) * d]
}

fn xyz_to_uvy(xyz: [f32; 3]) -> [f32; 3] {
    let d = xyz[0] + 15.0 * xyz[1] + 3.0 * xyz[2];
    let d = if d == 0.0 { 0.0 } else { 1.0 / d };
    [4.0 * xyz[0] * d, 9.0 * xyz[1] * d, xyz[1]]
}

fn uvy_to_xyz(uvy: [f32; 3]) -> [f32; 3] {
    let [u, v, y_lum] = uvy;
    let d = if v == 0.0 { 0.0 } else { 1.0 / v };
    let x = 2.25 * y_lum * u * d;
    let z = 0.75 * y_lum * (4.0 - u - 6.666666666666667 * v) * d;
    [x, y_lum, z]
}

// D65 reference white and L* curve constants for CIELUV.
const LUV_U_N: f32 = 0.19783001;
const LUV_V_N: f32 = 0.46831999;
const LUV_Y_BREAK: f32 = 0.008856451679;
const LUV_L_BREAK: f32 = 0.08;
const LUV_KAPPA: f32 = 9.0329629629629608;
const LUV_INV_KAPPA: f32 = 0.11070564598794539;
const LUV_L_SCALE: f32 = 1.16;
const LUV_L_OFFSET: f32 = 0.16;
const LUV_INV_L_SCALE: f32 = 0.86206896551724144;
const LUV_INV_13: f32 = 0.076923076923076927;

fn xyz_to_luv(xyz: [f32; 3]) -> [f32; 3] {
    let [x, y, z] = xyz;
    let d = x + 15.0 * y + 3.0 * z;
    let d = if d == 0.0 { 0.0 } else { 1.0 / d };
    let u = 4.0 * x * d;
    let v = 9.0 * y * d;

    let l_star = if y <= LUV_Y_BREAK {
        LUV_KAPPA * y
    } else {
        LUV_L_SCALE * y.powf(1.0 / 3.0) - LUV_L_OFFSET
    };

    [
        l_star,
        13.0 * l_star * (u - LUV_U_N),
        13.0 * l_star * (v - LUV_V_N),
    ]
}

fn luv_to_xyz(luv: [f32; 3]) -> [f32; 3] {
    let [l_star, u_star, v_star] = luv;
    let d = if l_star == 0.0 { 0.0 } else { LUV_INV_13 / l_star };
    let u = u_star * d + LUV_U_N;
    let v = v_star * d + LUV_V_N;

    let y = if l_star <= LUV_L_BREAK {
        LUV_INV_KAPPA * l_star
    } else {
        let t = (l_star + LUV_L_OFFSET) * LUV_INV_L_SCALE;
        t * t * t
    };

    let dd = if v == 0.0 { 0.0 } else { 0.25 / v };
    [
        9.0 * y * u * dd,
        y,
        y * (12.0 - 3.0 * u - 20.0 * v) * dd,
    ]
}

// ============================================================================
// Extended-range HSV
// ============================================================================

// When RGB are all non-negative (or all negative), S stays on [0, 1]; a
// mix of signs pushes S onto (1, 2]. H is always [0, 1).

fn rgb_to_hsv(rgb: [f32; 3]) -> [f32; 3] {
    let [red, grn, blu] = rgb;
    let rgb_min = red.min(grn).min(blu);
    let rgb_max = red.max(grn).max(blu);

    let mut val = rgb_max;
    let mut sat = 0.0f32;
    let mut hue = 0.0f32;

    if rgb_min != rgb_max {
        let delta = rgb_max - rgb_min;
        if rgb_max != 0.0 {
            sat = delta / rgb_max;
        }
        hue = if red == rgb_max {
            (grn - blu) / delta
        } else if grn == rgb_max {
            2.0 + (blu - red) / delta
        } else {
            4.0 + (red - grn) / delta
        };
        if hue < 0.0 {
            hue += 6.0;
        }
        hue *= 1.0 / 6.0;
    }

    if rgb_min < 0.0 {
        val += rgb_min;
    }
    if -rgb_min > rgb_max {
        sat = (rgb_max - rgb_min) / -rgb_min;
    }

    [hue, sat, val]
}

fn hsv_to_rgb(hsv: [f32; 3]) -> [f32; 3] {
    // Saturation near 2 produces huge RGB; cap just below.
    const MAX_SAT: f32 = 1.999;

    let hue = (hsv[0] - hsv[0].floor()) * 6.0;
    let sat = hsv[1].clamp(0.0, MAX_SAT);
    let val = hsv[2];

    let red = ((hue - 3.0).abs() - 1.0).clamp(0.0, 1.0);
    let grn = (2.0 - (hue - 2.0).abs()).clamp(0.0, 1.0);
    let blu = (2.0 - (hue - 4.0).abs()).clamp(0.0, 1.0);

    let mut rgb_max = val;
    let mut rgb_min = val * (1.0 - sat);
    if sat > 1.0 {
        rgb_min = val * (1.0 - sat) / (2.0 - sat);
        rgb_max = val - rgb_min;
    }
    if val < 0.0 {
        rgb_min = val / (2.0 - sat);
        rgb_max = val - rgb_min;
    }

    let delta = rgb_max - rgb_min;
    [
        red * delta + rgb_min,
        grn * delta + rgb_min,
        blu * delta + rgb_min,
    ]
}

// ============================================================================
// ACES red modifier
// ============================================================================

const SQRT3: f32 = 1.7320508075688772;
const NOISE_LIMIT: f32 = 1e-2;
const RED_PIVOT: f32 = 0.03;

// 0.3/0.7: scale 0.85, 120 degree window; 1.0: scale 0.82, 135 degrees.
const RED_03_ONE_MINUS_SCALE: f32 = 1.0 - 0.85;
const RED_03_INV_WIDTH: f32 = 1.9098593171027443;
const RED_10_ONE_MINUS_SCALE: f32 = 1.0 - 0.82;
const RED_10_INV_WIDTH: f32 = 1.6976527263135504;

/// Quadratic B-spline segments of the hue window.
const HUE_BSPLINE_M: [[f32; 4]; 4] = [
    [0.25, 0.00, 0.00, 0.00],
    [-0.75, 0.75, 0.75, 0.25],
    [0.75, -1.50, 0.00, 1.00],
    [-0.25, 0.75, -0.75, 0.25],
];

fn calc_sat_weight(rgb: &[f32; 3], noise_limit: f32) -> f32 {
    let min_val = rgb[0].min(rgb[1]).min(rgb[2]);
    let max_val = rgb[0].max(rgb[1]).max(rgb[2]);
    let numerator = max_val.max(1e-10) - min_val.max(1e-10);
    numerator / max_val.max(noise_limit)
}

fn calc_hue_weight(rgb: &[f32; 3], inv_width: f32) -> f32 {
    let a = 2.0 * rgb[0] - (rgb[1] + rgb[2]);
    let b = SQRT3 * (rgb[1] - rgb[2]);
    let hue = b.atan2(a);

    let knot_coord = hue * inv_width + 2.0;
    let j = knot_coord as i32;
    if (0..4).contains(&j) {
        let t = knot_coord - j as f32;
        let coefs = &HUE_BSPLINE_M[j as usize];
        coefs[3] + t * (coefs[2] + t * (coefs[1] + t * coefs[0]))
    } else {
        0.0
    }
}

fn red_mod_10_fwd(rgb: &mut [f32; 3]) {
    let f_h = calc_hue_weight(rgb, RED_10_INV_WIDTH);
    if f_h > 0.0 {
        let f_s = calc_sat_weight(rgb, NOISE_LIMIT);
        rgb[0] += f_h * f_s * (RED_PIVOT - rgb[0]) * RED_10_ONE_MINUS_SCALE;
    }
}

/// Solves the forward modification for the original red channel.
fn red_inv_root(red: f32, min_chan: f32, f_h: f32, one_minus_scale: f32) -> f32 {
    let a = f_h * one_minus_scale - 1.0;
    let b = red - f_h * (RED_PIVOT + min_chan) * one_minus_scale;
    let c = f_h * RED_PIVOT * min_chan * one_minus_scale;
    let discriminant = (b * b - 4.0 * a * c).max(0.0);
    (-b - discriminant.sqrt()) / (2.0 * a)
}

fn red_mod_10_inv(rgb: &mut [f32; 3]) {
    let f_h = calc_hue_weight(rgb, RED_10_INV_WIDTH);
    if f_h > 0.0 {
        let min_chan = rgb[1].min(rgb[2]);
        rgb[0] = red_inv_root(rgb[0], min_chan, f_h, RED_10_ONE_MINUS_SCALE);
    }
}

/// Scales green or blue so the hue angle survives the red change.
fn restore_hue(rgb: &mut [f32; 3], old_red: f32, new_red: f32) {
    let (grn, blu) = (rgb[1], rgb[2]);
    if grn >= blu {
        let hue_fac = (grn - blu) / (old_red - blu).max(1e-10);
        rgb[1] = hue_fac * (new_red - blu) + blu;
    } else {
        let hue_fac = (blu - grn) / (old_red - grn).max(1e-10);
        rgb[2] = hue_fac * (new_red - grn) + grn;
    }
    rgb[0] = new_red;
}

fn red_mod_03_fwd(rgb: &mut [f32; 3]) {
    let f_h = calc_hue_weight(rgb, RED_03_INV_WIDTH);
    if f_h > 0.0 {
        let f_s = calc_sat_weight(rgb, NOISE_LIMIT);
        let old_red = rgb[0];
        let new_red = old_red + f_h * f_s * (RED_PIVOT - old_red) * RED_03_ONE_MINUS_SCALE;
        restore_hue(rgb, old_red, new_red);
    }
}

fn red_mod_03_inv(rgb: &mut [f32; 3]) {
    let f_h = calc_hue_weight(rgb, RED_03_INV_WIDTH);
    if f_h > 0.0 {
        let min_chan = rgb[1].min(rgb[2]);
        let old_red = rgb[0];
        let new_red = red_inv_root(old_red, min_chan, f_h, RED_03_ONE_MINUS_SCALE);
        restore_hue(rgb, old_red, new_red);
    }
}

// ============================================================================
// ACES glow
// ============================================================================

const GLOW_03_GAIN: f32 = 0.075;
const GLOW_03_MID: f32 = 0.1;
const GLOW_10_GAIN: f32 = 0.05;
const GLOW_10_MID: f32 = 0.08;

fn rgb_to_yc(rgb: &[f32; 3]) -> f32 {
    const YC_RADIUS_WEIGHT: f32 = 1.75;
    let [red, grn, blu] = *rgb;
    let chroma = (blu * (blu - grn) + grn * (grn - red) + red * (red - blu)).sqrt();
    (blu + grn + red + YC_RADIUS_WEIGHT * chroma) / 3.0
}

fn sigmoid_shaper(sat: f32) -> f32 {
    let x = (sat - 0.4) * 5.0;
    let sign = x.signum();
    let t = (1.0 - 0.5 * sign * x).max(0.0);
    (1.0 + sign * (1.0 - t * t)) * 0.5
}

fn glow_gain_for(rgb: &[f32; 3], gain: f32) -> (f32, f32) {
    let yc = rgb_to_yc(rgb);
    let sat = calc_sat_weight(rgb, NOISE_LIMIT);
    (gain * sigmoid_shaper(sat), yc)
}

fn glow_fwd(rgb: &mut [f32; 3], gain: f32, mid: f32) {
    let (glow_gain, yc) = glow_gain_for(rgb, gain);
    let glow_gain_out = if yc >= mid * 2.0 {
        0.0
    } else if yc <= mid * 2.0 / 3.0 {
        glow_gain
    } else {
        glow_gain * (mid / yc - 0.5)
    };
    let added = 1.0 + glow_gain_out;
    rgb[0] *= added;
    rgb[1] *= added;
    rgb[2] *= added;
}

fn glow_10_inv(rgb: &mut [f32; 3]) {
    let (glow_gain, yc) = glow_gain_for(rgb, GLOW_10_GAIN);
    let glow_gain_out = if yc >= GLOW_10_MID * 2.0 {
        0.0
    } else if yc <= (1.0 + glow_gain) * GLOW_10_MID * 2.0 / 3.0 {
        -glow_gain / (1.0 + glow_gain)
    } else {
        glow_gain * (GLOW_10_MID / yc - 0.5) / (glow_gain * 0.5 - 1.0)
    };
    let reduced = 1.0 + glow_gain_out;
    rgb[0] *= reduced;
    rgb[1] *= reduced;
    rgb[2] *= reduced;
}

fn glow_03_inv(rgb: &mut [f32; 3]) {
    let (glow_gain, yc) = glow_gain_for(rgb, GLOW_03_GAIN);
    let glow_gain_out = if yc >= GLOW_03_MID * 2.0 {
        0.0
    } else if yc <= GLOW_03_MID * 2.0 / 3.0 {
        glow_gain
    } else {
        glow_gain * (GLOW_03_MID / yc - 0.5)
    };
    let removed = 1.0 / (1.0 + glow_gain_out);
    rgb[0] *= removed;
    rgb[1] *= removed;
    rgb[2] *= removed;
}

// ============================================================================
// Surround corrections
// ============================================================================

const AP1_LUMA: [f32; 3] = [0.27222871678091454, 0.67408176581114831, 0.053689517407937051];
const REC2100_LUMA: [f32; 3] = [0.2627, 0.6780, 0.0593];
const DARK_TO_DIM_GAMMA: f32 = 0.9811;
const DIM_TO_DARK_GAMMA: f32 = 1.0192640913260627;

/// Scales RGB by `luma^(gamma - 1)`, the ratio of graded to original luma.
fn surround_pow(rgb: &mut [f32; 3], luma: [f32; 3], gamma: f32, min_lum: f32) {
    let y = (luma[0] * rgb[0] + luma[1] * rgb[1] + luma[2] * rgb[2])
        .abs()
        .max(min_lum);
    let y_pow_over_y = y.powf(gamma - 1.0);
    rgb[0] *= y_pow_over_y;
    rgb[1] *= y_pow_over_y;
    rgb[2] *= y_pow_over_y;
}

// ============================================================================
// ACES gamut compression 1.3
// ============================================================================

/// Per-axis limits, thresholds and shared power of the gamut compressor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GamutCompParams {
    /// Compression limit for the cyan axis (red channel distance).
    pub lim_cyan: f32,
    /// Compression limit for the magenta axis.
    pub lim_magenta: f32,
    /// Compression limit for the yellow axis.
    pub lim_yellow: f32,
    /// Compression onset threshold for cyan.
    pub thr_cyan: f32,
    /// Compression onset threshold for magenta.
    pub thr_magenta: f32,
    /// Compression onset threshold for yellow.
    pub thr_yellow: f32,
    /// Shaper exponent.
    pub power: f32,
    scale_cyan: f32,
    scale_magenta: f32,
    scale_yellow: f32,
}

impl GamutCompParams {
    /// Creates validated parameters with precomputed scale factors.
    pub fn new(
        lim_cyan: f32,
        lim_magenta: f32,
        lim_yellow: f32,
        thr_cyan: f32,
        thr_magenta: f32,
        thr_yellow: f32,
        power: f32,
    ) -> OpResult<Self> {
        for (lim, thr) in [
            (lim_cyan, thr_cyan),
            (lim_magenta, thr_magenta),
            (lim_yellow, thr_yellow),
        ] {
            if !(lim > 1.0) {
                return Err(OpError::Invalid(format!(
                    "gamut compression limit must exceed 1: {lim}"
                )));
            }
            if !(0.0..1.0).contains(&thr) {
                return Err(OpError::Invalid(format!(
                    "gamut compression threshold must be in [0, 1): {thr}"
                )));
            }
        }
        if !(power >= 1.0) {
            return Err(OpError::Invalid(format!(
                "gamut compression power must be at least 1: {power}"
            )));
        }

        // Scale chosen so distance 1 maps to itself at the gamut boundary.
        let calc_scale = |lim: f32, thr: f32| -> f32 {
            let num = lim - thr;
            let inner = ((1.0 - thr) / num).powf(-power) - 1.0;
            num / inner.powf(1.0 / power)
        };

        Ok(Self {
            lim_cyan,
            lim_magenta,
            lim_yellow,
            thr_cyan,
            thr_magenta,
            thr_yellow,
            power,
            scale_cyan: calc_scale(lim_cyan, thr_cyan),
            scale_magenta: calc_scale(lim_magenta, thr_magenta),
            scale_yellow: calc_scale(lim_yellow, thr_yellow),
        })
    }

    /// The ACES 1.3 default parameter set.
    pub fn aces_default() -> Self {
        match Self::new(1.147, 1.264, 1.312, 0.815, 0.803, 0.880, 1.2) {
            Ok(p) => p,
            Err(_) => unreachable!(),
        }
    }
}

fn gamut_compress(dist: f32, thr: f32, scale: f32, power: f32) -> f32 {
    let nd = (dist - thr) / scale;
    let p = nd.powf(power);
    thr + scale * nd / (1.0 + p).powf(1.0 / power)
}

fn gamut_uncompress(dist: f32, thr: f32, scale: f32, power: f32) -> f32 {
    // The compressor asymptotes at thr + scale; beyond it pass through.
    if dist >= (thr + scale) {
        return dist;
    }
    let nd = (dist - thr) / scale;
    let p = nd.powf(power);
    thr + scale * (-(p / (p - 1.0))).powf(1.0 / power)
}

fn gamut_comp_channel(
    val: f32,
    ach: f32,
    thr: f32,
    scale: f32,
    power: f32,
    f: fn(f32, f32, f32, f32) -> f32,
) -> f32 {
    if ach == 0.0 {
        return 0.0;
    }
    // Distance from the achromatic axis (inverse RGB ratio).
    let dist = (ach - val) / ach.abs();
    if dist < thr {
        return val;
    }
    ach - f(dist, thr, scale, power) * ach.abs()
}

fn gamut_comp_13(rgb: &mut [f32; 3], p: &GamutCompParams, f: fn(f32, f32, f32, f32) -> f32) {
    let ach = rgb[0].max(rgb[1]).max(rgb[2]);
    rgb[0] = gamut_comp_channel(rgb[0], ach, p.thr_cyan, p.scale_cyan, p.power, f);
    rgb[1] = gamut_comp_channel(rgb[1], ach, p.thr_magenta, p.scale_magenta, p.power, f);
    rgb[2] = gamut_comp_channel(rgb[2], ach, p.thr_yellow, p.scale_yellow, p.power, f);
}

// ============================================================================
// ST 2084 PQ
// ============================================================================

const PQ_M1: f32 = 0.1593017578125;
const PQ_M2: f32 = 78.84375;
const PQ_C1: f32 = 0.8359375;
const PQ_C2: f32 = 18.8515625;
const PQ_C3: f32 = 18.6875;

/// PQ code value to linear, 1.0 = 100 nits. Negatives mirror.
fn pq_to_lin(pq: f32) -> f32 {
    let x = pq.abs().powf(1.0 / PQ_M2);
    let nits = ((x - PQ_C1).max(0.0) / (PQ_C2 - PQ_C3 * x)).powf(1.0 / PQ_M1);
    (100.0 * nits).copysign(pq)
}

/// Linear (1.0 = 100 nits) to PQ code value. Negatives mirror.
fn lin_to_pq(lin: f32) -> f32 {
    let l = (lin * 0.01).abs();
    let y = l.powf(PQ_M1);
    let n = ((PQ_C1 + PQ_C2 * y) / (1.0 + PQ_C3 * y)).powf(PQ_M2);
    n.copysign(lin)
}

// ============================================================================
// Double log
// ============================================================================

/// Three-segment curve: log below `break1`, linear between the breaks,
/// log above `break2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoubleLogParams {
    /// Logarithm base.
    pub base: f32,
    /// Upper edge of the first log segment.
    pub break1: f32,
    /// Lower edge of the second log segment.
    pub break2: f32,
    /// First log segment: log-side slope.
    pub log1_slope: f32,
    /// First log segment: log-side offset.
    pub log1_off: f32,
    /// First log segment: linear-side slope.
    pub log1_lin_slope: f32,
    /// First log segment: linear-side offset.
    pub log1_lin_off: f32,
    /// Second log segment: log-side slope.
    pub log2_slope: f32,
    /// Second log segment: log-side offset.
    pub log2_off: f32,
    /// Second log segment: linear-side slope.
    pub log2_lin_slope: f32,
    /// Second log segment: linear-side offset.
    pub log2_lin_off: f32,
    /// Middle segment slope.
    pub lin_slope: f32,
    /// Middle segment offset.
    pub lin_off: f32,
    log1_slope_baked: f32,
    log2_slope_baked: f32,
    prime_break1: f32,
    prime_break2: f32,
}

impl DoubleLogParams {
    /// Creates validated parameters with the break points precomputed in
    /// the non-linear domain.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        base: f32,
        break1: f32,
        break2: f32,
        log1_slope: f32,
        log1_off: f32,
        log1_lin_slope: f32,
        log1_lin_off: f32,
        log2_slope: f32,
        log2_off: f32,
        log2_lin_slope: f32,
        log2_lin_off: f32,
        lin_slope: f32,
        lin_off: f32,
    ) -> OpResult<Self> {
        if !(base > 0.0) || (base - 1.0).abs() < 1e-6 {
            return Err(OpError::Invalid(format!("invalid log base: {base}")));
        }
        if break1 > break2 {
            return Err(OpError::Invalid(format!(
                "double-log breaks are out of order: {break1} > {break2}"
            )));
        }
        for s in [log1_slope, log2_slope, log1_lin_slope, log2_lin_slope, lin_slope] {
            if s == 0.0 {
                return Err(OpError::Invalid("double-log slopes must be non-zero".into()));
            }
        }

        let ln_base = base.ln();
        let log1_slope_baked = log1_slope / ln_base;
        let log2_slope_baked = log2_slope / ln_base;
        let prime_break1 =
            log1_slope_baked * (log1_lin_slope * break1 + log1_lin_off).ln() + log1_off;
        let prime_break2 =
            log2_slope_baked * (log2_lin_slope * break2 + log2_lin_off).ln() + log2_off;
        if !(prime_break1.is_finite() && prime_break2.is_finite()) {
            return Err(OpError::Invalid(
                "double-log segments are undefined at their break points".into(),
            ));
        }

        Ok(Self {
            base,
            break1,
            break2,
            log1_slope,
            log1_off,
            log1_lin_slope,
            log1_lin_off,
            log2_slope,
            log2_off,
            log2_lin_slope,
            log2_lin_off,
            lin_slope,
            lin_off,
            log1_slope_baked,
            log2_slope_baked,
            prime_break1,
            prime_break2,
        })
    }
}

fn lin_to_double_log(v: f32, p: &DoubleLogParams) -> f32 {
    if v < p.break1 {
        p.log1_slope_baked * (p.log1_lin_slope * v + p.log1_lin_off).ln() + p.log1_off
    } else if v < p.break2 {
        p.lin_slope * v + p.lin_off
    } else {
        p.log2_slope_baked * (p.log2_lin_slope * v + p.log2_lin_off).ln() + p.log2_off
    }
}

fn double_log_to_lin(v: f32, p: &DoubleLogParams) -> f32 {
    if v < p.prime_break1 {
        (((v - p.log1_off) / p.log1_slope_baked).exp() - p.log1_lin_off) / p.log1_lin_slope
    } else if v < p.prime_break2 {
        (v - p.lin_off) / p.lin_slope
    } else {
        (((v - p.log2_off) / p.log2_slope_baked).exp() - p.log2_lin_off) / p.log2_lin_slope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn apply_pair(style: FixedFunctionStyle, rgb: [f32; 3]) -> ([f32; 3], [f32; 3]) {
        let fwd = FixedFunctionOp::new(style, true).unwrap();
        let inv = fwd.inverted();
        let mut px = [rgb[0], rgb[1], rgb[2], 1.0];
        fwd.apply_rgba(&mut px);
        let mid = [px[0], px[1], px[2]];
        inv.apply_rgba(&mut px);
        (mid, [px[0], px[1], px[2]])
    }

    #[test]
    fn xyy_round_trip() {
        let (_, back) = apply_pair(FixedFunctionStyle::XyzToXyy, [0.4124, 0.2126, 0.0193]);
        assert!((back[0] - 0.4124).abs() < EPSILON);
        assert!((back[1] - 0.2126).abs() < EPSILON);
        assert!((back[2] - 0.0193).abs() < EPSILON);
    }

    #[test]
    fn xyy_black_is_zero() {
        let (mid, _) = apply_pair(FixedFunctionStyle::XyzToXyy, [0.0, 0.0, 0.0]);
        assert_eq!(mid, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn uvy_d65_white() {
        let op = FixedFunctionOp::new(FixedFunctionStyle::XyzToUvy, true).unwrap();
        let mut px = [0.95047f32, 1.0, 1.08883, 1.0];
        op.apply_rgba(&mut px);
        assert!((px[0] - 0.19783).abs() < 1e-4);
        assert!((px[1] - 0.46832).abs() < 1e-4);
        assert!((px[2] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn luv_round_trip() {
        let (_, back) = apply_pair(FixedFunctionStyle::XyzToLuv, [0.3, 0.4, 0.2]);
        assert!((back[0] - 0.3).abs() < 1e-4);
        assert!((back[1] - 0.4).abs() < 1e-4);
        assert!((back[2] - 0.2).abs() < 1e-4);
    }

    #[test]
    fn hsv_primary_red() {
        let op = FixedFunctionOp::new(FixedFunctionStyle::RgbToHsv, true).unwrap();
        let mut px = [1.0f32, 0.0, 0.0, 1.0];
        op.apply_rgba(&mut px);
        assert!(px[0].abs() < EPSILON); // hue 0
        assert!((px[1] - 1.0).abs() < EPSILON);
        assert!((px[2] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn hsv_round_trip_extended_range() {
        for rgb in [[0.2f32, 0.5, 0.8], [1.5, 0.2, -0.1], [-0.3, -0.2, -0.1]] {
            let (_, back) = apply_pair(FixedFunctionStyle::RgbToHsv, rgb);
            for i in 0..3 {
                assert!(
                    (back[i] - rgb[i]).abs() < 1e-4,
                    "channel {i}: {} vs {}",
                    back[i],
                    rgb[i]
                );
            }
        }
    }

    #[test]
    fn pq_round_trip() {
        for v in [0.0f32, 0.05, 0.5, 1.0, 10.0, 100.0] {
            let (_, back) = apply_pair(FixedFunctionStyle::LinToPq, [v, v, v]);
            assert!((back[0] - v).abs() < 1e-3 * v.max(1.0), "v = {v}");
        }
    }

    #[test]
    fn pq_100_nits_reference() {
        // 1.0 (= 100 nits) encodes near the SDR reference level 0.508.
        let op = FixedFunctionOp::new(FixedFunctionStyle::LinToPq, true).unwrap();
        let mut px = [1.0f32, 0.0, 0.0, 1.0];
        op.apply_rgba(&mut px);
        assert!((px[0] - 0.508).abs() < 1e-3);
    }

    #[test]
    fn red_mod_10_round_trip() {
        let (mid, back) = apply_pair(FixedFunctionStyle::AcesRedMod10, [0.8, 0.1, 0.05]);
        assert_ne!(mid[0], 0.8); // the red region is modified
        // The inverse recomputes the hue weight from modified values, so
        // the round trip is close but not exact.
        assert!((back[0] - 0.8).abs() < 5e-3);
        assert!((back[1] - 0.1).abs() < 1e-5);
    }

    #[test]
    fn red_mod_leaves_neutrals() {
        let (mid, _) = apply_pair(FixedFunctionStyle::AcesRedMod10, [0.5, 0.5, 0.5]);
        assert!((mid[0] - 0.5).abs() < EPSILON);
    }

    #[test]
    fn glow_10_brightens_dark_saturated() {
        let (mid, back) = apply_pair(FixedFunctionStyle::AcesGlow10, [0.08, 0.02, 0.01]);
        assert!(mid[0] > 0.08);
        assert!((back[0] - 0.08).abs() < 1e-4);
    }

    #[test]
    fn glow_03_round_trip() {
        let (_, back) = apply_pair(FixedFunctionStyle::AcesGlow03, [0.06, 0.015, 0.02]);
        assert!((back[0] - 0.06).abs() < 1e-4);
    }

    #[test]
    fn dark_to_dim_round_trip() {
        let (mid, back) = apply_pair(FixedFunctionStyle::AcesDarkToDim10, [0.18, 0.18, 0.18]);
        assert!(mid[0] > 0.18); // gamma < 1 lifts midtones
        assert!((back[0] - 0.18).abs() < 1e-4);
    }

    #[test]
    fn rec2100_surround_round_trip() {
        let style = FixedFunctionStyle::Rec2100Surround { gamma: 0.78 };
        let (_, back) = apply_pair(style, [0.25, 0.5, 0.1]);
        assert!((back[0] - 0.25).abs() < 1e-4);
        assert!((back[1] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn rec2100_bad_gamma_rejected() {
        let r = FixedFunctionOp::new(FixedFunctionStyle::Rec2100Surround { gamma: 0.0 }, true);
        assert!(r.is_err());
    }

    #[test]
    fn gamut_comp_compresses_out_of_gamut() {
        let p = GamutCompParams::aces_default();
        let fwd = FixedFunctionOp::new(FixedFunctionStyle::GamutComp13(p), true).unwrap();
        let mut px = [-0.2f32, 0.5, 0.6, 1.0];
        fwd.apply_rgba(&mut px);
        assert!(px[0] > -0.2); // pulled toward the achromatic axis
        let inv = fwd.inverted();
        inv.apply_rgba(&mut px);
        assert!((px[0] + 0.2).abs() < 1e-4);
        assert!((px[1] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn gamut_comp_in_gamut_unchanged() {
        let p = GamutCompParams::aces_default();
        let fwd = FixedFunctionOp::new(FixedFunctionStyle::GamutComp13(p), true).unwrap();
        let mut px = [0.4f32, 0.5, 0.45, 1.0];
        fwd.apply_rgba(&mut px);
        assert!((px[0] - 0.4).abs() < EPSILON);
        assert!((px[1] - 0.5).abs() < EPSILON);
    }

    #[test]
    fn double_log_segments_and_round_trip() {
        // Derive the linear midsection so it meets both log segments,
        // keeping the curve continuous and monotone.
        let ln10 = 10.0f32.ln();
        let (break1, break2) = (0.1f32, 1.0f32);
        let y1 = 0.2 / ln10 * (break1 + 0.05f32).ln() + 0.1;
        let y2 = 0.3 / ln10 * (break2 + 0.1f32).ln() + 0.4;
        let lin_slope = (y2 - y1) / (break2 - break1);
        let lin_off = y1 - lin_slope * break1;
        let p = DoubleLogParams::new(
            10.0, break1, break2, //
            0.2, 0.1, 1.0, 0.05, //
            0.3, 0.4, 1.0, 0.1, //
            lin_slope, lin_off,
        )
        .unwrap();
        let fwd = FixedFunctionOp::new(FixedFunctionStyle::LinToDoubleLog(p), true).unwrap();
        let inv = fwd.inverted();
        for v in [0.01f32, 0.05, 0.5, 0.9, 2.0] {
            let mut px = [v, v, v, 1.0];
            fwd.apply_rgba(&mut px);
            inv.apply_rgba(&mut px);
            assert!((px[0] - v).abs() < 1e-4, "v = {v}, got {}", px[0]);
        }
    }

    #[test]
    fn crosstalk_classification() {
        let pq = FixedFunctionOp::new(FixedFunctionStyle::LinToPq, true).unwrap();
        assert!(!pq.has_channel_crosstalk());
        let glow = FixedFunctionOp::new(FixedFunctionStyle::AcesGlow10, true).unwrap();
        assert!(glow.has_channel_crosstalk());
    }
}
