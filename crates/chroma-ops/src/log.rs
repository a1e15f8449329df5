//! Logarithm operations.
//!
//! Covers plain log2/log10, the affine lin-to-log family and the camera
//! variant with a linear segment below a break point.
//!
//! # Formula
//!
//! ```text
//! logToLin:  y = (base^((x - logOff) / logSlope) - linOff) / linSlope
//! linToLog:  y = logSlope * log_base(linSlope * x + linOff) + logOff
//! ```
//!
//! Camera styles replace the curve below `lin_side_break` with a straight
//! line. The line's slope either comes from `linear_slope` or is derived
//! so the segments join with matching slope.

use crate::{OpError, OpResult};

/// log2(10)
pub const LOG2_10: f64 = 3.321928094887362;
/// log10(2)
pub const LOG10_2: f64 = 0.30102999566398114;

/// Values at or below zero clamp to this before taking the log.
const MIN_VALUE: f64 = f64::MIN_POSITIVE;

/// Direction and family of a log op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogStyle {
    /// Pure base-2 logarithm.
    Log2,
    /// Pure base-10 logarithm.
    Log10,
    /// Inverse of [`LogStyle::Log2`].
    AntiLog2,
    /// Inverse of [`LogStyle::Log10`].
    AntiLog10,
    /// Affine lin-to-log with the full parameter set.
    LinToLog,
    /// Inverse of [`LogStyle::LinToLog`].
    LogToLin,
    /// Lin-to-log with a linear segment below the break.
    CameraLinToLog,
    /// Inverse of [`LogStyle::CameraLinToLog`].
    CameraLogToLin,
}

impl LogStyle {
    /// The style that undoes this one.
    pub fn inverse(self) -> LogStyle {
        match self {
            LogStyle::Log2 => LogStyle::AntiLog2,
            LogStyle::Log10 => LogStyle::AntiLog10,
            LogStyle::AntiLog2 => LogStyle::Log2,
            LogStyle::AntiLog10 => LogStyle::Log10,
            LogStyle::LinToLog => LogStyle::LogToLin,
            LogStyle::LogToLin => LogStyle::LinToLog,
            LogStyle::CameraLinToLog => LogStyle::CameraLogToLin,
            LogStyle::CameraLogToLin => LogStyle::CameraLinToLog,
        }
    }

    /// True for the camera styles.
    pub fn is_camera(self) -> bool {
        matches!(self, LogStyle::CameraLinToLog | LogStyle::CameraLogToLin)
    }

    /// True for the styles that map lin to log (forward shaper).
    fn to_log(self) -> bool {
        matches!(
            self,
            LogStyle::Log2 | LogStyle::Log10 | LogStyle::LinToLog | LogStyle::CameraLinToLog
        )
    }
}

/// Per-channel parameters of the affine log curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogParams {
    /// Slope on the log side.
    pub log_side_slope: f64,
    /// Offset on the log side.
    pub log_side_offset: f64,
    /// Slope on the linear side.
    pub lin_side_slope: f64,
    /// Offset on the linear side.
    pub lin_side_offset: f64,
    /// Linear-domain break point (camera styles only).
    pub lin_side_break: Option<f64>,
    /// Slope of the linear segment; derived for continuity when absent.
    pub linear_slope: Option<f64>,
}

impl Default for LogParams {
    fn default() -> Self {
        Self {
            log_side_slope: 1.0,
            log_side_offset: 0.0,
            lin_side_slope: 1.0,
            lin_side_offset: 0.0,
            lin_side_break: None,
            linear_slope: None,
        }
    }
}

/// Precomputed camera-segment values.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CameraSeg {
    lin_break: f64,
    log_break: f64,
    slope: f64,
    offset: f64,
}

/// Logarithm operation over the RGB channels.
#[derive(Debug, Clone, PartialEq)]
pub struct LogOp {
    /// Style and direction.
    pub style: LogStyle,
    /// Logarithm base.
    pub base: f64,
    /// Per-channel parameters [R, G, B].
    pub params: [LogParams; 3],
    segs: [Option<CameraSeg>; 3],
}

impl LogOp {
    /// Pure log/antilog in the given base (2 or 10 via style).
    pub fn basic(style: LogStyle) -> OpResult<Self> {
        let base = match style {
            LogStyle::Log2 | LogStyle::AntiLog2 => 2.0,
            LogStyle::Log10 | LogStyle::AntiLog10 => 10.0,
            other => {
                return Err(OpError::Invalid(format!(
                    "style {other:?} requires explicit parameters"
                )));
            }
        };
        Self::new(style, base, [LogParams::default(); 3])
    }

    /// Creates a validated log op.
    pub fn new(style: LogStyle, base: f64, params: [LogParams; 3]) -> OpResult<Self> {
        if !(base > 0.0) || (base - 1.0).abs() < 1e-9 {
            return Err(OpError::Invalid(format!("invalid log base: {base}")));
        }
        let mut segs = [None; 3];
        for (i, p) in params.iter().enumerate() {
            if p.lin_side_slope == 0.0 {
                return Err(OpError::Invalid("lin_side_slope must be non-zero".into()));
            }
            if p.log_side_slope == 0.0 {
                return Err(OpError::Invalid("log_side_slope must be non-zero".into()));
            }
            if style.is_camera() {
                let brk = p.lin_side_break.ok_or_else(|| {
                    OpError::Invalid("camera log styles require lin_side_break".into())
                })?;
                segs[i] = Some(camera_segment(base, p, brk));
            } else if p.lin_side_break.is_some() {
                return Err(OpError::Invalid(
                    "lin_side_break is only valid for camera styles".into(),
                ));
            }
        }
        Ok(Self {
            style,
            base,
            params,
            segs,
        })
    }

    /// The inverse op (mirrored style, same parameters).
    pub fn inverted(&self) -> LogOp {
        LogOp {
            style: self.style.inverse(),
            base: self.base,
            params: self.params,
            segs: self.segs,
        }
    }

    #[inline]
    fn lin_to_log(&self, x: f64, p: &LogParams) -> f64 {
        let arg = (x * p.lin_side_slope + p.lin_side_offset).max(MIN_VALUE);
        arg.log2() * (p.log_side_slope / self.base.log2()) + p.log_side_offset
    }

    #[inline]
    fn log_to_lin(&self, x: f64, p: &LogParams) -> f64 {
        let e = (x - p.log_side_offset) * self.base.log2() / p.log_side_slope;
        (e.exp2() - p.lin_side_offset) / p.lin_side_slope
    }

    #[inline]
    fn eval(&self, v: f32, i: usize) -> f32 {
        let p = &self.params[i];
        let x = f64::from(v);
        let out = match (self.style.to_log(), self.segs[i]) {
            (true, None) => self.lin_to_log(x, p),
            (false, None) => self.log_to_lin(x, p),
            (true, Some(seg)) => {
                if x < seg.lin_break {
                    seg.slope * x + seg.offset
                } else {
                    self.lin_to_log(x, p)
                }
            }
            (false, Some(seg)) => {
                if x < seg.log_break {
                    if seg.slope == 0.0 {
                        seg.lin_break
                    } else {
                        (x - seg.offset) / seg.slope
                    }
                } else {
                    self.log_to_lin(x, p)
                }
            }
        };
        out as f32
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        for px in pixels.chunks_exact_mut(4) {
            px[0] = self.eval(px[0], 0);
            px[1] = self.eval(px[1], 1);
            px[2] = self.eval(px[2], 2);
            // Alpha unchanged
        }
    }
}

/// Derives the linear segment of a camera-style curve.
fn camera_segment(base: f64, p: &LogParams, brk: f64) -> CameraSeg {
    let log2_base = base.log2();
    let k = p.log_side_slope;
    let kb = p.log_side_offset;
    let m = p.lin_side_slope;
    let b = p.lin_side_offset;

    let arg = m * brk + b;
    let log_break = if arg <= 0.0 {
        kb
    } else {
        arg.log2() * (k / log2_base) + kb
    };

    let slope = match p.linear_slope {
        Some(s) => s,
        None => {
            // Slope of the log curve at the break, so the join is smooth.
            let denom = arg * base.ln();
            if denom.abs() < 1e-10 { 0.0 } else { k * m / denom }
        }
    };
    let offset = log_break - slope * brk;

    CameraSeg {
        lin_break: brk,
        log_break,
        slope,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn log10_round_trip() {
        let fwd = LogOp::basic(LogStyle::Log10).unwrap();
        let rev = fwd.inverted();
        for v in [0.001f32, 0.01, 0.18, 0.5, 1.0, 10.0] {
            let mut px = [v, v, v, 1.0];
            fwd.apply_rgba(&mut px);
            rev.apply_rgba(&mut px);
            assert!(
                (px[0] - v).abs() < EPSILON * v.max(1.0),
                "v = {v}, got {}",
                px[0]
            );
        }
    }

    #[test]
    fn log2_known_values() {
        let op = LogOp::basic(LogStyle::Log2).unwrap();
        let mut px = [8.0f32, 1.0, 0.5, 1.0];
        op.apply_rgba(&mut px);
        assert!((px[0] - 3.0).abs() < EPSILON);
        assert!(px[1].abs() < EPSILON);
        assert!((px[2] + 1.0).abs() < EPSILON);
    }

    #[test]
    fn non_positive_input_clamps() {
        let op = LogOp::basic(LogStyle::Log10).unwrap();
        let mut px = [0.0f32, -1.0, 1.0, 1.0];
        op.apply_rgba(&mut px);
        // Clamped to the smallest positive value, a large negative log.
        assert!(px[0].is_finite() && px[0] < -100.0);
        assert!(px[1].is_finite() && px[1] < -100.0);
    }

    #[test]
    fn lin_to_log_cineon_like() {
        let p = LogParams {
            log_side_slope: 0.256,
            log_side_offset: 0.685,
            lin_side_slope: 1.0,
            lin_side_offset: 0.0,
            ..Default::default()
        };
        let op = LogOp::new(LogStyle::LinToLog, 10.0, [p; 3]).unwrap();
        let rev = op.inverted();
        let mut px = [0.18f32, 1.0, 0.9, 1.0];
        op.apply_rgba(&mut px);
        // 0.256 * log10(0.18) + 0.685
        assert!((px[0] - (0.256 * (0.18f64).log10() + 0.685) as f32).abs() < EPSILON);
        assert!((px[1] - 0.685).abs() < EPSILON);
        rev.apply_rgba(&mut px);
        assert!((px[0] - 0.18).abs() < 1e-5);
        assert!((px[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn camera_segment_is_continuous() {
        let p = LogParams {
            log_side_slope: 0.25,
            log_side_offset: 0.5,
            lin_side_slope: 1.0,
            lin_side_offset: 0.01,
            lin_side_break: Some(0.02),
            linear_slope: None,
        };
        let op = LogOp::new(LogStyle::CameraLinToLog, 2.0, [p; 3]).unwrap();
        let mut lo = [0.02f32 - 1e-5, 0.0, 0.0, 1.0];
        let mut hi = [0.02f32 + 1e-5, 0.0, 0.0, 1.0];
        op.apply_rgba(&mut lo);
        op.apply_rgba(&mut hi);
        assert!((lo[0] - hi[0]).abs() < 1e-4);
    }

    #[test]
    fn camera_round_trip_below_break() {
        let p = LogParams {
            log_side_slope: 0.25,
            log_side_offset: 0.5,
            lin_side_slope: 1.0,
            lin_side_offset: 0.01,
            lin_side_break: Some(0.1),
            linear_slope: None,
        };
        let fwd = LogOp::new(LogStyle::CameraLinToLog, 2.0, [p; 3]).unwrap();
        let rev = fwd.inverted();
        for v in [-0.05f32, 0.0, 0.05, 0.1, 0.5, 4.0] {
            let mut px = [v, v, v, 1.0];
            fwd.apply_rgba(&mut px);
            rev.apply_rgba(&mut px);
            assert!((px[0] - v).abs() < 1e-5, "v = {v}, got {}", px[0]);
        }
    }

    #[test]
    fn camera_requires_break() {
        let op = LogOp::new(LogStyle::CameraLinToLog, 2.0, [LogParams::default(); 3]);
        assert!(op.is_err());
    }

    #[test]
    fn bad_base_rejected() {
        assert!(LogOp::new(LogStyle::LinToLog, 1.0, [LogParams::default(); 3]).is_err());
        assert!(LogOp::new(LogStyle::LinToLog, -2.0, [LogParams::default(); 3]).is_err());
    }
}
