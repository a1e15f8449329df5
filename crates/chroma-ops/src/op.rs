//! The closed op sum type.
//!
//! Every color operation the engine can execute is one of these
//! variants, with direction already baked in by the builder. An [`Op`]
//! carries bit-depth metadata on both sides; kernels themselves always
//! run on normalized f32 and the depths only matter to the optimizer
//! (scale folding) and to callers that care about quantization.

use chroma_core::BitDepth;
use chroma_lut::Interpolation;

use crate::dynamic::DynamicHandle;
use crate::exposure_contrast::{ExposureContrastOp, ExposureContrastStyle};
use crate::fixed_function::{FixedFunctionOp, FixedFunctionStyle};
use crate::grading::{GradingPrimaryOp, GradingRgbCurveOp, GradingStyle};
use crate::hash::ContentHasher;
use crate::log::{LogOp, LogStyle};
use crate::lut_ops::{InvLut3DOp, Lut1DOp, Lut3DOp};
use crate::{
    CdlOp, ExponentOp, ExponentWithLinearOp, MatrixOp, NegativeStyle, OpResult, RangeOp,
};

/// Identity tolerance used by no-op detection.
const NOOP_TOL: f64 = 1e-6;

/// One concrete color operation.
#[derive(Debug, Clone)]
pub enum OpKind {
    /// 4x4 matrix plus offset.
    Matrix(MatrixOp),
    /// Affine remap with clamping.
    Range(RangeOp),
    /// Per-channel power.
    Exponent(ExponentOp),
    /// Power with a spliced linear toe.
    ExponentWithLinear(ExponentWithLinearOp),
    /// Logarithm family, including camera curves.
    Log(LogOp),
    /// ASC CDL grade.
    Cdl(CdlOp),
    /// Named non-parametric kernel.
    FixedFunction(FixedFunctionOp),
    /// Exposure/contrast/gamma with dynamic parameters.
    ExposureContrast(ExposureContrastOp),
    /// Primary grade.
    GradingPrimary(GradingPrimaryOp),
    /// RGB curve grade.
    GradingRgbCurve(GradingRgbCurveOp),
    /// 1D lookup table.
    Lut1D(Lut1DOp),
    /// 3D lookup table.
    Lut3D(Lut3DOp),
    /// Exact 3D lookup table inverse.
    InvLut3D(InvLut3DOp),
}

/// An op with its bit-depth metadata.
#[derive(Debug, Clone)]
pub struct Op {
    /// The kernel.
    pub kind: OpKind,
    /// Depth the incoming pixels are nominally encoded at.
    pub input_depth: BitDepth,
    /// Depth the outgoing pixels are nominally encoded at.
    pub output_depth: BitDepth,
}

impl Op {
    /// Wraps a kernel at the default f32 depths.
    pub fn new(kind: OpKind) -> Self {
        Self {
            kind,
            input_depth: BitDepth::default(),
            output_depth: BitDepth::default(),
        }
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        match &self.kind {
            OpKind::Matrix(op) => op.apply_rgba(pixels),
            OpKind::Range(op) => op.apply_rgba(pixels),
            OpKind::Exponent(op) => op.apply_rgba(pixels),
            OpKind::ExponentWithLinear(op) => op.apply_rgba(pixels),
            OpKind::Log(op) => op.apply_rgba(pixels),
            OpKind::Cdl(op) => op.apply_rgba(pixels),
            OpKind::FixedFunction(op) => op.apply_rgba(pixels),
            OpKind::ExposureContrast(op) => op.apply_rgba(pixels),
            OpKind::GradingPrimary(op) => op.apply_rgba(pixels),
            OpKind::GradingRgbCurve(op) => op.apply_rgba(pixels),
            OpKind::Lut1D(op) => op.apply_rgba(pixels),
            OpKind::Lut3D(op) => op.apply_rgba(pixels),
            OpKind::InvLut3D(op) => op.apply_rgba(pixels),
        }
    }

    /// True when the op provably changes nothing. Dynamic ops are never
    /// no-ops.
    pub fn is_noop(&self) -> bool {
        match &self.kind {
            OpKind::Matrix(op) => op.is_identity(NOOP_TOL),
            OpKind::Range(op) => op.is_noop(),
            OpKind::Exponent(op) => op.is_identity(),
            OpKind::ExponentWithLinear(op) => op.is_identity(),
            OpKind::Cdl(op) => op.is_identity(),
            OpKind::ExposureContrast(op) => op.is_noop(),
            OpKind::GradingPrimary(op) => op.is_noop(),
            OpKind::GradingRgbCurve(op) => op.is_noop(),
            OpKind::Log(_)
            | OpKind::FixedFunction(_)
            | OpKind::Lut1D(_)
            | OpKind::Lut3D(_)
            | OpKind::InvLut3D(_) => false,
        }
    }

    /// True when output channels depend on more than one input channel.
    pub fn has_channel_crosstalk(&self) -> bool {
        match &self.kind {
            OpKind::Matrix(op) => op.has_channel_crosstalk(),
            OpKind::Cdl(op) => op.has_channel_crosstalk(),
            OpKind::FixedFunction(op) => op.has_channel_crosstalk(),
            OpKind::GradingPrimary(op) => op.has_channel_crosstalk(),
            OpKind::Lut3D(_) | OpKind::InvLut3D(_) => true,
            OpKind::Range(_)
            | OpKind::Exponent(_)
            | OpKind::ExponentWithLinear(_)
            | OpKind::Log(_)
            | OpKind::ExposureContrast(_)
            | OpKind::GradingRgbCurve(_)
            | OpKind::Lut1D(_) => false,
        }
    }

    /// True when a parameter can change after compilation.
    pub fn is_dynamic(&self) -> bool {
        match &self.kind {
            OpKind::ExposureContrast(op) => op.is_dynamic(),
            OpKind::GradingPrimary(op) => op.is_dynamic(),
            OpKind::GradingRgbCurve(op) => op.is_dynamic(),
            _ => false,
        }
    }

    /// Handles for every parameter marked dynamic on this op.
    pub fn dynamic_handles(&self) -> Vec<DynamicHandle> {
        match &self.kind {
            OpKind::ExposureContrast(op) => op.dynamic_handles(),
            OpKind::GradingPrimary(op) if op.is_dynamic() => {
                vec![DynamicHandle::clone(op.handle())]
            }
            OpKind::GradingRgbCurve(op) if op.is_dynamic() => {
                vec![DynamicHandle::clone(op.handle())]
            }
            _ => Vec::new(),
        }
    }

    /// The inverse op, with the depth metadata swapped.
    pub fn inverted(&self) -> OpResult<Op> {
        let kind = match &self.kind {
            OpKind::Matrix(op) => OpKind::Matrix(op.inverted()?),
            OpKind::Range(op) => OpKind::Range(op.inverted()),
            OpKind::Exponent(op) => OpKind::Exponent(op.inverted()?),
            OpKind::ExponentWithLinear(op) => OpKind::ExponentWithLinear(op.inverted()),
            OpKind::Log(op) => OpKind::Log(op.inverted()),
            OpKind::Cdl(op) => OpKind::Cdl(op.inverted()),
            OpKind::FixedFunction(op) => OpKind::FixedFunction(op.inverted()),
            OpKind::ExposureContrast(op) => OpKind::ExposureContrast(op.inverted()),
            OpKind::GradingPrimary(op) => OpKind::GradingPrimary(op.inverted()),
            OpKind::GradingRgbCurve(op) => OpKind::GradingRgbCurve(op.inverted()),
            OpKind::Lut1D(op) => OpKind::Lut1D(op.inverted()?),
            OpKind::Lut3D(op) => OpKind::InvLut3D(op.inverted()),
            OpKind::InvLut3D(op) => OpKind::Lut3D(op.inverted(Interpolation::Best)),
        };
        Ok(Op {
            kind,
            input_depth: self.output_depth,
            output_depth: self.input_depth,
        })
    }

    /// Stable hash over the op's parameters, direction and depths.
    ///
    /// Two ops with equal hashes evaluate identically; the optimizer
    /// uses this for inverse-pair detection and the processor for its
    /// cache ID.
    pub fn content_hash(&self) -> u64 {
        let mut h = ContentHasher::new();
        self.hash_into(&mut h);
        h.finish()
    }

    /// Feeds the op's canonical parameter bytes to `h`.
    pub fn hash_into(&self, h: &mut ContentHasher) {
        h.update_u8(depth_tag(self.input_depth));
        h.update_u8(depth_tag(self.output_depth));
        match &self.kind {
            OpKind::Matrix(op) => {
                h.update_u8(1);
                h.update_f64_slice(&op.rows());
                h.update_f64_slice(&op.offset.to_array());
            }
            OpKind::Range(op) => {
                h.update_u8(2);
                h.update_opt_f64(op.min_in);
                h.update_opt_f64(op.max_in);
                h.update_opt_f64(op.min_out);
                h.update_opt_f64(op.max_out);
            }
            OpKind::Exponent(op) => {
                h.update_u8(3);
                h.update_u8(match op.style {
                    NegativeStyle::Clamp => 0,
                    NegativeStyle::Mirror => 1,
                    NegativeStyle::PassThru => 2,
                });
                h.update_f64_slice(&op.value);
            }
            OpKind::ExponentWithLinear(op) => {
                h.update_u8(4);
                h.update_f64_slice(&op.gamma);
                h.update_f64_slice(&op.offset);
                h.update_u8(op.forward as u8);
            }
            OpKind::Log(op) => {
                h.update_u8(5);
                h.update_u8(log_style_tag(op.style));
                h.update_f64(op.base);
                for p in &op.params {
                    h.update_f64(p.log_side_slope);
                    h.update_f64(p.log_side_offset);
                    h.update_f64(p.lin_side_slope);
                    h.update_f64(p.lin_side_offset);
                    h.update_opt_f64(p.lin_side_break);
                    h.update_opt_f64(p.linear_slope);
                }
            }
            OpKind::Cdl(op) => {
                h.update_u8(6);
                h.update_f64_slice(&op.slope);
                h.update_f64_slice(&op.offset);
                h.update_f64_slice(&op.power);
                h.update_f64(op.saturation);
                h.update_f64_slice(&op.luma);
                h.update_u8(op.forward as u8);
            }
            OpKind::FixedFunction(op) => {
                h.update_u8(7);
                hash_fixed_function(h, &op.style);
                h.update_u8(op.forward as u8);
            }
            OpKind::ExposureContrast(op) => {
                h.update_u8(8);
                h.update_u8(match op.style() {
                    ExposureContrastStyle::Linear => 0,
                    ExposureContrastStyle::Video => 1,
                    ExposureContrastStyle::Logarithmic => 2,
                });
                h.update_f64(op.exposure().double());
                h.update_f64(op.contrast().double());
                h.update_f64(op.gamma().double());
                h.update_f64(op.pivot);
                h.update_f64(op.log_exposure_step);
                h.update_f64(op.log_midgray);
                h.update_u8(op.is_dynamic() as u8);
                h.update_u8(op.is_forward() as u8);
            }
            OpKind::GradingPrimary(op) => {
                h.update_u8(9);
                let gp = op.value();
                h.update_u8(grading_style_tag(gp.style));
                for rgbm in [
                    gp.brightness,
                    gp.contrast,
                    gp.gamma,
                    gp.offset,
                    gp.exposure,
                    gp.lift,
                    gp.gain,
                ] {
                    h.update_f32_slice(&[rgbm.red, rgbm.green, rgbm.blue, rgbm.master]);
                }
                h.update_f32_slice(&[
                    gp.saturation,
                    gp.pivot,
                    gp.pivot_black,
                    gp.pivot_white,
                    gp.clamp_black,
                    gp.clamp_white,
                ]);
                h.update_u8(op.is_dynamic() as u8);
                h.update_u8(op.is_forward() as u8);
            }
            OpKind::GradingRgbCurve(op) => {
                h.update_u8(10);
                h.update_u8(grading_style_tag(op.style()));
                let curves = op.curves();
                for curve in &curves.curves {
                    h.update_usize(curve.control_points.len());
                    for p in &curve.control_points {
                        h.update_f32(p.x);
                        h.update_f32(p.y);
                    }
                    h.update_f32_slice(&curve.slopes);
                }
                h.update_u8(op.is_dynamic() as u8);
                h.update_u8(op.is_forward() as u8);
            }
            OpKind::Lut1D(op) => {
                h.update_u8(11);
                h.update_u8(interp_tag(op.interp()));
                let lut = op.lut();
                h.update_f32(lut.domain_min);
                h.update_f32(lut.domain_max);
                h.update_usize(lut.r.len());
                h.update_f32_slice(&lut.r);
                for chan in [&lut.g, &lut.b] {
                    match chan {
                        Some(data) => {
                            h.update_u8(1);
                            h.update_f32_slice(data);
                        }
                        None => h.update_u8(0),
                    }
                }
            }
            OpKind::Lut3D(op) => {
                h.update_u8(12);
                h.update_u8(interp_tag(op.interp()));
                hash_cube(h, op.lut());
            }
            OpKind::InvLut3D(op) => {
                h.update_u8(13);
                hash_cube(h, op.forward_lut());
            }
        }
    }
}

impl From<OpKind> for Op {
    fn from(kind: OpKind) -> Self {
        Op::new(kind)
    }
}

fn depth_tag(depth: BitDepth) -> u8 {
    match depth {
        BitDepth::UInt8 => 0,
        BitDepth::UInt10 => 1,
        BitDepth::UInt12 => 2,
        BitDepth::UInt16 => 3,
        BitDepth::F16 => 4,
        BitDepth::F32 => 5,
    }
}

fn log_style_tag(style: LogStyle) -> u8 {
    match style {
        LogStyle::Log2 => 0,
        LogStyle::Log10 => 1,
        LogStyle::AntiLog2 => 2,
        LogStyle::AntiLog10 => 3,
        LogStyle::LinToLog => 4,
        LogStyle::LogToLin => 5,
        LogStyle::CameraLinToLog => 6,
        LogStyle::CameraLogToLin => 7,
    }
}

fn grading_style_tag(style: GradingStyle) -> u8 {
    match style {
        GradingStyle::Log => 0,
        GradingStyle::Linear => 1,
        GradingStyle::Video => 2,
    }
}

fn interp_tag(interp: Interpolation) -> u8 {
    match interp {
        Interpolation::Nearest => 0,
        Interpolation::Linear => 1,
        Interpolation::Tetrahedral => 2,
        Interpolation::Best => 3,
    }
}

fn hash_fixed_function(h: &mut ContentHasher, style: &FixedFunctionStyle) {
    match style {
        FixedFunctionStyle::AcesRedMod03 => h.update_u8(0),
        FixedFunctionStyle::AcesRedMod10 => h.update_u8(1),
        FixedFunctionStyle::AcesGlow03 => h.update_u8(2),
        FixedFunctionStyle::AcesGlow10 => h.update_u8(3),
        FixedFunctionStyle::AcesDarkToDim10 => h.update_u8(4),
        FixedFunctionStyle::GamutComp13(p) => {
            h.update_u8(5);
            h.update_f32_slice(&[
                p.lim_cyan,
                p.lim_magenta,
                p.lim_yellow,
                p.thr_cyan,
                p.thr_magenta,
                p.thr_yellow,
                p.power,
            ]);
        }
        FixedFunctionStyle::Rec2100Surround { gamma } => {
            h.update_u8(6);
            h.update_f32(*gamma);
        }
        FixedFunctionStyle::RgbToHsv => h.update_u8(7),
        FixedFunctionStyle::XyzToXyy => h.update_u8(8),
        FixedFunctionStyle::XyzToUvy => h.update_u8(9),
        FixedFunctionStyle::XyzToLuv => h.update_u8(10),
        FixedFunctionStyle::LinToPq => h.update_u8(11),
        FixedFunctionStyle::LinToDoubleLog(p) => {
            h.update_u8(12);
            h.update_f32_slice(&[
                p.base,
                p.break1,
                p.break2,
                p.log1_slope,
                p.log1_off,
                p.log1_lin_slope,
                p.log1_lin_off,
                p.log2_slope,
                p.log2_off,
                p.log2_lin_slope,
                p.log2_lin_off,
                p.lin_slope,
                p.lin_off,
            ]);
        }
    }
}

fn hash_cube(h: &mut ContentHasher, lut: &chroma_lut::Lut3D) {
    h.update_usize(lut.size);
    for rgb in &lut.data {
        h.update_f32_slice(rgb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chroma_lut::Lut3D;

    #[test]
    fn identity_matrix_is_noop() {
        let op = Op::new(OpKind::Matrix(MatrixOp::identity()));
        assert!(op.is_noop());
        assert!(!op.has_channel_crosstalk());
        assert!(!op.is_dynamic());
    }

    #[test]
    fn hash_is_stable_and_parameter_sensitive() {
        let a = Op::new(OpKind::Matrix(MatrixOp::from_diagonal([2.0, 1.0, 1.0, 1.0])));
        let b = Op::new(OpKind::Matrix(MatrixOp::from_diagonal([2.0, 1.0, 1.0, 1.0])));
        let c = Op::new(OpKind::Matrix(MatrixOp::from_diagonal([2.1, 1.0, 1.0, 1.0])));
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn hash_distinguishes_kinds() {
        let m = Op::new(OpKind::Matrix(MatrixOp::identity()));
        let r = Op::new(OpKind::Range(RangeOp::default()));
        assert_ne!(m.content_hash(), r.content_hash());
    }

    #[test]
    fn inverted_swaps_depths() {
        let mut op = Op::new(OpKind::Matrix(MatrixOp::from_scale_offset(2.0, 0.1)));
        op.input_depth = BitDepth::UInt8;
        op.output_depth = BitDepth::F32;
        let inv = op.inverted().unwrap();
        assert_eq!(inv.input_depth, BitDepth::F32);
        assert_eq!(inv.output_depth, BitDepth::UInt8);
    }

    #[test]
    fn inverse_pair_hashes_match() {
        let fwd = Op::new(OpKind::Matrix(MatrixOp::from_scale_offset(2.0, 0.0)));
        let explicit_inv = Op::new(OpKind::Matrix(MatrixOp::from_scale_offset(0.5, 0.0)));
        assert_eq!(fwd.inverted().unwrap().content_hash(), explicit_inv.content_hash());
    }

    #[test]
    fn lut3d_reports_crosstalk() {
        let op = Op::new(OpKind::Lut3D(Lut3DOp::new(
            Lut3D::identity(5),
            Interpolation::Tetrahedral,
        )));
        assert!(op.has_channel_crosstalk());
        assert!(!op.is_noop());
    }

    #[test]
    fn dynamic_op_exposes_handles() {
        let mut ec = ExposureContrastOp::new(
            ExposureContrastStyle::Linear,
            0.0,
            1.0,
            1.0,
            0.18,
            true,
        );
        ec.make_exposure_dynamic();
        let op = Op::new(OpKind::ExposureContrast(ec));
        assert!(op.is_dynamic());
        assert!(!op.is_noop());
        assert_eq!(op.dynamic_handles().len(), 1);
    }
}
