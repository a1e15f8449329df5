//! Compiled processors.
//!
//! A processor is the executable form of a transform: the optimized op
//! list, the shared dynamic handles, and a content-derived cache ID.
//! Compilation is the single failure site; apply never raises per pixel.
//!
//! Within one processor all ops marked dynamic share one handle per
//! parameter kind, so a single `set_double` reaches every op that reads
//! that parameter.

use chroma_core::ImageDesc;
use chroma_ops::{
    optimize, ContentHasher, DynamicHandle, DynamicPropertyKind, Op, OpKind,
};
use rayon::prelude::*;

use crate::builder;
use crate::config::Config;
use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::loader::{self, FileStamp, LutLoader};
use crate::transform::*;

/// A compiled, immutable color transformation.
#[derive(Debug, Clone)]
pub struct Processor {
    ops: Vec<Op>,
    dynamics: Vec<DynamicHandle>,
    noop: bool,
    crosstalk: bool,
    cache_id: u64,
}

impl Processor {
    /// Compiles a transform against a config, using the process-wide
    /// LUT loader.
    pub fn compile(
        config: &Config,
        context: &Context,
        transform: &Transform,
        direction: Direction,
    ) -> EngineResult<Self> {
        Self::compile_with(loader::global(), config, context, transform, direction)
    }

    /// Compiles with an explicit loader.
    pub fn compile_with(
        loader: &LutLoader,
        config: &Config,
        context: &Context,
        transform: &Transform,
        direction: Direction,
    ) -> EngineResult<Self> {
        let mut files = Vec::new();
        let built = builder::build(config, context, loader, transform, direction, &mut files)?;
        let mut ops = optimize(built);
        let dynamics = share_dynamic_handles(&mut ops);

        let noop = ops.iter().all(Op::is_noop);
        let crosstalk = ops.iter().any(Op::has_channel_crosstalk);
        let cache_id = compute_cache_id(&ops, &files);

        Ok(Self {
            ops,
            dynamics,
            noop,
            crosstalk,
            cache_id,
        })
    }

    /// The optimized op list.
    #[inline]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Number of ops after optimization.
    #[inline]
    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    /// True when applying provably changes nothing.
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.noop
    }

    /// True when any op mixes channels, so RGB outputs may depend on
    /// all RGB inputs.
    #[inline]
    pub fn has_channel_crosstalk(&self) -> bool {
        self.crosstalk
    }

    /// True when some parameter can still change after compilation.
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        !self.dynamics.is_empty()
    }

    /// Stable ID over op content and the loaded-file stamps. Equal IDs
    /// mean pixel-identical processors.
    #[inline]
    pub fn cache_id(&self) -> u64 {
        self.cache_id
    }

    /// The shared handle for a dynamic parameter kind.
    pub fn dynamic_property(&self, kind: DynamicPropertyKind) -> EngineResult<DynamicHandle> {
        self.dynamics
            .iter()
            .find(|h| h.kind() == kind)
            .cloned()
            .ok_or_else(|| {
                EngineError::Invalid(format!("no dynamic property of kind {kind:?}"))
            })
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        for op in &self.ops {
            op.apply_rgba(pixels);
        }
    }

    /// Applies row by row through an image description.
    ///
    /// A no-op processor still copies: 3-channel reads synthesize alpha
    /// and the write drops it again, so the pass is depth-faithful.
    pub fn apply(&self, img: &mut dyn ImageDesc) -> EngineResult<()> {
        let width = img.width();
        let mut row = vec![0.0f32; width * 4];
        for y in 0..img.height() {
            img.read_row(y, &mut row)?;
            self.apply_rgba(&mut row);
            img.write_row(y, &row)?;
        }
        Ok(())
    }

    /// Like [`apply`](Self::apply) with rows processed in parallel.
    ///
    /// Gather and scatter stay sequential; only the kernels fan out.
    pub fn apply_parallel(&self, img: &mut dyn ImageDesc) -> EngineResult<()> {
        let width = img.width();
        let height = img.height();
        let row_len = width * 4;
        let mut buf = vec![0.0f32; row_len * height];
        for (y, row) in buf.chunks_mut(row_len).enumerate() {
            img.read_row(y, row)?;
        }
        buf.par_chunks_mut(row_len).for_each(|row| {
            self.apply_rgba(row);
        });
        for (y, row) in buf.chunks(row_len).enumerate() {
            img.write_row(y, row)?;
        }
        Ok(())
    }

    /// The op list as self-contained transform nodes.
    ///
    /// Every node is inline (file LUTs become [`Lut1DTransform`] /
    /// [`Lut3DTransform`]), so the result compiles against any config.
    /// This is what the persisted processor cache stores.
    pub fn to_transforms(&self) -> Vec<Transform> {
        self.ops.iter().map(op_to_transform).collect()
    }
}

/// First handle of each kind becomes canonical; later dynamic ops are
/// rebound to it.
fn share_dynamic_handles(ops: &mut [Op]) -> Vec<DynamicHandle> {
    let mut canonical: Vec<DynamicHandle> = Vec::new();
    for op in ops.iter_mut() {
        for handle in op.dynamic_handles() {
            match canonical.iter().find(|c| c.kind() == handle.kind()) {
                Some(c) => {
                    let shared = DynamicHandle::clone(c);
                    match &mut op.kind {
                        OpKind::ExposureContrast(ec) => ec.bind(shared),
                        OpKind::GradingPrimary(g) => g.bind(shared),
                        OpKind::GradingRgbCurve(c) => c.bind(shared),
                        _ => {}
                    }
                }
                None => canonical.push(handle),
            }
        }
    }
    canonical
}

fn compute_cache_id(ops: &[Op], files: &[FileStamp]) -> u64 {
    let mut h = ContentHasher::new();
    h.update_usize(ops.len());
    for op in ops {
        op.hash_into(&mut h);
    }
    h.update_usize(files.len());
    for stamp in files {
        let bytes = stamp.path.to_string_lossy();
        h.update_usize(bytes.len());
        for b in bytes.bytes() {
            h.update_u8(b);
        }
        h.update_u64(stamp.mtime_nanos as u64);
        h.update_u64((stamp.mtime_nanos >> 64) as u64);
        h.update_u64(stamp.size);
    }
    h.finish()
}

fn rgbm_from(v: chroma_ops::GradingRgbm) -> Rgbm {
    Rgbm {
        r: f64::from(v.red),
        g: f64::from(v.green),
        b: f64::from(v.blue),
        master: f64::from(v.master),
    }
}

fn grade_style_from(style: chroma_ops::GradingStyle) -> GradeStyle {
    match style {
        chroma_ops::GradingStyle::Log => GradeStyle::Log,
        chroma_ops::GradingStyle::Linear => GradeStyle::Linear,
        chroma_ops::GradingStyle::Video => GradeStyle::Video,
    }
}

fn points_from(curve: &chroma_ops::BSplineCurve) -> Vec<[f64; 2]> {
    curve
        .control_points
        .iter()
        .map(|p| [f64::from(p.x), f64::from(p.y)])
        .collect()
}

fn direction_of(forward: bool) -> Direction {
    if forward {
        Direction::Forward
    } else {
        Direction::Inverse
    }
}

fn fixed_style_from(style: &chroma_ops::FixedFunctionStyle) -> (FixedFunctionStyle, Vec<f64>) {
    use chroma_ops::FixedFunctionStyle as F;
    match style {
        F::AcesRedMod03 => (FixedFunctionStyle::AcesRedMod03, Vec::new()),
        F::AcesRedMod10 => (FixedFunctionStyle::AcesRedMod10, Vec::new()),
        F::AcesGlow03 => (FixedFunctionStyle::AcesGlow03, Vec::new()),
        F::AcesGlow10 => (FixedFunctionStyle::AcesGlow10, Vec::new()),
        F::AcesDarkToDim10 => (FixedFunctionStyle::AcesDarkToDim10, Vec::new()),
        F::GamutComp13(p) => (
            FixedFunctionStyle::AcesGamutComp13,
            vec![
                f64::from(p.lim_cyan),
                f64::from(p.lim_magenta),
                f64::from(p.lim_yellow),
                f64::from(p.thr_cyan),
                f64::from(p.thr_magenta),
                f64::from(p.thr_yellow),
                f64::from(p.power),
            ],
        ),
        F::Rec2100Surround { gamma } => (
            FixedFunctionStyle::Rec2100Surround,
            vec![f64::from(*gamma)],
        ),
        F::RgbToHsv => (FixedFunctionStyle::RgbToHsv, Vec::new()),
        F::XyzToXyy => (FixedFunctionStyle::XyzToXyy, Vec::new()),
        F::XyzToUvy => (FixedFunctionStyle::XyzToUvy, Vec::new()),
        F::XyzToLuv => (FixedFunctionStyle::XyzToLuv, Vec::new()),
        F::LinToPq => (FixedFunctionStyle::LinToPq, Vec::new()),
        F::LinToDoubleLog(p) => (
            FixedFunctionStyle::LinToDoubleLog,
            vec![
                f64::from(p.base),
                f64::from(p.break1),
                f64::from(p.break2),
                f64::from(p.log1_slope),
                f64::from(p.log1_off),
                f64::from(p.log1_lin_slope),
                f64::from(p.log1_lin_off),
                f64::from(p.log2_slope),
                f64::from(p.log2_off),
                f64::from(p.log2_lin_slope),
                f64::from(p.log2_lin_off),
                f64::from(p.lin_slope),
                f64::from(p.lin_off),
            ],
        ),
    }
}

/// One op back to a self-contained transform node.
///
/// Ops with inversion baked in at build time (matrix, range, exponent,
/// LUTs) come back as forward nodes over the effective parameters;
/// direction-carrying ops keep theirs.
fn op_to_transform(op: &Op) -> Transform {
    use chroma_ops::LogStyle;
    match &op.kind {
        OpKind::Matrix(m) => Transform::Matrix(MatrixTransform {
            matrix: m.rows(),
            offset: m.offset.to_array(),
            direction: Direction::Forward,
        }),
        OpKind::Range(r) => Transform::Range(RangeTransform {
            min_in: r.min_in,
            max_in: r.max_in,
            min_out: r.min_out,
            max_out: r.max_out,
            direction: Direction::Forward,
        }),
        OpKind::Exponent(e) => Transform::Exponent(ExponentTransform {
            value: e.value,
            negative_style: match e.style {
                chroma_ops::NegativeStyle::Clamp => NegativeStyle::Clamp,
                chroma_ops::NegativeStyle::Mirror => NegativeStyle::Mirror,
                chroma_ops::NegativeStyle::PassThru => NegativeStyle::PassThru,
            },
            direction: Direction::Forward,
        }),
        OpKind::ExponentWithLinear(e) => {
            Transform::ExponentWithLinear(ExponentWithLinearTransform {
                gamma: e.gamma,
                offset: e.offset,
                direction: direction_of(e.forward),
            })
        }
        OpKind::Log(l) => match l.style {
            LogStyle::Log2 | LogStyle::Log10 => Transform::Log(LogTransform {
                base: l.base,
                direction: Direction::Forward,
            }),
            LogStyle::AntiLog2 | LogStyle::AntiLog10 => Transform::Log(LogTransform {
                base: l.base,
                direction: Direction::Inverse,
            }),
            LogStyle::LinToLog
            | LogStyle::LogToLin
            | LogStyle::CameraLinToLog
            | LogStyle::CameraLogToLin => Transform::LogAffine(LogAffineTransform {
                base: l.base,
                params: l.params.map(|p| LogAffineParams {
                    log_side_slope: p.log_side_slope,
                    log_side_offset: p.log_side_offset,
                    lin_side_slope: p.lin_side_slope,
                    lin_side_offset: p.lin_side_offset,
                    lin_side_break: p.lin_side_break,
                    linear_slope: p.linear_slope,
                }),
                direction: direction_of(matches!(
                    l.style,
                    LogStyle::LinToLog | LogStyle::CameraLinToLog
                )),
            }),
        },
        OpKind::Cdl(c) => Transform::Cdl(CdlTransform {
            slope: c.slope,
            offset: c.offset,
            power: c.power,
            saturation: c.saturation,
            direction: direction_of(c.forward),
        }),
        OpKind::FixedFunction(f) => {
            let (style, params) = fixed_style_from(&f.style);
            Transform::FixedFunction(FixedFunctionTransform {
                style,
                params,
                direction: direction_of(f.forward),
            })
        }
        OpKind::ExposureContrast(ec) => {
            let kinds: Vec<_> = ec.dynamic_handles().iter().map(|h| h.kind()).collect();
            Transform::ExposureContrast(ExposureContrastTransform {
                style: match ec.style() {
                    chroma_ops::ExposureContrastStyle::Linear => ExposureContrastStyle::Linear,
                    chroma_ops::ExposureContrastStyle::Video => ExposureContrastStyle::Video,
                    chroma_ops::ExposureContrastStyle::Logarithmic => {
                        ExposureContrastStyle::Logarithmic
                    }
                },
                exposure: ec.exposure().double(),
                contrast: ec.contrast().double(),
                gamma: ec.gamma().double(),
                pivot: ec.pivot,
                dynamic_exposure: kinds.contains(&DynamicPropertyKind::Exposure),
                dynamic_contrast: kinds.contains(&DynamicPropertyKind::Contrast),
                dynamic_gamma: kinds.contains(&DynamicPropertyKind::Gamma),
                direction: direction_of(ec.is_forward()),
            })
        }
        OpKind::GradingPrimary(g) => {
            let v = g.value();
            Transform::GradingPrimary(GradingPrimaryTransform {
                style: grade_style_from(v.style),
                brightness: rgbm_from(v.brightness),
                contrast: rgbm_from(v.contrast),
                gamma: rgbm_from(v.gamma),
                offset: rgbm_from(v.offset),
                exposure: rgbm_from(v.exposure),
                lift: rgbm_from(v.lift),
                gain: rgbm_from(v.gain),
                saturation: f64::from(v.saturation),
                pivot: f64::from(v.pivot),
                pivot_black: f64::from(v.pivot_black),
                pivot_white: f64::from(v.pivot_white),
                clamp_black: (v.clamp_black != f32::NEG_INFINITY)
                    .then_some(f64::from(v.clamp_black)),
                clamp_white: (v.clamp_white != f32::INFINITY)
                    .then_some(f64::from(v.clamp_white)),
                dynamic: g.is_dynamic(),
                direction: direction_of(g.is_forward()),
            })
        }
        OpKind::GradingRgbCurve(c) => {
            let curves = c.curves();
            Transform::GradingRgbCurve(GradingRgbCurveTransform {
                style: grade_style_from(c.style()),
                red: points_from(&curves.curves[0]),
                green: points_from(&curves.curves[1]),
                blue: points_from(&curves.curves[2]),
                master: points_from(&curves.curves[3]),
                dynamic: c.is_dynamic(),
                direction: direction_of(c.is_forward()),
            })
        }
        OpKind::Lut1D(l) => {
            let lut = l.lut();
            Transform::Lut1D(Lut1DTransform {
                r: lut.r.clone(),
                g: lut.g.clone(),
                b: lut.b.clone(),
                domain_min: lut.domain_min,
                domain_max: lut.domain_max,
                interpolation: l.interp(),
                direction: Direction::Forward,
            })
        }
        OpKind::Lut3D(l) => {
            let lut = l.lut();
            Transform::Lut3D(Lut3DTransform {
                size: lut.size,
                data: lut.data.clone(),
                interpolation: l.interp(),
                direction: Direction::Forward,
            })
        }
        OpKind::InvLut3D(l) => {
            let lut = l.forward_lut();
            Transform::Lut3D(Lut3DTransform {
                size: lut.size,
                data: lut.data.clone(),
                interpolation: chroma_lut::Interpolation::Best,
                direction: Direction::Inverse,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chroma_core::PackedImageDesc;

    const EPSILON: f32 = 1e-5;

    fn ctx() -> Context {
        Context::new(crate::context::EnvMode::None)
    }

    fn compile(config: &Config, t: &Transform) -> Processor {
        let loader = LutLoader::new();
        Processor::compile_with(&loader, config, &ctx(), t, Direction::Forward).unwrap()
    }

    #[test]
    fn inverse_pair_collapses_to_noop() {
        let config = Config::new();
        let scale = {
            let mut m = MatrixTransform::IDENTITY;
            m[0] = 2.0;
            m[5] = 2.0;
            m[10] = 2.0;
            Transform::matrix(m)
        };
        let group = Transform::group(vec![scale.clone(), scale.inverse()]);
        let p = compile(&config, &group);
        assert!(p.is_noop());
        assert_eq!(p.num_ops(), 0);
    }

    #[test]
    fn noop_apply_still_copies() {
        let config = Config::new();
        let p = compile(&config, &Transform::group(vec![]));
        assert!(p.is_noop());

        let mut buf = vec![0.25f32; 2 * 2 * 3];
        let mut img = PackedImageDesc::new(&mut buf, 2, 2, 3).unwrap();
        p.apply(&mut img).unwrap();
        assert!(buf.iter().all(|&v| (v - 0.25).abs() < EPSILON));
    }

    #[test]
    fn apply_walks_rows() {
        let config = Config::new();
        let mut m = MatrixTransform::IDENTITY;
        m[0] = 2.0;
        let p = compile(&config, &Transform::matrix(m));
        assert!(!p.is_noop());

        let mut buf = vec![0.1f32; 2 * 3 * 4];
        let mut img = PackedImageDesc::new(&mut buf, 3, 2, 4).unwrap();
        p.apply(&mut img).unwrap();
        for px in buf.chunks_exact(4) {
            assert!((px[0] - 0.2).abs() < EPSILON);
            assert!((px[1] - 0.1).abs() < EPSILON);
            assert!((px[3] - 0.1).abs() < EPSILON);
        }
    }

    #[test]
    fn parallel_apply_matches_serial() {
        let config = Config::new();
        let t = Transform::Cdl(CdlTransform {
            slope: [1.1, 0.9, 1.0],
            offset: [0.01; 3],
            power: [1.2; 3],
            saturation: 0.9,
            direction: Direction::Forward,
        });
        let p = compile(&config, &t);

        let width = 16;
        let height = 8;
        let mut serial: Vec<f32> = (0..width * height * 4)
            .map(|i| (i % 97) as f32 / 96.0)
            .collect();
        let mut parallel = serial.clone();

        let mut img = PackedImageDesc::new(&mut serial, width, height, 4).unwrap();
        p.apply(&mut img).unwrap();
        let mut img = PackedImageDesc::new(&mut parallel, width, height, 4).unwrap();
        p.apply_parallel(&mut img).unwrap();

        for (a, b) in serial.iter().zip(&parallel) {
            assert!((a - b).abs() < EPSILON);
        }
    }

    #[test]
    fn shared_exposure_handle_reaches_every_op() {
        let config = Config::new();
        let mut ec = ExposureContrastTransform::neutral(ExposureContrastStyle::Linear);
        ec.dynamic_exposure = true;
        let group = Transform::group(vec![
            Transform::ExposureContrast(ec.clone()),
            Transform::ExposureContrast(ec),
        ]);
        let p = compile(&config, &group);
        assert!(p.is_dynamic());
        assert_eq!(p.num_ops(), 2);

        let handle = p.dynamic_property(DynamicPropertyKind::Exposure).unwrap();
        handle.set_double(1.0).unwrap();

        // Two ops, each one stop: 0.1 * 2 * 2.
        let mut px = [0.1f32, 0.1, 0.1, 1.0];
        p.apply_rgba(&mut px);
        assert!((px[0] - 0.4).abs() < EPSILON, "got {}", px[0]);
    }

    #[test]
    fn missing_dynamic_kind_is_an_error() {
        let config = Config::new();
        let p = compile(&config, &Transform::group(vec![]));
        assert!(p
            .dynamic_property(DynamicPropertyKind::Exposure)
            .is_err());
    }

    #[test]
    fn cache_id_tracks_content() {
        let config = Config::new();
        let a = compile(&config, &Transform::Cdl(CdlTransform {
            offset: [0.1; 3],
            ..CdlTransform::default()
        }));
        let b = compile(&config, &Transform::Cdl(CdlTransform {
            offset: [0.1; 3],
            ..CdlTransform::default()
        }));
        let c = compile(&config, &Transform::Cdl(CdlTransform {
            offset: [0.2; 3],
            ..CdlTransform::default()
        }));
        assert_eq!(a.cache_id(), b.cache_id());
        assert_ne!(a.cache_id(), c.cache_id());
    }

    #[test]
    fn to_transforms_rebuilds_the_same_pixels() {
        let config = Config::new();
        let mut m = MatrixTransform::IDENTITY;
        m[5] = 0.8;
        let group = Transform::group(vec![
            Transform::matrix(m),
            Transform::Cdl(CdlTransform {
                slope: [1.2; 3],
                saturation: 0.8,
                ..CdlTransform::default()
            }),
            Transform::Log(LogTransform {
                base: 2.0,
                direction: Direction::Forward,
            }),
        ]);
        let original = compile(&config, &group);

        let rebuilt = compile(&config, &Transform::group(original.to_transforms()));
        assert_eq!(original.num_ops(), rebuilt.num_ops());

        let mut a = [0.3f32, 0.6, 0.9, 1.0];
        let mut b = a;
        original.apply_rgba(&mut a);
        rebuilt.apply_rgba(&mut b);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < EPSILON);
        }
    }
}
