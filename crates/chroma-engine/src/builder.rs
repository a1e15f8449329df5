//! Transform lowering: declarative nodes to the op list.
//!
//! Recursive descent over the transform tree. Direction is baked here:
//! every op comes out direction-free, inverses are materialized (inverted
//! matrices, reversed groups, swapped conversion endpoints) and the
//! failure cases (singular matrix, non-monotone LUT, unknown name)
//! surface as compile errors.

use chroma_lut::{Lut1D, Lut3D};
use chroma_ops as ops;
use chroma_ops::{Op, OpKind};

use crate::config::Config;
use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::loader::{FileStamp, LutLoader};
use crate::look::parse_looks;
use crate::transform::*;

/// Lowers a transform tree into ops, recording touched LUT files.
pub(crate) fn build(
    config: &Config,
    context: &Context,
    loader: &LutLoader,
    transform: &Transform,
    direction: Direction,
    files: &mut Vec<FileStamp>,
) -> EngineResult<Vec<Op>> {
    let mut out = Vec::new();
    build_into(config, context, loader, transform, direction, files, &mut out)?;
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn build_into(
    config: &Config,
    context: &Context,
    loader: &LutLoader,
    transform: &Transform,
    outer: Direction,
    files: &mut Vec<FileStamp>,
    out: &mut Vec<Op>,
) -> EngineResult<()> {
    let dir = transform.direction().combine(outer);
    match transform {
        Transform::Group(g) => {
            if dir.is_forward() {
                for t in &g.transforms {
                    build_into(config, context, loader, t, Direction::Forward, files, out)?;
                }
            } else {
                for t in g.transforms.iter().rev() {
                    build_into(config, context, loader, t, Direction::Inverse, files, out)?;
                }
            }
        }

        Transform::Matrix(t) => {
            let m = ops::MatrixOp::from_rows(t.matrix, t.offset);
            let m = if dir.is_forward() { m } else { m.inverted()? };
            out.push(Op::new(OpKind::Matrix(m)));
        }

        Transform::Exponent(t) => {
            let e = ops::ExponentOp::new(t.value, negative_style(t.negative_style))?;
            let e = if dir.is_forward() { e } else { e.inverted()? };
            out.push(Op::new(OpKind::Exponent(e)));
        }

        Transform::ExponentWithLinear(t) => {
            let e = ops::ExponentWithLinearOp::new(t.gamma, t.offset, dir.is_forward())?;
            out.push(Op::new(OpKind::ExponentWithLinear(e)));
        }

        Transform::Log(t) => {
            out.push(Op::new(OpKind::Log(log_op(t.base, dir)?)));
        }

        Transform::LogAffine(t) => {
            let camera = t.params.iter().any(|p| p.lin_side_break.is_some());
            let style = match (camera, dir.is_forward()) {
                (false, true) => ops::LogStyle::LinToLog,
                (false, false) => ops::LogStyle::LogToLin,
                (true, true) => ops::LogStyle::CameraLinToLog,
                (true, false) => ops::LogStyle::CameraLogToLin,
            };
            let params = t.params.map(|p| ops::LogParams {
                log_side_slope: p.log_side_slope,
                log_side_offset: p.log_side_offset,
                lin_side_slope: p.lin_side_slope,
                lin_side_offset: p.lin_side_offset,
                lin_side_break: p.lin_side_break,
                linear_slope: p.linear_slope,
            });
            out.push(Op::new(OpKind::Log(ops::LogOp::new(style, t.base, params)?)));
        }

        Transform::Range(t) => {
            let r = ops::RangeOp::new(t.min_in, t.max_in, t.min_out, t.max_out)?;
            let r = if dir.is_forward() { r } else { r.inverted() };
            out.push(Op::new(OpKind::Range(r)));
        }

        Transform::Cdl(t) => {
            let c = ops::CdlOp::with_luma(
                t.slope,
                t.offset,
                t.power,
                t.saturation,
                config.luma(),
                dir.is_forward(),
            )?;
            out.push(Op::new(OpKind::Cdl(c)));
        }

        Transform::Allocation(t) => build_allocation(t, dir, out)?,

        Transform::FixedFunction(t) => {
            let style = fixed_function_style(t)?;
            let f = ops::FixedFunctionOp::new(style, dir.is_forward())?;
            out.push(Op::new(OpKind::FixedFunction(f)));
        }

        Transform::ExposureContrast(t) => {
            let style = match t.style {
                ExposureContrastStyle::Linear => ops::ExposureContrastStyle::Linear,
                ExposureContrastStyle::Video => ops::ExposureContrastStyle::Video,
                ExposureContrastStyle::Logarithmic => ops::ExposureContrastStyle::Logarithmic,
            };
            let mut ec = ops::ExposureContrastOp::new(
                style,
                t.exposure,
                t.contrast,
                t.gamma,
                t.pivot,
                dir.is_forward(),
            );
            if t.dynamic_exposure {
                ec.make_exposure_dynamic();
            }
            if t.dynamic_contrast {
                ec.make_contrast_dynamic();
            }
            if t.dynamic_gamma {
                ec.make_gamma_dynamic();
            }
            out.push(Op::new(OpKind::ExposureContrast(ec)));
        }

        Transform::GradingPrimary(t) => {
            let mut g = ops::GradingPrimaryOp::new(grading_primary(t), dir.is_forward());
            if t.dynamic {
                g.make_dynamic();
            }
            out.push(Op::new(OpKind::GradingPrimary(g)));
        }

        Transform::GradingRgbCurve(t) => {
            let curves = ops::GradingRgbCurves {
                curves: [
                    curve_from_points(&t.red)?,
                    curve_from_points(&t.green)?,
                    curve_from_points(&t.blue)?,
                    curve_from_points(&t.master)?,
                ],
            };
            let mut c =
                ops::GradingRgbCurveOp::new(curves, grade_style(t.style), dir.is_forward())?;
            if t.dynamic {
                c.make_dynamic();
            }
            out.push(Op::new(OpKind::GradingRgbCurve(c)));
        }

        Transform::File(t) => {
            let name = t.src.to_string_lossy();
            let path = context.resolve_file(&name, config.search_path(), config.working_dir())?;
            let (ops, stamp) = loader.load(&path, t.interpolation)?;
            files.push(stamp);
            if dir.is_forward() {
                out.extend(ops);
            } else {
                for op in ops.into_iter().rev() {
                    out.push(op.inverted()?);
                }
            }
        }

        Transform::Lut1D(t) => {
            let lut = match (&t.g, &t.b) {
                (Some(g), Some(b)) => {
                    Lut1D::from_rgb(t.r.clone(), g.clone(), b.clone(), t.domain_min, t.domain_max)?
                }
                _ => Lut1D::from_data(t.r.clone(), t.domain_min, t.domain_max)?,
            };
            let op = ops::Lut1DOp::new(lut, t.interpolation, dir.is_forward())?;
            out.push(Op::new(OpKind::Lut1D(op)));
        }

        Transform::Lut3D(t) => {
            let lut = Lut3D::from_data(t.data.clone(), t.size)?;
            if dir.is_forward() {
                out.push(Op::new(OpKind::Lut3D(ops::Lut3DOp::new(lut, t.interpolation))));
            } else {
                out.push(Op::new(OpKind::InvLut3D(ops::InvLut3DOp::new(lut))));
            }
        }

        Transform::ColorSpace(t) => {
            let (src, dst) = if dir.is_forward() {
                (t.src.as_str(), t.dst.as_str())
            } else {
                (t.dst.as_str(), t.src.as_str())
            };
            build_conversion(config, context, loader, src, dst, files, out)?;
        }

        Transform::Look(t) => {
            let (src, dst) = if dir.is_forward() {
                (t.src.as_str(), t.dst.as_str())
            } else {
                (t.dst.as_str(), t.src.as_str())
            };
            build_look_chain(config, context, loader, src, dst, &t.looks, dir, files, out)?;
        }

        Transform::DisplayView(t) => {
            let view = config.view(&t.display, &t.view)?;
            let view_space = view.colorspace().to_string();
            let looks = view.looks().unwrap_or("").to_string();
            let (src, dst) = if dir.is_forward() {
                (t.src.as_str(), view_space.as_str())
            } else {
                (view_space.as_str(), t.src.as_str())
            };
            build_look_chain(config, context, loader, src, dst, &looks, dir, files, out)?;
        }
    }
    Ok(())
}

/// Ops converting `src` into `dst` through the reference space.
#[allow(clippy::too_many_arguments)]
fn build_conversion(
    config: &Config,
    context: &Context,
    loader: &LutLoader,
    src: &str,
    dst: &str,
    files: &mut Vec<FileStamp>,
    out: &mut Vec<Op>,
) -> EngineResult<()> {
    let src = config.resolve_colorspace(src)?;
    let dst = config.resolve_colorspace(dst)?;

    // Data spaces and conversions within an equality group are identities.
    if src.is_data() || dst.is_data() {
        return Ok(());
    }
    if std::ptr::eq(src, dst) {
        return Ok(());
    }
    let (sg, dg) = (src.equality_group(), dst.equality_group());
    if !sg.is_empty() && sg.eq_ignore_ascii_case(dg) {
        return Ok(());
    }

    match (src.to_reference(), src.from_reference()) {
        (Some(t), _) => build_into(config, context, loader, t, Direction::Forward, files, out)?,
        (None, Some(t)) => build_into(config, context, loader, t, Direction::Inverse, files, out)?,
        (None, None) => {}
    }
    match (dst.from_reference(), dst.to_reference()) {
        (Some(t), _) => build_into(config, context, loader, t, Direction::Forward, files, out)?,
        (None, Some(t)) => build_into(config, context, loader, t, Direction::Inverse, files, out)?,
        (None, None) => {}
    }
    Ok(())
}

/// Ops for `src -> looks -> dst`, each look spliced at its process space.
///
/// `dir` inverse runs the chain backward: looks in reverse order, each
/// with its direction flipped.
#[allow(clippy::too_many_arguments)]
fn build_look_chain(
    config: &Config,
    context: &Context,
    loader: &LutLoader,
    src: &str,
    dst: &str,
    tokens: &str,
    dir: Direction,
    files: &mut Vec<FileStamp>,
    out: &mut Vec<Op>,
) -> EngineResult<()> {
    let mut looks = parse_looks(tokens);
    if !dir.is_forward() {
        looks.reverse();
        for (_, d) in looks.iter_mut() {
            *d = d.inverse();
        }
    }

    let mut current = src.to_string();
    for (name, look_dir) in looks {
        let look = config.look(name)?;
        let process = look.process_space().to_string();
        build_conversion(config, context, loader, &current, &process, files, out)?;

        match look_dir {
            Direction::Forward => {
                if let Some(t) = look.transform() {
                    build_into(config, context, loader, t, Direction::Forward, files, out)?;
                }
            }
            Direction::Inverse => match (look.inverse_transform(), look.transform()) {
                (Some(t), _) => {
                    build_into(config, context, loader, t, Direction::Forward, files, out)?;
                }
                (None, Some(t)) => {
                    build_into(config, context, loader, t, Direction::Inverse, files, out)?;
                }
                (None, None) => {}
            },
        }
        current = process;
    }

    build_conversion(config, context, loader, &current, dst, files, out)
}

fn negative_style(style: NegativeStyle) -> ops::NegativeStyle {
    match style {
        NegativeStyle::Clamp => ops::NegativeStyle::Clamp,
        NegativeStyle::Mirror => ops::NegativeStyle::Mirror,
        NegativeStyle::PassThru => ops::NegativeStyle::PassThru,
    }
}

fn grade_style(style: GradeStyle) -> ops::GradingStyle {
    match style {
        GradeStyle::Log => ops::GradingStyle::Log,
        GradeStyle::Linear => ops::GradingStyle::Linear,
        GradeStyle::Video => ops::GradingStyle::Video,
    }
}

fn log_op(base: f64, dir: Direction) -> EngineResult<ops::LogOp> {
    let style = if (base - 2.0).abs() < 1e-9 {
        ops::LogStyle::Log2
    } else if (base - 10.0).abs() < 1e-9 {
        ops::LogStyle::Log10
    } else {
        let style = if dir.is_forward() {
            ops::LogStyle::LinToLog
        } else {
            ops::LogStyle::LogToLin
        };
        return Ok(ops::LogOp::new(style, base, [ops::LogParams::default(); 3])?);
    };
    let style = if dir.is_forward() { style } else { style.inverse() };
    Ok(ops::LogOp::basic(style)?)
}

fn build_allocation(t: &AllocationTransform, dir: Direction, out: &mut Vec<Op>) -> EngineResult<()> {
    let vars = &t.vars;
    let needs = match t.allocation {
        Allocation::Uniform => 2..=2,
        Allocation::Lg2 => 2..=3,
    };
    if !needs.contains(&vars.len()) {
        return Err(EngineError::Invalid(format!(
            "allocation expects {:?} vars, got {}",
            needs,
            vars.len()
        )));
    }
    let (min, max) = (vars[0], vars[1]);
    if !(max > min) {
        return Err(EngineError::Invalid(format!(
            "allocation span is empty: [{min}, {max}]"
        )));
    }
    let scale = 1.0 / (max - min);
    let affine = ops::MatrixOp::from_scale_offset(scale, -min * scale);

    match t.allocation {
        Allocation::Uniform => {
            let m = if dir.is_forward() { affine } else { affine.inverted()? };
            out.push(Op::new(OpKind::Matrix(m)));
        }
        Allocation::Lg2 => {
            let offset = vars.get(2).copied().unwrap_or(0.0);
            if dir.is_forward() {
                if offset != 0.0 {
                    out.push(Op::new(OpKind::Matrix(ops::MatrixOp::from_scale_offset(
                        1.0, offset,
                    ))));
                }
                out.push(Op::new(OpKind::Log(ops::LogOp::basic(ops::LogStyle::Log2)?)));
                out.push(Op::new(OpKind::Matrix(affine)));
            } else {
                out.push(Op::new(OpKind::Matrix(affine.inverted()?)));
                out.push(Op::new(OpKind::Log(ops::LogOp::basic(
                    ops::LogStyle::AntiLog2,
                )?)));
                if offset != 0.0 {
                    out.push(Op::new(OpKind::Matrix(ops::MatrixOp::from_scale_offset(
                        1.0, -offset,
                    ))));
                }
            }
        }
    }
    Ok(())
}

fn fixed_function_style(t: &FixedFunctionTransform) -> EngineResult<ops::FixedFunctionStyle> {
    let expect = |n: usize| -> EngineResult<()> {
        if t.params.len() != n {
            return Err(EngineError::Invalid(format!(
                "fixed function {:?} expects {n} params, got {}",
                t.style,
                t.params.len()
            )));
        }
        Ok(())
    };
    let style = match t.style {
        FixedFunctionStyle::AcesRedMod03 => {
            expect(0)?;
            ops::FixedFunctionStyle::AcesRedMod03
        }
        FixedFunctionStyle::AcesRedMod10 => {
            expect(0)?;
            ops::FixedFunctionStyle::AcesRedMod10
        }
        FixedFunctionStyle::AcesGlow03 => {
            expect(0)?;
            ops::FixedFunctionStyle::AcesGlow03
        }
        FixedFunctionStyle::AcesGlow10 => {
            expect(0)?;
            ops::FixedFunctionStyle::AcesGlow10
        }
        FixedFunctionStyle::AcesDarkToDim10 => {
            expect(0)?;
            ops::FixedFunctionStyle::AcesDarkToDim10
        }
        FixedFunctionStyle::AcesGamutComp13 => {
            let p = if t.params.is_empty() {
                ops::GamutCompParams::aces_default()
            } else {
                expect(7)?;
                ops::GamutCompParams::new(
                    t.params[0] as f32,
                    t.params[1] as f32,
                    t.params[2] as f32,
                    t.params[3] as f32,
                    t.params[4] as f32,
                    t.params[5] as f32,
                    t.params[6] as f32,
                )?
            };
            ops::FixedFunctionStyle::GamutComp13(p)
        }
        FixedFunctionStyle::Rec2100Surround => {
            expect(1)?;
            ops::FixedFunctionStyle::Rec2100Surround {
                gamma: t.params[0] as f32,
            }
        }
        FixedFunctionStyle::RgbToHsv => {
            expect(0)?;
            ops::FixedFunctionStyle::RgbToHsv
        }
        FixedFunctionStyle::XyzToXyy => {
            expect(0)?;
            ops::FixedFunctionStyle::XyzToXyy
        }
        FixedFunctionStyle::XyzToUvy => {
            expect(0)?;
            ops::FixedFunctionStyle::XyzToUvy
        }
        FixedFunctionStyle::XyzToLuv => {
            expect(0)?;
            ops::FixedFunctionStyle::XyzToLuv
        }
        FixedFunctionStyle::LinToPq => {
            expect(0)?;
            ops::FixedFunctionStyle::LinToPq
        }
        FixedFunctionStyle::LinToDoubleLog => {
            expect(13)?;
            let p = &t.params;
            ops::FixedFunctionStyle::LinToDoubleLog(ops::DoubleLogParams::new(
                p[0] as f32,
                p[1] as f32,
                p[2] as f32,
                p[3] as f32,
                p[4] as f32,
                p[5] as f32,
                p[6] as f32,
                p[7] as f32,
                p[8] as f32,
                p[9] as f32,
                p[10] as f32,
                p[11] as f32,
                p[12] as f32,
            )?)
        }
    };
    Ok(style)
}

fn rgbm(v: Rgbm) -> ops::GradingRgbm {
    ops::GradingRgbm {
        red: v.r as f32,
        green: v.g as f32,
        blue: v.b as f32,
        master: v.master as f32,
    }
}

fn grading_primary(t: &GradingPrimaryTransform) -> ops::GradingPrimary {
    let mut value = ops::GradingPrimary::identity(grade_style(t.style));
    value.brightness = rgbm(t.brightness);
    value.contrast = rgbm(t.contrast);
    value.gamma = rgbm(t.gamma);
    value.offset = rgbm(t.offset);
    value.exposure = rgbm(t.exposure);
    value.lift = rgbm(t.lift);
    value.gain = rgbm(t.gain);
    value.saturation = t.saturation as f32;
    value.pivot = t.pivot as f32;
    value.pivot_black = t.pivot_black as f32;
    value.pivot_white = t.pivot_white as f32;
    value.clamp_black = t.clamp_black.map_or(f32::NEG_INFINITY, |v| v as f32);
    value.clamp_white = t.clamp_white.map_or(f32::INFINITY, |v| v as f32);
    value
}

fn curve_from_points(points: &[[f64; 2]]) -> EngineResult<ops::BSplineCurve> {
    let pts = points
        .iter()
        .map(|p| ops::ControlPoint::new(p[0] as f32, p[1] as f32))
        .collect();
    Ok(ops::BSplineCurve::from_points(pts)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chroma_lut::Interpolation;

    use crate::colorspace::ColorSpace;
    use crate::context::EnvMode;
    use crate::display::{Display, View};
    use crate::look::Look;

    const EPSILON: f32 = 1e-5;

    fn ctx() -> Context {
        Context::new(EnvMode::None)
    }

    fn apply_all(ops: &[Op], mut px: [f32; 4]) -> [f32; 4] {
        for op in ops {
            op.apply_rgba(&mut px);
        }
        px
    }

    fn lin_log_config() -> Config {
        let mut config = Config::new();
        config.add_colorspace(ColorSpace::new("ref"));
        config.add_colorspace(ColorSpace::new("log").with_to_reference(Transform::Log(
            LogTransform {
                base: 10.0,
                direction: Direction::Inverse,
            },
        )));
        config
    }

    #[test]
    fn group_inverse_reverses_members() {
        let config = Config::new();
        let loader = LutLoader::new();
        let t = Transform::group(vec![
            Transform::matrix({
                let mut m = MatrixTransform::IDENTITY;
                m[0] = 2.0;
                m
            }),
            Transform::Cdl(CdlTransform {
                offset: [0.1; 3],
                ..CdlTransform::default()
            }),
        ]);
        let mut files = Vec::new();
        let ops = build(&config, &ctx(), &loader, &t, Direction::Inverse, &mut files).unwrap();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0].kind, OpKind::Cdl(_)));
        assert!(matches!(ops[1].kind, OpKind::Matrix(_)));

        // Round trip through the forward build.
        let fwd = build(&config, &ctx(), &loader, &t, Direction::Forward, &mut files).unwrap();
        let px = apply_all(&ops, apply_all(&fwd, [0.25, 0.5, 0.75, 1.0]));
        assert!((px[0] - 0.25).abs() < EPSILON);
        assert!((px[1] - 0.5).abs() < EPSILON);
    }

    #[test]
    fn colorspace_conversion_through_reference() {
        let config = lin_log_config();
        let loader = LutLoader::new();
        let t = Transform::colorspace("log", "ref");
        let mut files = Vec::new();
        let ops = build(&config, &ctx(), &loader, &t, Direction::Forward, &mut files).unwrap();
        // log's to_reference is an inverse-direction Log10, i.e. antilog.
        let px = apply_all(&ops, [2.0, 0.0, -1.0, 1.0]);
        assert!((px[0] - 100.0).abs() < 1e-2);
        assert!((px[1] - 1.0).abs() < EPSILON);
        assert!((px[2] - 0.1).abs() < EPSILON);
    }

    #[test]
    fn equality_group_short_circuits() {
        let mut config = Config::new();
        config.add_colorspace(
            ColorSpace::new("a")
                .with_equality_group("g")
                .with_to_reference(Transform::matrix(MatrixTransform::IDENTITY)),
        );
        config.add_colorspace(
            ColorSpace::new("b")
                .with_equality_group("G")
                .with_to_reference(Transform::Log(LogTransform {
                    base: 10.0,
                    direction: Direction::Forward,
                })),
        );
        let loader = LutLoader::new();
        let mut files = Vec::new();
        let ops = build(
            &config,
            &ctx(),
            &loader,
            &Transform::colorspace("a", "b"),
            Direction::Forward,
            &mut files,
        )
        .unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn data_space_is_identity() {
        let mut config = lin_log_config();
        config.add_colorspace(ColorSpace::new("raw").with_data_flag(true));
        let loader = LutLoader::new();
        let mut files = Vec::new();
        let ops = build(
            &config,
            &ctx(),
            &loader,
            &Transform::colorspace("raw", "log"),
            Direction::Forward,
            &mut files,
        )
        .unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn look_splices_at_process_space() {
        let mut config = lin_log_config();
        config.add_look(Look::new("grade", "log").with_transform(Transform::Cdl(
            CdlTransform {
                offset: [0.1; 3],
                ..CdlTransform::default()
            },
        )));
        let loader = LutLoader::new();
        let mut files = Vec::new();
        let t = Transform::Look(LookTransform {
            src: "ref".into(),
            dst: "ref".into(),
            looks: "grade".into(),
            direction: Direction::Forward,
        });
        let ops = build(&config, &ctx(), &loader, &t, Direction::Forward, &mut files).unwrap();
        // ref -> log (log10), CDL, log -> ref (antilog).
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0].kind, OpKind::Log(_)));
        assert!(matches!(ops[1].kind, OpKind::Cdl(_)));
        assert!(matches!(ops[2].kind, OpKind::Log(_)));
    }

    #[test]
    fn inverse_look_without_dedicated_inverse() {
        let mut config = lin_log_config();
        config.add_look(Look::new("grade", "ref").with_transform(Transform::Cdl(
            CdlTransform {
                slope: [2.0; 3],
                ..CdlTransform::default()
            },
        )));
        let loader = LutLoader::new();
        let t = Transform::Look(LookTransform {
            src: "ref".into(),
            dst: "ref".into(),
            looks: "grade".into(),
            direction: Direction::Forward,
        });
        let mut files = Vec::new();
        let fwd = build(&config, &ctx(), &loader, &t, Direction::Forward, &mut files).unwrap();
        let rev = build(&config, &ctx(), &loader, &t, Direction::Inverse, &mut files).unwrap();
        let px = apply_all(&rev, apply_all(&fwd, [0.25, 0.5, 0.1, 1.0]));
        assert!((px[0] - 0.25).abs() < EPSILON);
        assert!((px[1] - 0.5).abs() < EPSILON);
    }

    #[test]
    fn display_view_expands_view_space_and_looks() {
        let mut config = lin_log_config();
        config.add_look(Look::new("grade", "log").with_transform(Transform::Cdl(
            CdlTransform {
                offset: [0.05; 3],
                ..CdlTransform::default()
            },
        )));
        let mut d = Display::new("main");
        d.add_view(View::new("graded", "log").with_looks("grade"));
        config.add_display(d);

        let loader = LutLoader::new();
        let t = Transform::DisplayView(DisplayViewTransform {
            src: "ref".into(),
            display: "main".into(),
            view: "graded".into(),
            direction: Direction::Forward,
        });
        let mut files = Vec::new();
        let ops = build(&config, &ctx(), &loader, &t, Direction::Forward, &mut files).unwrap();
        // ref -> log (for the look), CDL, then log == view space: done.
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[1].kind, OpKind::Cdl(_)));
    }

    #[test]
    fn allocation_lg2_round_trips() {
        let loader = LutLoader::new();
        let config = Config::new();
        let t = Transform::Allocation(AllocationTransform {
            allocation: Allocation::Lg2,
            vars: vec![-8.0, 5.0, 0.00390625],
            direction: Direction::Forward,
        });
        let mut files = Vec::new();
        let fwd = build(&config, &ctx(), &loader, &t, Direction::Forward, &mut files).unwrap();
        let rev = build(&config, &ctx(), &loader, &t, Direction::Inverse, &mut files).unwrap();
        let px = apply_all(&rev, apply_all(&fwd, [0.18, 1.0, 0.02, 1.0]));
        assert!((px[0] - 0.18).abs() < 1e-4);
        assert!((px[1] - 1.0).abs() < 1e-4);
        assert!((px[2] - 0.02).abs() < 1e-4);
    }

    #[test]
    fn singular_matrix_fails_at_compile() {
        let loader = LutLoader::new();
        let config = Config::new();
        let t = Transform::matrix([0.0; 16]).inverse();
        let mut files = Vec::new();
        let err = build(&config, &ctx(), &loader, &t, Direction::Forward, &mut files);
        assert!(matches!(err, Err(EngineError::Singular { .. })));
    }

    #[test]
    fn inline_lut3d_inverse_uses_solver() {
        let loader = LutLoader::new();
        let config = Config::new();
        let cube = Lut3D::identity(5);
        let t = Transform::Lut3D(Lut3DTransform {
            size: 5,
            data: cube.data,
            interpolation: Interpolation::Tetrahedral,
            direction: Direction::Inverse,
        });
        let mut files = Vec::new();
        let ops = build(&config, &ctx(), &loader, &t, Direction::Forward, &mut files).unwrap();
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0].kind, OpKind::InvLut3D(_)));
    }
}
