//! Op-list optimizer.
//!
//! Runs a small set of rewrite passes to a fixed point:
//!
//! 1. no-op elimination
//! 2. promotion of rescaling ranges to matrix + clamp
//! 3. adjacent fusion (matrix pairs, clamp pairs, exponent pairs)
//! 4. cancellation of adjacent inverse pairs, detected by content hash
//! 5. bit-depth propagation, folding depth scales into matrices
//!
//! Dynamic ops are never removed or fused; their parameters can change
//! after optimization. The whole pipeline is idempotent: optimizing an
//! already optimized list changes nothing.

use chroma_core::BitDepth;

use crate::op::{Op, OpKind};
use crate::MatrixOp;
use crate::RangeOp;

/// Upper bound on rewrite iterations; each pass strictly shrinks or
/// canonicalizes, so this is never reached in practice.
const MAX_PASSES: usize = 32;

/// Optimizes an op list.
pub fn optimize(mut ops: Vec<Op>) -> Vec<Op> {
    for _ in 0..MAX_PASSES {
        let mut changed = remove_noops(&mut ops);
        changed |= promote_ranges(&mut ops);
        changed |= fuse_adjacent(&mut ops);
        changed |= cancel_inverse_pairs(&mut ops);
        changed |= propagate_depths(&mut ops);
        if !changed {
            break;
        }
    }
    ops
}

/// Drops ops that provably do nothing. Depth-converting ops are kept
/// until depth propagation has normalized them.
fn remove_noops(ops: &mut Vec<Op>) -> bool {
    let before = ops.len();
    ops.retain(|op| !(op.is_noop() && op.input_depth == op.output_depth));
    ops.len() != before
}

/// Rewrites each rescaling range as an affine matrix followed by a pure
/// clamp, so the affine part can fuse with neighbouring matrices. Ranges
/// with a non-positive scale are left alone.
fn promote_ranges(ops: &mut Vec<Op>) -> bool {
    let mut changed = false;
    let mut out = Vec::with_capacity(ops.len());
    for op in ops.drain(..) {
        let promoted = match &op.kind {
            OpKind::Range(r) if r.scales() => {
                let (scale, offset) = r.as_affine();
                if scale > 0.0 {
                    // scales() guarantees all four bounds are present.
                    let lo = r.min_out.unwrap_or(f64::NEG_INFINITY);
                    let hi = r.max_out.unwrap_or(f64::INFINITY);
                    Some((MatrixOp::from_scale_offset(scale, offset), RangeOp::clamp(lo, hi)))
                } else {
                    None
                }
            }
            _ => None,
        };
        match promoted {
            Some((matrix, clamp)) => {
                changed = true;
                out.push(Op {
                    kind: OpKind::Matrix(matrix),
                    input_depth: op.input_depth,
                    output_depth: op.output_depth,
                });
                out.push(Op {
                    kind: OpKind::Range(clamp),
                    input_depth: op.output_depth,
                    output_depth: op.output_depth,
                });
            }
            None => out.push(op),
        }
    }
    *ops = out;
    changed
}

/// Fuses adjacent ops of the same fusable kind.
fn fuse_adjacent(ops: &mut Vec<Op>) -> bool {
    let mut changed = false;
    let mut out: Vec<Op> = Vec::with_capacity(ops.len());
    for op in ops.drain(..) {
        let fused = match out.last() {
            Some(prev) => fuse_pair(prev, &op),
            None => None,
        };
        match fused {
            Some(kind) => {
                changed = true;
                let input_depth = out.pop().map_or(op.input_depth, |p| p.input_depth);
                out.push(Op {
                    kind,
                    input_depth,
                    output_depth: op.output_depth,
                });
            }
            None => out.push(op),
        }
    }
    *ops = out;
    changed
}

fn fuse_pair(a: &Op, b: &Op) -> Option<OpKind> {
    match (&a.kind, &b.kind) {
        (OpKind::Matrix(m1), OpKind::Matrix(m2)) => Some(OpKind::Matrix(m1.compose(m2))),
        (OpKind::Range(r1), OpKind::Range(r2)) => r1.compose_clamps(r2).map(OpKind::Range),
        (OpKind::Exponent(e1), OpKind::Exponent(e2)) => e1.combine(e2).map(OpKind::Exponent),
        _ => None,
    }
}

/// Removes adjacent pairs where the second op is exactly the inverse of
/// the first, compared by content hash. Dynamic ops never cancel.
fn cancel_inverse_pairs(ops: &mut Vec<Op>) -> bool {
    let mut changed = false;
    let mut out: Vec<Op> = Vec::with_capacity(ops.len());
    for op in ops.drain(..) {
        let cancels = match out.last() {
            Some(prev) if !prev.is_dynamic() && !op.is_dynamic() => prev
                .inverted()
                .map(|inv| inv.content_hash() == op.content_hash())
                .unwrap_or(false),
            _ => false,
        };
        if cancels {
            out.pop();
            changed = true;
        } else {
            out.push(op);
        }
    }
    *ops = out;
    changed
}

/// Aligns each op's input depth with its predecessor's output depth and
/// folds non-float matrix depths into the coefficients, leaving the
/// chain normalized to f32.
fn propagate_depths(ops: &mut Vec<Op>) -> bool {
    let mut changed = false;

    for i in 1..ops.len() {
        let prev_out = ops[i - 1].output_depth;
        if ops[i].input_depth != prev_out {
            ops[i].input_depth = prev_out;
            changed = true;
        }
    }

    for op in ops.iter_mut() {
        if let OpKind::Matrix(m) = &mut op.kind {
            if op.input_depth != BitDepth::F32 {
                m.rescale_input(op.input_depth.max_value(), 1.0);
                op.input_depth = BitDepth::F32;
                changed = true;
            }
            if op.output_depth != BitDepth::F32 {
                m.rescale_output(op.output_depth.max_value(), 1.0);
                op.output_depth = BitDepth::F32;
                changed = true;
            }
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposure_contrast::{ExposureContrastOp, ExposureContrastStyle};
    use crate::log::{LogOp, LogStyle};
    use crate::{ExponentOp, NegativeStyle};

    fn hashes(ops: &[Op]) -> Vec<u64> {
        ops.iter().map(Op::content_hash).collect()
    }

    #[test]
    fn scale_pair_collapses_to_nothing() {
        let ops = vec![
            Op::new(OpKind::Matrix(MatrixOp::from_scale_offset(2.0, 0.0))),
            Op::new(OpKind::Matrix(MatrixOp::from_scale_offset(0.5, 0.0))),
        ];
        let out = optimize(ops);
        assert!(out.is_empty(), "got {} ops", out.len());
    }

    #[test]
    fn clamps_fuse_to_intersection() {
        let ops = vec![
            Op::new(OpKind::Range(RangeOp::clamp(0.0, 1.0))),
            Op::new(OpKind::Range(RangeOp::clamp(0.25, 2.0))),
        ];
        let out = optimize(ops);
        assert_eq!(out.len(), 1);
        match &out[0].kind {
            OpKind::Range(r) => {
                assert_eq!(r.min_out, Some(0.25));
                assert_eq!(r.max_out, Some(1.0));
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn exponent_pair_reduces_to_identity() {
        let ops = vec![
            Op::new(OpKind::Exponent(
                ExponentOp::new([2.2, 2.2, 2.2, 1.0], NegativeStyle::Clamp).unwrap(),
            )),
            Op::new(OpKind::Exponent(
                ExponentOp::new([1.0 / 2.2, 1.0 / 2.2, 1.0 / 2.2, 1.0], NegativeStyle::Clamp)
                    .unwrap(),
            )),
        ];
        let out = optimize(ops);
        assert!(out.is_empty());
    }

    #[test]
    fn log_inverse_pair_cancels() {
        let ops = vec![
            Op::new(OpKind::Log(LogOp::basic(LogStyle::Log10).unwrap())),
            Op::new(OpKind::Log(LogOp::basic(LogStyle::AntiLog10).unwrap())),
        ];
        let out = optimize(ops);
        assert!(out.is_empty());
    }

    #[test]
    fn scaling_range_promotes_and_fuses() {
        let ops = vec![
            Op::new(OpKind::Range(
                RangeOp::new(Some(0.0), Some(1.0), Some(0.0), Some(2.0)).unwrap(),
            )),
            Op::new(OpKind::Matrix(MatrixOp::from_scale_offset(0.5, 0.0))),
        ];
        let out = optimize(ops);
        // Promotion splits the range into matrix + clamp; the trailing
        // matrix stays separate because the clamp sits between them.
        assert_eq!(out.len(), 3, "got {:?}", out);
        assert!(matches!(out[0].kind, OpKind::Matrix(_)));
        assert!(matches!(out[1].kind, OpKind::Range(_)));
        assert!(matches!(out[2].kind, OpKind::Matrix(_)));

        let mut px = [0.5f32, 1.5, -0.5, 1.0];
        for op in &out {
            op.apply_rgba(&mut px);
        }
        // Net effect: scale by 2, clamp to [0, 2], scale by 0.5.
        assert!((px[0] - 0.5).abs() < 1e-6);
        assert!((px[1] - 1.0).abs() < 1e-6);
        assert!((px[2] - 0.0).abs() < 1e-6);
    }

    #[test]
    fn dynamic_identity_survives() {
        let mut ec =
            ExposureContrastOp::new(ExposureContrastStyle::Linear, 0.0, 1.0, 1.0, 0.18, true);
        ec.make_exposure_dynamic();
        let ops = vec![Op::new(OpKind::ExposureContrast(ec))];
        let out = optimize(ops);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn static_identity_exposure_is_removed() {
        let ec = ExposureContrastOp::new(ExposureContrastStyle::Linear, 0.0, 1.0, 1.0, 0.18, true);
        let out = optimize(vec![Op::new(OpKind::ExposureContrast(ec))]);
        assert!(out.is_empty());
    }

    #[test]
    fn depth_scale_folds_into_matrix() {
        let mut op = Op::new(OpKind::Matrix(MatrixOp::identity()));
        op.input_depth = BitDepth::UInt8;
        let out = optimize(vec![op]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].input_depth, BitDepth::F32);
        match &out[0].kind {
            OpKind::Matrix(m) => {
                let rows = m.rows();
                assert!((rows[0] - 255.0).abs() < 1e-9);
            }
            other => panic!("expected matrix, got {other:?}"),
        }
    }

    #[test]
    fn optimize_is_idempotent() {
        let ops = vec![
            Op::new(OpKind::Range(
                RangeOp::new(Some(0.0), Some(1.0), Some(0.1), Some(1.9)).unwrap(),
            )),
            Op::new(OpKind::Matrix(MatrixOp::from_diagonal([1.2, 1.0, 0.8, 1.0]))),
            Op::new(OpKind::Exponent(
                ExponentOp::new([2.4, 2.4, 2.4, 1.0], NegativeStyle::Clamp).unwrap(),
            )),
            Op::new(OpKind::Range(RangeOp::clamp(0.0, 1.0))),
        ];
        let once = optimize(ops);
        let twice = optimize(once.clone());
        assert_eq!(hashes(&once), hashes(&twice));
    }
}
