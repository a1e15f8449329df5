//! LUT ops: thin direction-aware wrappers over the `chroma-lut` arrays.
//!
//! Direction is baked at construction. A reversed 1D LUT inverts its
//! table up front (failing on non-monotone channels) and a reversed 3D
//! LUT becomes an [`InvLut3DOp`], so apply never branches on direction.

use chroma_lut::{Interpolation, InvLut3D, Lut1D, Lut3D};

use crate::OpResult;

/// 1D LUT op.
#[derive(Debug, Clone)]
pub struct Lut1DOp {
    lut: Lut1D,
    interp: Interpolation,
}

impl Lut1DOp {
    /// Wraps a table. `forward: false` bakes the inverse table, which
    /// requires monotone channels.
    pub fn new(lut: Lut1D, interp: Interpolation, forward: bool) -> OpResult<Self> {
        let lut = if forward { lut } else { lut.invert()? };
        Ok(Self { lut, interp })
    }

    /// The baked table.
    pub fn lut(&self) -> &Lut1D {
        &self.lut
    }

    /// Lookup interpolation.
    pub fn interp(&self) -> Interpolation {
        self.interp
    }

    /// The op evaluating the inverse table.
    pub fn inverted(&self) -> OpResult<Lut1DOp> {
        Ok(Lut1DOp {
            lut: self.lut.invert()?,
            interp: self.interp,
        })
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        let interp = self.interp.concrete_1d();
        for px in pixels.chunks_exact_mut(4) {
            let out = self.lut.eval_rgb([px[0], px[1], px[2]], interp);
            px[0] = out[0];
            px[1] = out[1];
            px[2] = out[2];
            // Alpha unchanged
        }
    }
}

/// 3D LUT op.
#[derive(Debug, Clone)]
pub struct Lut3DOp {
    lut: Lut3D,
    interp: Interpolation,
}

impl Lut3DOp {
    /// Wraps a cube.
    pub fn new(lut: Lut3D, interp: Interpolation) -> Self {
        Self { lut, interp }
    }

    /// The cube.
    pub fn lut(&self) -> &Lut3D {
        &self.lut
    }

    /// Lookup interpolation.
    pub fn interp(&self) -> Interpolation {
        self.interp
    }

    /// The exact-inverse op for this cube.
    pub fn inverted(&self) -> InvLut3DOp {
        InvLut3DOp::new(self.lut.clone())
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        let interp = self.interp.concrete_3d();
        for px in pixels.chunks_exact_mut(4) {
            let out = self.lut.apply([px[0], px[1], px[2]], interp);
            px[0] = out[0];
            px[1] = out[1];
            px[2] = out[2];
            // Alpha unchanged
        }
    }
}

/// Exact inverse of a 3D LUT.
///
/// Keeps the forward cube alongside the solver so the op can be flipped
/// back without a round trip through the solver's extrapolated grid.
#[derive(Debug, Clone)]
pub struct InvLut3DOp {
    forward: Lut3D,
    solver: InvLut3D,
}

impl InvLut3DOp {
    /// Builds the inverse solver for a forward cube.
    pub fn new(forward: Lut3D) -> Self {
        let solver = InvLut3D::new(&forward);
        Self { forward, solver }
    }

    /// The forward cube this op inverts.
    pub fn forward_lut(&self) -> &Lut3D {
        &self.forward
    }

    /// The op evaluating the forward cube again.
    pub fn inverted(&self, interp: Interpolation) -> Lut3DOp {
        Lut3DOp::new(self.forward.clone(), interp)
    }

    /// Applies to an RGBA-interleaved buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        for px in pixels.chunks_exact_mut(4) {
            let out = self.solver.apply([px[0], px[1], px[2]]);
            px[0] = out[0];
            px[1] = out[1];
            px[2] = out[2];
            // Alpha unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn identity_1d_passes_through() {
        let op = Lut1DOp::new(Lut1D::identity(17), Interpolation::Linear, true).unwrap();
        let mut px = [0.25f32, 0.5, 0.75, 0.9];
        op.apply_rgba(&mut px);
        assert!((px[0] - 0.25).abs() < EPSILON);
        assert!((px[1] - 0.5).abs() < EPSILON);
        assert!((px[3] - 0.9).abs() < EPSILON);
    }

    #[test]
    fn reversed_1d_bakes_the_inverse() {
        let lut = Lut1D::gamma(1024, 2.2);
        let fwd = Lut1DOp::new(lut.clone(), Interpolation::Linear, true).unwrap();
        let rev = Lut1DOp::new(lut, Interpolation::Linear, false).unwrap();
        let mut px = [0.5f32, 0.2, 0.8, 1.0];
        fwd.apply_rgba(&mut px);
        rev.apply_rgba(&mut px);
        assert!((px[0] - 0.5).abs() < 1e-3);
        assert!((px[1] - 0.2).abs() < 1e-3);
    }

    #[test]
    fn non_monotone_1d_cannot_reverse() {
        let data = vec![0.0f32, 1.0, 0.5, 0.8];
        let lut = Lut1D::from_data(data, 0.0, 1.0).unwrap();
        assert!(Lut1DOp::new(lut, Interpolation::Linear, false).is_err());
    }

    #[test]
    fn identity_3d_passes_through() {
        let op = Lut3DOp::new(Lut3D::identity(9), Interpolation::Tetrahedral);
        let mut px = [0.3f32, 0.6, 0.1, 1.0];
        op.apply_rgba(&mut px);
        assert!((px[0] - 0.3).abs() < EPSILON);
        assert!((px[1] - 0.6).abs() < EPSILON);
        assert!((px[2] - 0.1).abs() < EPSILON);
    }

    #[test]
    fn inv_3d_round_trips() {
        // Non-trivial cube: a mild gamma per channel.
        let size = 9;
        let mut lut = Lut3D::identity(size);
        for i in 0..size * size * size {
            let v = lut.data[i];
            lut.data[i] = [v[0].powf(1.2), v[1].powf(1.1), v[2].powf(0.9)];
        }
        let fwd = Lut3DOp::new(lut, Interpolation::Tetrahedral);
        let inv = fwd.inverted();

        let mut px = [0.4f32, 0.6, 0.2, 1.0];
        let orig = px;
        fwd.apply_rgba(&mut px);
        inv.apply_rgba(&mut px);
        for ch in 0..3 {
            assert!(
                (px[ch] - orig[ch]).abs() < 1e-3,
                "ch {ch}: {} vs {}",
                px[ch],
                orig[ch]
            );
        }
    }
}
