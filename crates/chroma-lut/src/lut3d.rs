//! 3-dimensional lookup table.
//!
//! A 3D LUT maps RGB input to RGB output through a cube of sampled colors.
//! The grid is addressed R-major, then G, with B varying fastest, matching
//! the layout the inverse-evaluation range tree walks. Stored values may
//! exceed [0, 1].

use crate::{Interpolation, LutError, LutResult};

/// A 3-dimensional lookup table.
///
/// Input is addressed on [0, 1] per channel; out-of-range input clamps to
/// the cube. Standard sizes are 17, 33 or 65 per side.
///
/// # Example
///
/// ```rust
/// use chroma_lut::{Interpolation, Lut3D};
///
/// let lut = Lut3D::identity(33);
/// let out = lut.apply([0.5, 0.3, 0.2], Interpolation::Linear);
/// assert!((out[1] - 0.3).abs() < 1e-5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3D {
    /// Grid values, `size^3` RGB triples, blue index varying fastest.
    pub data: Vec<[f32; 3]>,
    /// Grid side length.
    pub size: usize,
}

impl Lut3D {
    /// Creates an identity (pass-through) cube.
    pub fn identity(size: usize) -> Self {
        let last = (size - 1) as f32;
        let mut data = Vec::with_capacity(size * size * size);
        for r in 0..size {
            for g in 0..size {
                for b in 0..size {
                    data.push([r as f32 / last, g as f32 / last, b as f32 / last]);
                }
            }
        }
        Self { data, size }
    }

    /// Creates a cube from raw data in blue-fastest order.
    pub fn from_data(data: Vec<[f32; 3]>, size: usize) -> LutResult<Self> {
        if size < 2 {
            return Err(LutError::InvalidSize("3D LUT side must be at least 2".into()));
        }
        let expected = size * size * size;
        if data.len() != expected {
            return Err(LutError::InvalidSize(format!(
                "expected {} entries for side {}, got {}",
                expected,
                size,
                data.len()
            )));
        }
        Ok(Self { data, size })
    }

    /// Grid value at integer position (r, g, b).
    #[inline]
    pub fn get(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.data[(r * self.size + g) * self.size + b]
    }

    /// Sets the grid value at integer position (r, g, b).
    #[inline]
    pub fn set(&mut self, r: usize, g: usize, b: usize, rgb: [f32; 3]) {
        self.data[(r * self.size + g) * self.size + b] = rgb;
    }

    /// Applies the cube to an RGB triple.
    pub fn apply(&self, rgb: [f32; 3], interp: Interpolation) -> [f32; 3] {
        match interp.concrete_3d() {
            Interpolation::Nearest => self.apply_nearest(rgb),
            Interpolation::Tetrahedral => self.apply_tetrahedral(rgb),
            _ => self.apply_trilinear(rgb),
        }
    }

    /// Splits an input coordinate into a clamped base index and fraction.
    ///
    /// NaN addresses the grid origin; +inf the top corner, -inf the
    /// bottom. The base index is capped at `size - 2` so the high corner
    /// of the cell always exists.
    #[inline]
    fn split(&self, v: f32) -> (usize, f32) {
        let last = (self.size - 1) as f32;
        let scaled = if v.is_nan() { 0.0 } else { (v * last).clamp(0.0, last) };
        let base = (scaled.floor() as usize).min(self.size - 2);
        (base, scaled - base as f32)
    }

    fn apply_nearest(&self, rgb: [f32; 3]) -> [f32; 3] {
        let (ri, rf) = self.split(rgb[0]);
        let (gi, gf) = self.split(rgb[1]);
        let (bi, bf) = self.split(rgb[2]);
        self.get(
            ri + (rf.round() as usize),
            gi + (gf.round() as usize),
            bi + (bf.round() as usize),
        )
    }

    fn apply_trilinear(&self, rgb: [f32; 3]) -> [f32; 3] {
        let (ri, rf) = self.split(rgb[0]);
        let (gi, gf) = self.split(rgb[1]);
        let (bi, bf) = self.split(rgb[2]);

        let c000 = self.get(ri, gi, bi);
        let c100 = self.get(ri + 1, gi, bi);
        let c010 = self.get(ri, gi + 1, bi);
        let c110 = self.get(ri + 1, gi + 1, bi);
        let c001 = self.get(ri, gi, bi + 1);
        let c101 = self.get(ri + 1, gi, bi + 1);
        let c011 = self.get(ri, gi + 1, bi + 1);
        let c111 = self.get(ri + 1, gi + 1, bi + 1);

        let mut out = [0.0f32; 3];
        for i in 0..3 {
            let c00 = c000[i] * (1.0 - rf) + c100[i] * rf;
            let c01 = c001[i] * (1.0 - rf) + c101[i] * rf;
            let c10 = c010[i] * (1.0 - rf) + c110[i] * rf;
            let c11 = c011[i] * (1.0 - rf) + c111[i] * rf;

            let c0 = c00 * (1.0 - gf) + c10 * gf;
            let c1 = c01 * (1.0 - gf) + c11 * gf;

            out[i] = c0 * (1.0 - bf) + c1 * bf;
        }
        out
    }

    fn apply_tetrahedral(&self, rgb: [f32; 3]) -> [f32; 3] {
        let (ri, rf) = self.split(rgb[0]);
        let (gi, gf) = self.split(rgb[1]);
        let (bi, bf) = self.split(rgb[2]);

        let c000 = self.get(ri, gi, bi);
        let c100 = self.get(ri + 1, gi, bi);
        let c010 = self.get(ri, gi + 1, bi);
        let c110 = self.get(ri + 1, gi + 1, bi);
        let c001 = self.get(ri, gi, bi + 1);
        let c101 = self.get(ri + 1, gi, bi + 1);
        let c011 = self.get(ri, gi + 1, bi + 1);
        let c111 = self.get(ri + 1, gi + 1, bi + 1);

        // Branch order fixes the tie-break for equal fractions: R>G>B
        // first, then G>B>R, then B>R>G.
        let mut out = [0.0f32; 3];
        for i in 0..3 {
            out[i] = if rf >= gf {
                if gf >= bf {
                    // R >= G >= B
                    c000[i] + rf * (c100[i] - c000[i]) + gf * (c110[i] - c100[i]) + bf * (c111[i] - c110[i])
                } else if rf >= bf {
                    // R >= B > G
                    c000[i] + rf * (c100[i] - c000[i]) + bf * (c101[i] - c100[i]) + gf * (c111[i] - c101[i])
                } else {
                    // B > R >= G
                    c000[i] + bf * (c001[i] - c000[i]) + rf * (c101[i] - c001[i]) + gf * (c111[i] - c101[i])
                }
            } else if gf >= bf {
                if rf >= bf {
                    // G > R >= B
                    c000[i] + gf * (c010[i] - c000[i]) + rf * (c110[i] - c010[i]) + bf * (c111[i] - c110[i])
                } else {
                    // G >= B > R
                    c000[i] + gf * (c010[i] - c000[i]) + bf * (c011[i] - c010[i]) + rf * (c111[i] - c011[i])
                }
            } else {
                // B > G > R
                c000[i] + bf * (c001[i] - c000[i]) + gf * (c011[i] - c001[i]) + rf * (c111[i] - c011[i])
            };
        }
        out
    }
}
