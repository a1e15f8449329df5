//! 1-dimensional lookup table.
//!
//! A 1D LUT applies an independent transfer function to each color channel:
//! gamma curves, log shapers, contrast curves. Monotonicity is not assumed
//! for forward evaluation; it is required (per channel) to build an
//! inverse.

use crate::{Interpolation, LutError, LutResult};

/// A 1-dimensional lookup table.
///
/// Stores one curve per channel, or a single curve shared by all three.
///
/// # Example
///
/// ```rust
/// use chroma_lut::{Interpolation, Lut1D};
///
/// let lut = Lut1D::gamma(1024, 2.2);
/// let y = lut.eval(0.5, Interpolation::Linear);
/// assert!((y - 0.5_f32.powf(2.2)).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1D {
    /// Entries for the red channel (or all channels if mono).
    pub r: Vec<f32>,
    /// Entries for the green channel (`None` if mono).
    pub g: Option<Vec<f32>>,
    /// Entries for the blue channel (`None` if mono).
    pub b: Option<Vec<f32>>,
    /// Input domain minimum.
    pub domain_min: f32,
    /// Input domain maximum.
    pub domain_max: f32,
}

impl Lut1D {
    /// Creates an identity (pass-through) table.
    pub fn identity(size: usize) -> Self {
        let entries: Vec<f32> = (0..size).map(|i| i as f32 / (size - 1) as f32).collect();
        Self {
            r: entries,
            g: None,
            b: None,
            domain_min: 0.0,
            domain_max: 1.0,
        }
    }

    /// Creates a gamma-curve table.
    pub fn gamma(size: usize, gamma: f32) -> Self {
        let entries: Vec<f32> = (0..size)
            .map(|i| (i as f32 / (size - 1) as f32).powf(gamma))
            .collect();
        Self {
            r: entries,
            g: None,
            b: None,
            domain_min: 0.0,
            domain_max: 1.0,
        }
    }

    /// Creates a mono table from raw entries.
    pub fn from_data(data: Vec<f32>, domain_min: f32, domain_max: f32) -> LutResult<Self> {
        if data.len() < 2 {
            return Err(LutError::InvalidSize("1D LUT needs at least 2 entries".into()));
        }
        if !(domain_max > domain_min) {
            return Err(LutError::InvalidDomain {
                min: domain_min,
                max: domain_max,
            });
        }
        Ok(Self {
            r: data,
            g: None,
            b: None,
            domain_min,
            domain_max,
        })
    }

    /// Creates a 3-channel table from separate RGB entries.
    pub fn from_rgb(
        r: Vec<f32>,
        g: Vec<f32>,
        b: Vec<f32>,
        domain_min: f32,
        domain_max: f32,
    ) -> LutResult<Self> {
        if r.len() < 2 {
            return Err(LutError::InvalidSize("1D LUT needs at least 2 entries".into()));
        }
        if r.len() != g.len() || r.len() != b.len() {
            return Err(LutError::InvalidSize(
                "RGB channels must have the same length".into(),
            ));
        }
        if !(domain_max > domain_min) {
            return Err(LutError::InvalidDomain {
                min: domain_min,
                max: domain_max,
            });
        }
        Ok(Self {
            r,
            g: Some(g),
            b: Some(b),
            domain_min,
            domain_max,
        })
    }

    /// Number of entries per channel.
    #[inline]
    pub fn size(&self) -> usize {
        self.r.len()
    }

    /// True if a single curve serves all channels.
    #[inline]
    pub fn is_mono(&self) -> bool {
        self.g.is_none()
    }

    /// Evaluates the red/mono channel.
    pub fn eval(&self, value: f32, interp: Interpolation) -> f32 {
        lookup(&self.r, self.domain_min, self.domain_max, value, interp)
    }

    /// Evaluates all three channels.
    pub fn eval_rgb(&self, rgb: [f32; 3], interp: Interpolation) -> [f32; 3] {
        let g = self.g.as_deref().unwrap_or(&self.r);
        let b = self.b.as_deref().unwrap_or(&self.r);
        [
            lookup(&self.r, self.domain_min, self.domain_max, rgb[0], interp),
            lookup(g, self.domain_min, self.domain_max, rgb[1], interp),
            lookup(b, self.domain_min, self.domain_max, rgb[2], interp),
        ]
    }

    /// Builds the exact inverse table.
    ///
    /// Each channel must be monotonic (non-decreasing or non-increasing;
    /// flat runs are allowed). The inverse maps the forward table's output
    /// range back onto the input domain by bisection, sampled at the same
    /// resolution.
    pub fn invert(&self) -> LutResult<Self> {
        let r = invert_channel(&self.r, self.domain_min, self.domain_max, 0)?;
        let g = match &self.g {
            Some(g) => Some(invert_channel(g, self.domain_min, self.domain_max, 1)?),
            None => None,
        };
        let b = match &self.b {
            Some(b) => Some(invert_channel(b, self.domain_min, self.domain_max, 2)?),
            None => None,
        };

        // All channels of the inverse share one domain: the hull of the
        // forward output ranges.
        let mut lo = r.1;
        let mut hi = r.2;
        for ch in [&g, &b].into_iter().flatten() {
            lo = lo.min(ch.1);
            hi = hi.max(ch.2);
        }
        if !(hi > lo) {
            // Fully flat table; invert as a constant map.
            hi = lo + 1.0;
        }

        let resample = |ch: (Vec<f32>, f32, f32)| -> Vec<f32> {
            resample_channel(&ch.0, ch.1, ch.2, lo, hi)
        };

        Ok(Self {
            r: resample(r),
            g: g.map(resample),
            b: b.map(resample),
            domain_min: lo,
            domain_max: hi,
        })
    }
}

fn lookup(data: &[f32], dmin: f32, dmax: f32, value: f32, interp: Interpolation) -> f32 {
    let size = data.len();
    let last = (size - 1) as f32;

    let mut t = (value - dmin) / (dmax - dmin);
    if t.is_nan() {
        t = 0.0;
    }
    let idx_f = (t * last).clamp(0.0, last);

    match interp.concrete_1d() {
        Interpolation::Nearest => data[idx_f.round() as usize],
        _ => {
            let idx0 = (idx_f.floor() as usize).min(size - 1);
            let idx1 = (idx0 + 1).min(size - 1);
            let frac = idx_f - idx0 as f32;
            data[idx0] * (1.0 - frac) + data[idx1] * frac
        }
    }
}

/// Verifies monotonicity and returns the channel with its output range.
fn invert_channel(
    data: &[f32],
    dmin: f32,
    dmax: f32,
    channel: usize,
) -> LutResult<(Vec<f32>, f32, f32)> {
    let increasing = data[data.len() - 1] >= data[0];
    for w in data.windows(2) {
        let ok = if increasing { w[1] >= w[0] } else { w[1] <= w[0] };
        if !ok {
            return Err(LutError::NonMonotonic { channel });
        }
    }

    // Normalize to an increasing table; remember orientation via the
    // position mapping.
    let size = data.len();
    let positions: Vec<f32> = (0..size)
        .map(|i| dmin + (i as f32 / (size - 1) as f32) * (dmax - dmin))
        .collect();

    let (table, pos): (Vec<f32>, Vec<f32>) = if increasing {
        (data.to_vec(), positions)
    } else {
        (
            data.iter().rev().copied().collect(),
            positions.into_iter().rev().collect(),
        )
    };

    let lo = table[0];
    let hi = table[size - 1];

    // Inverse samples are positions; store them alongside their range so
    // the caller can resample all channels onto a shared domain.
    let mut inv = Vec::with_capacity(size);
    for i in 0..size {
        let target = lo + (i as f32 / (size - 1) as f32) * (hi - lo);
        inv.push(bisect(&table, &pos, target));
    }
    Ok((inv, lo, hi))
}

/// Finds the input position whose table value equals `target`.
///
/// Flat runs resolve to their lower edge.
fn bisect(table: &[f32], pos: &[f32], target: f32) -> f32 {
    let size = table.len();
    let mut lo = 0;
    let mut hi = size - 1;
    while lo + 1 < hi {
        let mid = (lo + hi) / 2;
        if table[mid] < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let seg = table[hi] - table[lo];
    let frac = if seg.abs() < 1e-12 {
        0.0
    } else {
        ((target - table[lo]) / seg).clamp(0.0, 1.0)
    };
    pos[lo] + frac * (pos[hi] - pos[lo])
}

/// Re-samples an inverse channel from its own output range onto the shared
/// inverse domain.
fn resample_channel(inv: &[f32], lo: f32, hi: f32, new_lo: f32, new_hi: f32) -> Vec<f32> {
    let size = inv.len();
    let last = (size - 1) as f32;
    (0..size)
        .map(|i| {
            let target = new_lo + (i as f32 / last) * (new_hi - new_lo);
            let t = if hi > lo {
                ((target - lo) / (hi - lo)).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let idx_f = t * last;
            let i0 = (idx_f.floor() as usize).min(size - 1);
            let i1 = (i0 + 1).min(size - 1);
            let frac = idx_f - i0 as f32;
            inv[i0] * (1.0 - frac) + inv[i1] * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity() {
        let lut = Lut1D::identity(256);
        for v in [0.0, 0.25, 0.5, 1.0] {
            assert_abs_diff_eq!(lut.eval(v, Interpolation::Linear), v, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_nearest_snaps() {
        let lut = Lut1D::from_data(vec![0.0, 1.0], 0.0, 1.0).unwrap();
        assert_eq!(lut.eval(0.3, Interpolation::Nearest), 0.0);
        assert_eq!(lut.eval(0.7, Interpolation::Nearest), 1.0);
    }

    #[test]
    fn test_out_of_domain_clamps() {
        let lut = Lut1D::gamma(64, 2.0);
        assert_abs_diff_eq!(lut.eval(2.0, Interpolation::Linear), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(lut.eval(-1.0, Interpolation::Linear), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rgb_channels_independent() {
        let lut = Lut1D::from_rgb(
            vec![0.0, 1.0],
            vec![0.0, 2.0],
            vec![0.0, 4.0],
            0.0,
            1.0,
        )
        .unwrap();
        let out = lut.eval_rgb([0.5, 0.5, 0.5], Interpolation::Linear);
        assert_abs_diff_eq!(out[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[2], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_invert_gamma_roundtrip() {
        let lut = Lut1D::gamma(1024, 2.2);
        let inv = lut.invert().unwrap();
        for v in [0.05, 0.18, 0.5, 0.9] {
            let y = lut.eval(v, Interpolation::Linear);
            let back = inv.eval(y, Interpolation::Linear);
            assert_abs_diff_eq!(back, v, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_invert_decreasing() {
        let data: Vec<f32> = (0..256).map(|i| 1.0 - i as f32 / 255.0).collect();
        let lut = Lut1D::from_data(data, 0.0, 1.0).unwrap();
        let inv = lut.invert().unwrap();
        let y = lut.eval(0.25, Interpolation::Linear);
        assert_abs_diff_eq!(inv.eval(y, Interpolation::Linear), 0.25, epsilon = 1e-3);
    }

    #[test]
    fn test_invert_non_monotonic_fails() {
        let lut = Lut1D::from_data(vec![0.0, 0.8, 0.4, 1.0], 0.0, 1.0).unwrap();
        assert!(matches!(
            lut.invert(),
            Err(LutError::NonMonotonic { channel: 0 })
        ));
    }
}
