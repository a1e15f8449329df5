//! Pixel-level helpers shared by the op kernels.

/// Rec.709 luma weights, the default saturation basis.
pub const REC709_LUMA: [f64; 3] = [0.2126, 0.7152, 0.0722];

/// Weighted luma of an RGB triple.
#[inline]
pub fn luma(rgb: [f32; 3], weights: [f64; 3]) -> f32 {
    (rgb[0] as f64 * weights[0] + rgb[1] as f64 * weights[1] + rgb[2] as f64 * weights[2]) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_luma_grey() {
        // Weights sum to 1, so grey maps to itself.
        let y = luma([0.5, 0.5, 0.5], REC709_LUMA);
        assert_relative_eq!(y, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_luma_green_heavy() {
        let y = luma([0.0, 1.0, 0.0], REC709_LUMA);
        assert_relative_eq!(y, 0.7152, epsilon = 1e-6);
    }
}
