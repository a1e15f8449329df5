//! Pixel bit depths and their nominal scales.

/// Pixel encoding depth.
///
/// Ops carry an input and output depth; integer depths imply a nominal
/// scale of `max_value` while float depths are unity-scaled. The optimizer
/// folds scale changes between adjacent ops into matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitDepth {
    /// 8-bit unsigned integer, scale 255.
    UInt8,
    /// 10-bit unsigned integer, scale 1023.
    UInt10,
    /// 12-bit unsigned integer, scale 4095.
    UInt12,
    /// 16-bit unsigned integer, scale 65535.
    UInt16,
    /// 16-bit half float, unity scale.
    F16,
    /// 32-bit float, unity scale.
    #[default]
    F32,
}

impl BitDepth {
    /// Nominal maximum code value for this depth.
    ///
    /// Float depths return 1.0.
    #[inline]
    pub fn max_value(self) -> f64 {
        match self {
            BitDepth::UInt8 => 255.0,
            BitDepth::UInt10 => 1023.0,
            BitDepth::UInt12 => 4095.0,
            BitDepth::UInt16 => 65535.0,
            BitDepth::F16 | BitDepth::F32 => 1.0,
        }
    }

    /// True for floating-point depths.
    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, BitDepth::F16 | BitDepth::F32)
    }

    /// Scale factor converting values at this depth to values at `other`.
    #[inline]
    pub fn scale_to(self, other: BitDepth) -> f64 {
        other.max_value() / self.max_value()
    }
}
