//! Interpolation methods for LUT evaluation.

/// Interpolation method for LUT evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    /// Nearest entry, no interpolation.
    Nearest,

    /// Linear interpolation (1D) / trilinear (3D).
    #[default]
    Linear,

    /// Tetrahedral interpolation (3D only; falls back to linear for 1D).
    ///
    /// Splits each grid cube into six tetrahedra along the main diagonal.
    /// Sharper than trilinear for saturated colors.
    Tetrahedral,

    /// Let the implementation pick the best available method.
    Best,
}

impl Interpolation {
    /// Resolves `Best` to the concrete method used for 3D cubes.
    #[inline]
    pub fn concrete_3d(self) -> Interpolation {
        match self {
            Interpolation::Best => Interpolation::Tetrahedral,
            other => other,
        }
    }

    /// Resolves `Best` to the concrete method used for 1D tables.
    #[inline]
    pub fn concrete_1d(self) -> Interpolation {
        match self {
            Interpolation::Best | Interpolation::Tetrahedral => Interpolation::Linear,
            other => other,
        }
    }
}
