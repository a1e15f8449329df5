//! Color-space definitions.
//!
//! A color space names an encoding and carries the transforms that relate
//! it to the config's reference space. A space with neither direction
//! defined is the reference itself (or a pass-through alias of it).

use chroma_core::BitDepth;

use crate::transform::{Allocation, Transform};

/// A named color space.
///
/// Built with chained setters:
///
/// ```
/// use chroma_engine::{ColorSpace, Transform};
///
/// let cs = ColorSpace::new("ACEScg")
///     .with_family("ACES")
///     .with_equality_group("ap1-linear")
///     .with_to_reference(Transform::matrix(
///         chroma_engine::MatrixTransform::IDENTITY,
///     ));
/// assert_eq!(cs.name(), "ACEScg");
/// ```
#[derive(Debug, Clone)]
pub struct ColorSpace {
    name: String,
    aliases: Vec<String>,
    family: String,
    equality_group: String,
    description: String,
    bit_depth: BitDepth,
    is_data: bool,
    allocation: Allocation,
    allocation_vars: Vec<f64>,
    to_reference: Option<Transform>,
    from_reference: Option<Transform>,
}

impl ColorSpace {
    /// Creates a color space with defaults: no transforms, f32 hint,
    /// uniform allocation over [0, 1].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            family: String::new(),
            equality_group: String::new(),
            description: String::new(),
            bit_depth: BitDepth::F32,
            is_data: false,
            allocation: Allocation::Uniform,
            allocation_vars: vec![0.0, 1.0],
            to_reference: None,
            from_reference: None,
        }
    }

    /// Adds an alias name.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Sets the family label.
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    /// Sets the equality group.
    pub fn with_equality_group(mut self, group: impl Into<String>) -> Self {
        self.equality_group = group.into();
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Sets the bit-depth hint.
    pub fn with_bit_depth(mut self, depth: BitDepth) -> Self {
        self.bit_depth = depth;
        self
    }

    /// Marks the space as non-color data; conversions become no-ops.
    pub fn with_data_flag(mut self, is_data: bool) -> Self {
        self.is_data = is_data;
        self
    }

    /// Sets the allocation hint and its variables.
    pub fn with_allocation(mut self, allocation: Allocation, vars: Vec<f64>) -> Self {
        self.allocation = allocation;
        self.allocation_vars = vars;
        self
    }

    /// Sets the transform from this space to the reference.
    pub fn with_to_reference(mut self, t: Transform) -> Self {
        self.to_reference = Some(t);
        self
    }

    /// Sets the transform from the reference to this space.
    pub fn with_from_reference(mut self, t: Transform) -> Self {
        self.from_reference = Some(t);
        self
    }

    /// The space's name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alias names.
    #[inline]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// True when `name` matches the name or an alias, case-insensitively.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Family label.
    #[inline]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Equality group; empty means "in no group".
    #[inline]
    pub fn equality_group(&self) -> &str {
        &self.equality_group
    }

    /// Description.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Bit-depth hint.
    #[inline]
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    /// True for non-color data spaces.
    #[inline]
    pub fn is_data(&self) -> bool {
        self.is_data
    }

    /// Allocation hint.
    #[inline]
    pub fn allocation(&self) -> Allocation {
        self.allocation
    }

    /// Allocation variables.
    #[inline]
    pub fn allocation_vars(&self) -> &[f64] {
        &self.allocation_vars
    }

    /// Transform to the reference, if declared.
    #[inline]
    pub fn to_reference(&self) -> Option<&Transform> {
        self.to_reference.as_ref()
    }

    /// Transform from the reference, if declared.
    #[inline]
    pub fn from_reference(&self) -> Option<&Transform> {
        self.from_reference.as_ref()
    }

    /// True when the space is a pass-through of the reference.
    pub fn is_reference_passthrough(&self) -> bool {
        self.to_reference.is_none() && self.from_reference.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::MatrixTransform;

    #[test]
    fn builder_chain() {
        let cs = ColorSpace::new("ACEScct")
            .with_alias("acescct")
            .with_family("ACES")
            .with_equality_group("acescct")
            .with_bit_depth(BitDepth::F32)
            .with_allocation(Allocation::Uniform, vec![-0.36, 1.47])
            .with_to_reference(Transform::matrix(MatrixTransform::IDENTITY));

        assert_eq!(cs.name(), "ACEScct");
        assert!(cs.matches("ACESCCT"));
        assert!(!cs.is_reference_passthrough());
        assert_eq!(cs.allocation_vars(), &[-0.36, 1.47]);
    }

    #[test]
    fn passthrough_by_default() {
        let cs = ColorSpace::new("raw").with_data_flag(true);
        assert!(cs.is_reference_passthrough());
        assert!(cs.is_data());
    }
}
