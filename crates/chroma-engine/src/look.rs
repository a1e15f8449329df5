//! Looks: named creative grades with a declared process space.
//!
//! A look's math is authored in its process space; applying it means
//! converting into that space, running the look transform, and converting
//! out again. Look references are listed as a token string where `+`
//! (default) applies forward and `-` applies the inverse.

use crate::transform::{Direction, Transform};

/// A named look.
#[derive(Debug, Clone)]
pub struct Look {
    name: String,
    process_space: String,
    description: String,
    transform: Option<Transform>,
    inverse_transform: Option<Transform>,
}

impl Look {
    /// Creates a look authored in `process_space`.
    pub fn new(name: impl Into<String>, process_space: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            process_space: process_space.into(),
            description: String::new(),
            transform: None,
            inverse_transform: None,
        }
    }

    /// Sets the forward transform.
    pub fn with_transform(mut self, t: Transform) -> Self {
        self.transform = Some(t);
        self
    }

    /// Sets a dedicated inverse transform; absent, the forward transform
    /// is inverted instead.
    pub fn with_inverse_transform(mut self, t: Transform) -> Self {
        self.inverse_transform = Some(t);
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Look name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Color space the look math is defined in.
    #[inline]
    pub fn process_space(&self) -> &str {
        &self.process_space
    }

    /// Description.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Forward transform, if declared.
    #[inline]
    pub fn transform(&self) -> Option<&Transform> {
        self.transform.as_ref()
    }

    /// Dedicated inverse transform, if declared.
    #[inline]
    pub fn inverse_transform(&self) -> Option<&Transform> {
        self.inverse_transform.as_ref()
    }
}

/// Parses a look token list into ordered `(name, direction)` pairs.
///
/// Tokens are separated by commas or colons; a `+` prefix (or none)
/// means forward, `-` means inverse. Empty tokens are skipped.
///
/// ```
/// use chroma_engine::{parse_looks, Direction};
///
/// let looks = parse_looks("show_grade, -neutralize:+vignette");
/// assert_eq!(
///     looks,
///     vec![
///         ("show_grade", Direction::Forward),
///         ("neutralize", Direction::Inverse),
///         ("vignette", Direction::Forward),
///     ]
/// );
/// ```
pub fn parse_looks(tokens: &str) -> Vec<(&str, Direction)> {
    tokens
        .split([',', ':'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter_map(|t| {
            if let Some(name) = t.strip_prefix('-') {
                let name = name.trim();
                (!name.is_empty()).then_some((name, Direction::Inverse))
            } else {
                let name = t.strip_prefix('+').unwrap_or(t).trim();
                (!name.is_empty()).then_some((name, Direction::Forward))
            }
        })
        .collect()
}
