//! Role definitions: semantic aliases onto color-space names.
//!
//! Roles let a pipeline ask for "the scene-linear space" without naming
//! it. Lookups share a namespace with color-space names and lose ties to
//! them: a color space named like a role shadows the role.

use std::collections::HashMap;

/// Reserved role identifiers. Anything else is user-defined.
pub mod names {
    /// Fallback space for unrecognized inputs.
    pub const DEFAULT: &str = "default";
    /// The config's connection space.
    pub const REFERENCE: &str = "reference";
    /// Non-color data (normals, motion vectors); never converted.
    pub const DATA: &str = "data";
    /// Space for color pickers and swatches.
    pub const COLOR_PICKING: &str = "color_picking";
    /// Scene-linear working space.
    pub const SCENE_LINEAR: &str = "scene_linear";
    /// Log space for compositing.
    pub const COMPOSITING_LOG: &str = "compositing_log";
    /// Space grading and CDLs are authored in.
    pub const COLOR_TIMING: &str = "color_timing";
    /// ACES2065-1 interchange space.
    pub const ACES_INTERCHANGE: &str = "aces_interchange";
    /// CIE XYZ D65 display interchange space.
    pub const CIE_XYZ_D65_INTERCHANGE: &str = "cie_xyz_d65_interchange";
}

/// Role-to-color-space mapping.
#[derive(Debug, Clone, Default)]
pub struct Roles {
    map: HashMap<String, String>,
}

impl Roles {
    /// Creates an empty role table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines (or redefines) a role.
    pub fn define(&mut self, role: impl Into<String>, colorspace: impl Into<String>) {
        self.map.insert(role.into(), colorspace.into());
    }

    /// The color-space name a role points at.
    pub fn get(&self, role: &str) -> Option<&str> {
        self.map.get(role).map(String::as_str)
    }

    /// True when the role is defined.
    pub fn contains(&self, role: &str) -> bool {
        self.map.contains_key(role)
    }

    /// Number of defined roles.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no roles are defined.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates `(role, colorspace)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
