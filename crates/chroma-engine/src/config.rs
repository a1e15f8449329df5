//! The config: the owning document for color spaces, roles, looks and
//! displays.
//!
//! A config is plain data built programmatically (a textual format is a
//! front-end concern); the engine consumes the resolved object. Name
//! lookups are case-insensitive and color-space names shadow roles.

use std::path::{Path, PathBuf};

use crate::colorspace::ColorSpace;
use crate::context::{Context, EnvMode};
use crate::display::{filter_active, Display, View};
use crate::error::{EngineError, EngineResult};
use crate::look::Look;
use crate::processor::Processor;
use crate::role::Roles;
use crate::transform::{Direction, Transform};
use crate::validate;

/// Rec.709 luma weights, the default saturation basis.
pub const DEFAULT_LUMA: [f64; 3] = [0.2126, 0.7152, 0.0722];

/// A color-management configuration.
#[derive(Debug, Clone)]
pub struct Config {
    name: String,
    description: String,
    search_path: String,
    working_dir: PathBuf,
    colorspaces: Vec<ColorSpace>,
    roles: Roles,
    looks: Vec<Look>,
    displays: Vec<Display>,
    active_displays: Vec<String>,
    active_views: Vec<String>,
    luma: [f64; 3],
    context: Context,
    strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Creates an empty config with Rec.709 luma and an env-seeded
    /// context.
    pub fn new() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            search_path: String::new(),
            working_dir: PathBuf::from("."),
            colorspaces: Vec::new(),
            roles: Roles::new(),
            looks: Vec::new(),
            displays: Vec::new(),
            active_displays: Vec::new(),
            active_views: Vec::new(),
            luma: DEFAULT_LUMA,
            context: Context::new(EnvMode::All),
            strict: true,
        }
    }

    /// Sets the config name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Sets the description.
    pub fn set_description(&mut self, desc: impl Into<String>) {
        self.description = desc.into();
    }

    /// Sets the colon-delimited LUT search path.
    pub fn set_search_path(&mut self, path: impl Into<String>) {
        self.search_path = path.into();
    }

    /// Sets the directory relative search-path entries anchor at.
    pub fn set_working_dir(&mut self, dir: impl Into<PathBuf>) {
        self.working_dir = dir.into();
    }

    /// Sets the luma weights used by saturation stages.
    pub fn set_luma(&mut self, luma: [f64; 3]) {
        self.luma = luma;
    }

    /// Sets strict name resolution; lax mode is reserved for tooling.
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Replaces the context.
    pub fn set_context(&mut self, context: Context) {
        self.context = context;
    }

    /// Appends a color space.
    pub fn add_colorspace(&mut self, cs: ColorSpace) {
        self.colorspaces.push(cs);
    }

    /// Defines (or redefines) a role.
    pub fn set_role(&mut self, role: impl Into<String>, colorspace: impl Into<String>) {
        self.roles.define(role, colorspace);
    }

    /// Appends a look.
    pub fn add_look(&mut self, look: Look) {
        self.looks.push(look);
    }

    /// Appends a display.
    pub fn add_display(&mut self, display: Display) {
        self.displays.push(display);
    }

    /// Sets the active-displays list; empty means "all declared".
    pub fn set_active_displays(&mut self, names: Vec<String>) {
        self.active_displays = names;
    }

    /// Sets the active-views list; empty means "all declared".
    pub fn set_active_views(&mut self, names: Vec<String>) {
        self.active_views = names;
    }

    /// Config name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Colon-delimited search path.
    #[inline]
    pub fn search_path(&self) -> &str {
        &self.search_path
    }

    /// Working directory.
    #[inline]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Luma weights.
    #[inline]
    pub fn luma(&self) -> [f64; 3] {
        self.luma
    }

    /// Strict-resolution flag.
    #[inline]
    pub fn strict(&self) -> bool {
        self.strict
    }

    /// The config's context.
    #[inline]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Mutable access to the context.
    #[inline]
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// All color spaces in declaration order.
    #[inline]
    pub fn colorspaces(&self) -> &[ColorSpace] {
        &self.colorspaces
    }

    /// Role table.
    #[inline]
    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    /// All looks.
    #[inline]
    pub fn looks(&self) -> &[Look] {
        &self.looks
    }

    /// All declared displays.
    #[inline]
    pub fn displays(&self) -> &[Display] {
        &self.displays
    }

    /// Finds a color space by exact (case-insensitive) name or alias,
    /// without consulting roles.
    pub fn colorspace(&self, name: &str) -> Option<&ColorSpace> {
        self.colorspaces.iter().find(|cs| cs.matches(name))
    }

    /// Color space at a declaration-order index.
    pub fn colorspace_at(&self, index: usize) -> EngineResult<&ColorSpace> {
        self.colorspaces.get(index).ok_or(EngineError::OutOfRange {
            index,
            len: self.colorspaces.len(),
        })
    }

    /// Display at a declaration-order index.
    pub fn display_at(&self, index: usize) -> EngineResult<&Display> {
        self.displays.get(index).ok_or(EngineError::OutOfRange {
            index,
            len: self.displays.len(),
        })
    }

    /// Resolves a name to a color space: color-space names win, then
    /// roles are consulted.
    pub fn resolve_colorspace(&self, name: &str) -> EngineResult<&ColorSpace> {
        if let Some(cs) = self.colorspace(name) {
            return Ok(cs);
        }
        if let Some(target) = self.roles.get(name) {
            if let Some(cs) = self.colorspace(target) {
                return Ok(cs);
            }
        }
        Err(EngineError::UnknownName {
            kind: "color space",
            name: name.to_string(),
        })
    }

    /// Finds a look by name, case-insensitively.
    pub fn look(&self, name: &str) -> EngineResult<&Look> {
        self.looks
            .iter()
            .find(|l| l.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::UnknownName {
                kind: "look",
                name: name.to_string(),
            })
    }

    /// Finds a display by name, case-insensitively.
    pub fn display(&self, name: &str) -> EngineResult<&Display> {
        self.displays
            .iter()
            .find(|d| d.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::UnknownName {
                kind: "display",
                name: name.to_string(),
            })
    }

    /// Display names after active-displays filtering.
    pub fn active_display_names(&self) -> Vec<&str> {
        let declared: Vec<&str> = self.displays.iter().map(Display::name).collect();
        filter_active(&declared, &self.active_displays)
    }

    /// View names of a display after active-views filtering.
    pub fn active_view_names(&self, display: &str) -> EngineResult<Vec<&str>> {
        let display = self.display(display)?;
        let declared: Vec<&str> = display.view_names().collect();
        Ok(filter_active(&declared, &self.active_views))
    }

    /// The default display: first survivor of active filtering.
    pub fn default_display(&self) -> Option<&str> {
        self.active_display_names().first().copied()
    }

    /// The default view of a display: first survivor of active filtering.
    pub fn default_view(&self, display: &str) -> EngineResult<&str> {
        let names = self.active_view_names(display)?;
        names.first().copied().ok_or_else(|| EngineError::UnknownName {
            kind: "view",
            name: format!("{display} has no active views"),
        })
    }

    /// Resolves a `(display, view)` pair to its view definition.
    pub fn view(&self, display: &str, view: &str) -> EngineResult<&View> {
        let d = self.display(display)?;
        d.view(view).ok_or_else(|| EngineError::UnknownName {
            kind: "view",
            name: format!("{display}/{view}"),
        })
    }

    /// Checks the whole config for dangling references and cycles.
    pub fn validate(&self) -> EngineResult<()> {
        validate::check(self)
    }

    /// Compiles a processor converting `src` to `dst`.
    pub fn processor(&self, src: &str, dst: &str) -> EngineResult<Processor> {
        Processor::compile(
            self,
            self.context(),
            &Transform::colorspace(src, dst),
            Direction::Forward,
        )
    }

    /// Compiles a processor for an arbitrary transform.
    pub fn processor_for(
        &self,
        transform: &Transform,
        direction: Direction,
    ) -> EngineResult<Processor> {
        Processor::compile(self, self.context(), transform, direction)
    }

    /// Compiles a display/view output processor.
    pub fn display_processor(
        &self,
        src: &str,
        display: &str,
        view: &str,
    ) -> EngineResult<Processor> {
        let t = Transform::DisplayView(crate::transform::DisplayViewTransform {
            src: src.to_string(),
            display: display.to_string(),
            view: view.to_string(),
            direction: Direction::Forward,
        });
        Processor::compile(self, self.context(), &t, Direction::Forward)
    }
}
