//! Displays and views.
//!
//! A display is an output device; a view pairs a display with an output
//! color space and an optional look chain. Views are ordered and the
//! first view of a display is its default unless an active-views list
//! says otherwise.

/// A view within a display.
#[derive(Debug, Clone)]
pub struct View {
    name: String,
    colorspace: String,
    looks: Option<String>,
    description: String,
}

impl View {
    /// Creates a view rendering into `colorspace`.
    pub fn new(name: impl Into<String>, colorspace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            colorspace: colorspace.into(),
            looks: None,
            description: String::new(),
        }
    }

    /// Attaches a look token list (see [`crate::parse_looks`]).
    pub fn with_looks(mut self, looks: impl Into<String>) -> Self {
        self.looks = Some(looks.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// View name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output color-space name.
    #[inline]
    pub fn colorspace(&self) -> &str {
        &self.colorspace
    }

    /// Look token list, if any.
    #[inline]
    pub fn looks(&self) -> Option<&str> {
        self.looks.as_deref()
    }

    /// Description.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// A display device with its ordered views.
#[derive(Debug, Clone)]
pub struct Display {
    name: String,
    views: Vec<View>,
}

impl Display {
    /// Creates a display with no views.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            views: Vec::new(),
        }
    }

    /// Appends a view.
    pub fn add_view(&mut self, view: View) {
        self.views.push(view);
    }

    /// Display name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All views in declaration order.
    #[inline]
    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Finds a view by name, case-insensitively.
    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|v| v.name.eq_ignore_ascii_case(name))
    }

    /// View names in declaration order.
    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.iter().map(|v| v.name.as_str())
    }
}

/// Filters declared names through an active list.
///
/// An empty active list keeps everything in declaration order. Otherwise
/// the active list's order wins, entries naming nothing declared are
/// silently dropped, and the first survivor is the default (index 0).
pub(crate) fn filter_active<'a>(declared: &[&'a str], active: &[String]) -> Vec<&'a str> {
    if active.is_empty() {
        return declared.to_vec();
    }
    active
        .iter()
        .filter_map(|a| declared.iter().find(|d| d.eq_ignore_ascii_case(a)).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_lookup_ignores_case() {
        let mut d = Display::new("sRGB");
        d.add_view(View::new("Film", "sRGB - Display"));
        d.add_view(View::new("Raw", "Raw").with_looks("-neutral"));

        assert!(d.view("film").is_some());
        assert_eq!(d.view("Raw").and_then(View::looks), Some("-neutral"));
        assert!(d.view("Log").is_none());
    }

    #[test]
    fn active_order_wins() {
        let declared = ["sRGB", "Rec709", "P3"];
        let active = vec!["p3".to_string(), "srgb".to_string()];
        assert_eq!(filter_active(&declared, &active), vec!["P3", "sRGB"]);
    }

    #[test]
    fn unknown_active_entries_ignored() {
        let declared = ["sRGB", "Rec709"];
        let active = vec!["DCI".to_string(), "Rec709".to_string()];
        assert_eq!(filter_active(&declared, &active), vec!["Rec709"]);
    }

    #[test]
    fn empty_active_keeps_declaration_order() {
        let declared = ["sRGB", "Rec709"];
        assert_eq!(filter_active(&declared, &[]), vec!["sRGB", "Rec709"]);
    }
}
