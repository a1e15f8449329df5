//! Whole-config validation.
//!
//! Checks every name reference (roles, views, looks, transform subtrees)
//! and rejects reference cycles between color spaces. Spaces form an
//! arena indexed by declaration order; cycle detection is a depth-first
//! walk with three-state coloring.

use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::look::parse_looks;
use crate::transform::Transform;

/// Runs every check; the first problem found is returned.
pub fn check(config: &Config) -> EngineResult<()> {
    check_roles(config)?;
    check_views(config)?;
    check_looks(config)?;
    check_colorspace_refs(config)?;
    check_cycles(config)
}

fn unknown(kind: &'static str, name: &str) -> EngineError {
    EngineError::UnknownName {
        kind,
        name: name.to_string(),
    }
}

fn check_roles(config: &Config) -> EngineResult<()> {
    for (role, target) in config.roles().iter() {
        if config.colorspace(target).is_none() {
            return Err(EngineError::Invalid(format!(
                "role '{role}' points at undefined color space '{target}'"
            )));
        }
    }
    Ok(())
}

fn check_views(config: &Config) -> EngineResult<()> {
    for display in config.displays() {
        for view in display.views() {
            config.resolve_colorspace(view.colorspace())?;
            if let Some(tokens) = view.looks() {
                for (name, _) in parse_looks(tokens) {
                    config.look(name)?;
                }
            }
        }
    }
    Ok(())
}

fn check_looks(config: &Config) -> EngineResult<()> {
    for look in config.looks() {
        config.resolve_colorspace(look.process_space())?;
        for t in [look.transform(), look.inverse_transform()].into_iter().flatten() {
            check_transform_refs(config, t)?;
        }
    }
    Ok(())
}

fn check_colorspace_refs(config: &Config) -> EngineResult<()> {
    for cs in config.colorspaces() {
        for t in [cs.to_reference(), cs.from_reference()].into_iter().flatten() {
            check_transform_refs(config, t)?;
        }
    }
    Ok(())
}

/// Walks a transform subtree checking every name it mentions.
fn check_transform_refs(config: &Config, transform: &Transform) -> EngineResult<()> {
    match transform {
        Transform::ColorSpace(t) => {
            config.resolve_colorspace(&t.src)?;
            config.resolve_colorspace(&t.dst)?;
        }
        Transform::DisplayView(t) => {
            config.resolve_colorspace(&t.src)?;
            config.view(&t.display, &t.view)?;
        }
        Transform::Look(t) => {
            config.resolve_colorspace(&t.src)?;
            config.resolve_colorspace(&t.dst)?;
            for (name, _) in parse_looks(&t.looks) {
                config.look(name)?;
            }
        }
        Transform::Group(g) => {
            for t in &g.transforms {
                check_transform_refs(config, t)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

fn check_cycles(config: &Config) -> EngineResult<()> {
    let spaces = config.colorspaces();
    let mut colors = vec![Color::White; spaces.len()];
    for start in 0..spaces.len() {
        if colors[start] == Color::White {
            visit(config, start, &mut colors)?;
        }
    }
    Ok(())
}

fn visit(config: &Config, index: usize, colors: &mut [Color]) -> EngineResult<()> {
    colors[index] = Color::Gray;
    let cs = &config.colorspaces()[index];
    let mut edges = Vec::new();
    for t in [cs.to_reference(), cs.from_reference()].into_iter().flatten() {
        collect_space_edges(config, t, &mut edges);
    }
    for next in edges {
        if next == index {
            return Err(EngineError::Cycle(format!(
                "color space '{}' references itself",
                cs.name()
            )));
        }
        match colors[next] {
            Color::Gray => {
                return Err(EngineError::Cycle(format!(
                    "color space '{}' participates in a reference cycle",
                    config.colorspaces()[next].name()
                )));
            }
            Color::White => visit(config, next, colors)?,
            Color::Black => {}
        }
    }
    colors[index] = Color::Black;
    Ok(())
}

/// Collects arena indices of color spaces a transform subtree names.
fn collect_space_edges(config: &Config, transform: &Transform, out: &mut Vec<usize>) {
    let mut push = |name: &str| {
        if let Ok(cs) = config.resolve_colorspace(name) {
            if let Some(i) = config
                .colorspaces()
                .iter()
                .position(|c| std::ptr::eq(c, cs))
            {
                out.push(i);
            }
        }
    };
    match transform {
        Transform::ColorSpace(t) => {
            push(&t.src);
            push(&t.dst);
        }
        Transform::Look(t) => {
            push(&t.src);
            push(&t.dst);
            for (name, _) in parse_looks(&t.looks) {
                if let Ok(look) = config.look(name) {
                    push(look.process_space());
                }
            }
        }
        Transform::DisplayView(t) => {
            push(&t.src);
            if let Ok(view) = config.view(&t.display, &t.view) {
                push(view.colorspace());
            }
        }
        Transform::Group(g) => {
            for t in &g.transforms {
                collect_space_edges(config, t, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorspace::ColorSpace;
    use crate::display::{Display, View};
    use crate::look::Look;
    use crate::transform::MatrixTransform;

    #[test]
    fn dangling_role_rejected() {
        let mut config = Config::new();
        config.add_colorspace(ColorSpace::new("lin"));
        config.set_role("scene_linear", "missing");
        assert!(matches!(check(&config), Err(EngineError::Invalid(_))));
    }

    #[test]
    fn dangling_view_space_rejected() {
        let mut config = Config::new();
        config.add_colorspace(ColorSpace::new("lin"));
        let mut d = Display::new("sRGB");
        d.add_view(View::new("Film", "missing"));
        config.add_display(d);
        assert!(matches!(check(&config), Err(EngineError::UnknownName { .. })));
    }

    #[test]
    fn view_look_must_exist() {
        let mut config = Config::new();
        config.add_colorspace(ColorSpace::new("lin"));
        let mut d = Display::new("sRGB");
        d.add_view(View::new("Film", "lin").with_looks("grade"));
        config.add_display(d);
        assert!(matches!(
            check(&config),
            Err(EngineError::UnknownName { kind: "look", .. })
        ));

        config.add_look(Look::new("grade", "lin"));
        assert!(check(&config).is_ok());
    }

    #[test]
    fn two_space_cycle_rejected() {
        let mut config = Config::new();
        config.add_colorspace(
            ColorSpace::new("a").with_to_reference(Transform::colorspace("b", "b")),
        );
        config.add_colorspace(
            ColorSpace::new("b").with_to_reference(Transform::colorspace("a", "a")),
        );
        assert!(matches!(check(&config), Err(EngineError::Cycle(_))));
    }

    #[test]
    fn self_reference_rejected() {
        let mut config = Config::new();
        config.add_colorspace(
            ColorSpace::new("a").with_from_reference(Transform::colorspace("a", "a")),
        );
        assert!(matches!(check(&config), Err(EngineError::Cycle(_))));
    }

    #[test]
    fn acyclic_chain_passes() {
        let mut config = Config::new();
        config.add_colorspace(ColorSpace::new("ref"));
        config.add_colorspace(
            ColorSpace::new("mid")
                .with_to_reference(Transform::matrix(MatrixTransform::IDENTITY)),
        );
        config.add_colorspace(
            ColorSpace::new("leaf").with_to_reference(Transform::colorspace("mid", "ref")),
        );
        assert!(check(&config).is_ok());
    }
}
