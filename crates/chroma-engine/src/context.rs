//! Context variables and file resolution.
//!
//! File transforms may reference `$SHOT`-style variables; the context
//! holds the bindings and resolves them, recursively, before the search
//! path is walked. Two contexts with identical bindings produce the same
//! cache ID, which is what keys per-context processor caching.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use chroma_ops::ContentHasher;

use crate::error::{EngineError, EngineResult};

/// Substitution depth limit before a cycle is reported.
const MAX_HOPS: usize = 32;

/// How the context seeds itself from the process environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvMode {
    /// Load every environment variable.
    #[default]
    All,
    /// Only variables the config predeclares, with env values overriding
    /// declared defaults.
    PredefinedOnly,
    /// Ignore the environment entirely.
    None,
}

/// Variable bindings for path resolution.
///
/// Bindings live in a sorted map so iteration, equality and the cache ID
/// are all independent of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    vars: BTreeMap<String, String>,
    mode: EnvMode,
}

impl Context {
    /// Creates a context seeded per `mode`.
    pub fn new(mode: EnvMode) -> Self {
        let mut ctx = Self {
            vars: BTreeMap::new(),
            mode,
        };
        if mode == EnvMode::All {
            for (k, v) in env::vars() {
                ctx.vars.insert(k, v);
            }
        }
        ctx
    }

    /// Declares a variable with a default, letting the environment
    /// override it under [`EnvMode::PredefinedOnly`] or [`EnvMode::All`].
    pub fn declare(&mut self, name: impl Into<String>, default: impl Into<String>) {
        let name = name.into();
        let value = match self.mode {
            EnvMode::None => default.into(),
            EnvMode::All | EnvMode::PredefinedOnly => {
                env::var(&name).unwrap_or_else(|_| default.into())
            }
        };
        self.vars.insert(name, value);
    }

    /// Sets a variable, shadowing any environment value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// A variable's current binding.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// All bindings in sorted order.
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Resolves `$name` and `${name}` references, recursively.
    ///
    /// Unknown variables stay in place verbatim. Substitution chains
    /// longer than 32 hops report a cycle.
    pub fn resolve(&self, input: &str) -> EngineResult<String> {
        let mut current = input.to_string();
        for _ in 0..MAX_HOPS {
            let next = self.substitute(&current);
            if next == current {
                return Ok(current);
            }
            current = next;
        }
        Err(EngineError::Cycle(format!(
            "context substitution did not settle after {MAX_HOPS} hops: '{input}'"
        )))
    }

    /// One substitution pass over `input`.
    fn substitute(&self, input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            if chars.peek() == Some(&'{') {
                chars.next();
                let name: String = chars.by_ref().take_while(|&c| c != '}').collect();
                match self.get(&name) {
                    Some(value) => result.push_str(value),
                    None => {
                        result.push_str("${");
                        result.push_str(&name);
                        result.push('}');
                    }
                }
            } else {
                let mut name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    result.push('$');
                } else {
                    match self.get(&name) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push('$');
                            result.push_str(&name);
                        }
                    }
                }
            }
        }

        result
    }

    /// Resolves variables in `name`, then finds it on the search path.
    ///
    /// Absolute resolved names are checked directly. Relative names are
    /// tried against each colon-separated entry of `search_path` (itself
    /// variable-resolved, relative entries anchored at `working_dir`),
    /// then against `working_dir`. The first existing match wins.
    pub fn resolve_file(
        &self,
        name: &str,
        search_path: &str,
        working_dir: &Path,
    ) -> EngineResult<PathBuf> {
        let resolved = self.resolve(name)?;
        let candidate = Path::new(&resolved);
        if candidate.is_absolute() {
            if candidate.is_file() {
                return Ok(candidate.to_path_buf());
            }
            return Err(EngineError::MissingFile { name: resolved });
        }

        let search_path = self.resolve(search_path)?;
        for entry in search_path.split(':').filter(|e| !e.is_empty()) {
            let dir = Path::new(entry);
            let full = if dir.is_absolute() {
                dir.join(candidate)
            } else {
                working_dir.join(dir).join(candidate)
            };
            if full.is_file() {
                return Ok(full);
            }
        }

        let fallback = working_dir.join(candidate);
        if fallback.is_file() {
            return Ok(fallback);
        }
        Err(EngineError::MissingFile { name: resolved })
    }

    /// Stable hash over the sorted bindings.
    pub fn cache_id(&self) -> u64 {
        let mut h = ContentHasher::new();
        for (k, v) in &self.vars {
            h.update_u64(k.len() as u64);
            for b in k.bytes() {
                h.update_u8(b);
            }
            h.update_u64(v.len() as u64);
            for b in v.bytes() {
                h.update_u8(b);
            }
        }
        h.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ctx() -> Context {
        Context::new(EnvMode::None)
    }

    #[test]
    fn resolve_plain_and_braced() {
        let mut c = ctx();
        c.set("SHOT", "sh010");
        c.set("SEQ", "sq01");
        assert_eq!(c.resolve("/x/$SHOT/y").unwrap(), "/x/sh010/y");
        assert_eq!(c.resolve("${SEQ}_${SHOT}").unwrap(), "sq01_sh010");
    }

    #[test]
    fn resolve_recursive() {
        let mut c = ctx();
        c.set("A", "$B/tail");
        c.set("B", "head");
        assert_eq!(c.resolve("$A").unwrap(), "head/tail");
    }

    #[test]
    fn unknown_left_verbatim() {
        let c = ctx();
        assert_eq!(c.resolve("$NOPE and ${NOPE}").unwrap(), "$NOPE and ${NOPE}");
        assert_eq!(c.resolve("trailing$").unwrap(), "trailing$");
    }

    #[test]
    fn substitution_cycle_detected() {
        let mut c = ctx();
        c.set("A", "$B");
        c.set("B", "$A");
        assert!(matches!(c.resolve("$A"), Err(EngineError::Cycle(_))));
    }

    #[test]
    fn cache_id_order_independent() {
        let mut a = ctx();
        a.set("X", "1");
        a.set("Y", "2");
        let mut b = ctx();
        b.set("Y", "2");
        b.set("X", "1");
        assert_eq!(a.cache_id(), b.cache_id());

        b.set("Y", "3");
        assert_ne!(a.cache_id(), b.cache_id());
    }

    #[test]
    fn file_search_walks_entries() {
        let dir = tempfile::tempdir().unwrap();
        let luts = dir.path().join("luts");
        fs::create_dir(&luts).unwrap();
        fs::write(luts.join("grade.cube"), "# lut").unwrap();

        let mut c = ctx();
        c.set("LUTDIR", "luts");

        let found = c.resolve_file("grade.cube", "missing:$LUTDIR", dir.path()).unwrap();
        assert_eq!(found, luts.join("grade.cube"));

        let err = c.resolve_file("absent.cube", "$LUTDIR", dir.path());
        assert!(matches!(err, Err(EngineError::MissingFile { .. })));
    }
}
