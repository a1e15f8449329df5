//! Processor caching.
//!
//! Three layers: the process-wide current-config slot, an in-memory
//! processor cache keyed by conversion endpoints and the context, and a
//! YAML persistence format holding a processor's op list as
//! self-contained transform nodes.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use crate::config::Config;
use crate::context::{Context, EnvMode};
use crate::error::EngineResult;
use crate::loader::{self, LutLoader};
use crate::processor::Processor;
use crate::transform::{Direction, Transform};

/// Key of one compiled conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    src: String,
    dst: String,
    context_id: u64,
}

/// In-memory cache of compiled processors.
///
/// The context's cache ID is part of the key, so two contexts with
/// different variable bindings never share a processor even when the
/// endpoint names match.
#[derive(Default)]
pub struct ProcessorCache {
    entries: RwLock<HashMap<CacheKey, Arc<Processor>>>,
}

impl ProcessorCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached processor for `src -> dst`, compiling on a
    /// miss.
    pub fn get_or_create(
        &self,
        config: &Config,
        src: &str,
        dst: &str,
    ) -> EngineResult<Arc<Processor>> {
        let key = CacheKey {
            src: src.to_string(),
            dst: dst.to_string(),
            context_id: config.context().cache_id(),
        };

        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(p) = entries.get(&key) {
                return Ok(Arc::clone(p));
            }
        }

        let processor = Arc::new(config.processor(src, dst)?);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(
            entries.entry(key).or_insert(processor),
        ))
    }

    /// Number of cached processors.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached processor.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// The process-wide processor cache.
pub fn processor_cache() -> &'static ProcessorCache {
    static CACHE: OnceLock<ProcessorCache> = OnceLock::new();
    CACHE.get_or_init(ProcessorCache::new)
}

fn current_slot() -> &'static Mutex<Option<Arc<Config>>> {
    static CURRENT: OnceLock<Mutex<Option<Arc<Config>>>> = OnceLock::new();
    CURRENT.get_or_init(|| Mutex::new(None))
}

/// The config most recently installed with [`set_current_config`].
pub fn current_config() -> Option<Arc<Config>> {
    current_slot()
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// Installs the process-wide current config.
pub fn set_current_config(config: Arc<Config>) {
    *current_slot().lock().unwrap_or_else(|e| e.into_inner()) = Some(config);
}

/// Drops the processor cache and every parsed LUT file.
///
/// Dynamic handles already handed out stay valid; only future compiles
/// are affected.
pub fn clear_all_caches() {
    processor_cache().clear();
    loader::global().clear_cache();
}

/// Writes a processor's op list to `path` as YAML transform nodes.
pub fn save_processor(path: &Path, processor: &Processor) -> EngineResult<()> {
    let text = serde_yaml::to_string(&processor.to_transforms())?;
    fs::write(path, text)?;
    Ok(())
}

/// Rebuilds a processor from a file written by [`save_processor`].
///
/// The stored nodes are self-contained, so no config, context or LUT
/// file is consulted.
pub fn load_processor(path: &Path) -> EngineResult<Processor> {
    let text = fs::read_to_string(path)?;
    let transforms: Vec<Transform> = serde_yaml::from_str(&text)?;
    let config = Config::new();
    let context = Context::new(EnvMode::None);
    let loader = LutLoader::new();
    Processor::compile_with(
        &loader,
        &config,
        &context,
        &Transform::group(transforms),
        Direction::Forward,
    )
}
