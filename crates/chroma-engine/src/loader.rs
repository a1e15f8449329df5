//! LUT file loading.
//!
//! No file-format parser ships in the engine; formats plug in through
//! [`LutReader`] implementations keyed by file extension. Parsed op
//! lists are cached process-wide, keyed by canonical path, mtime, size
//! and the requested interpolation, so repeated compiles of the same
//! config touch each file once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::UNIX_EPOCH;

use chroma_lut::Interpolation;
use chroma_ops::Op;

use crate::error::{EngineError, EngineResult};

/// A pluggable LUT file reader.
///
/// A reader parses one format family and emits the equivalent op
/// sequence, honouring the requested interpolation. Direction is not a
/// reader concern: the compiler inverts the returned ops when the file
/// transform runs inverse.
pub trait LutReader: Send + Sync {
    /// Parses `path` into an op list.
    fn read(&self, path: &Path, interp: Interpolation) -> EngineResult<Vec<Op>>;
}

/// Identity of a file's contents at load time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FileKey {
    path: PathBuf,
    mtime_nanos: u128,
    size: u64,
    interp: Interpolation,
}

/// A loaded file's identity, recorded into processor cache IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    /// Canonical path.
    pub path: PathBuf,
    /// Modification time, nanoseconds since the epoch.
    pub mtime_nanos: u128,
    /// File size in bytes.
    pub size: u64,
}

/// Extension-keyed reader registry with a parsed-file cache.
#[derive(Default)]
pub struct LutLoader {
    readers: RwLock<HashMap<String, Arc<dyn LutReader>>>,
    cache: Mutex<HashMap<FileKey, Vec<Op>>>,
}

impl LutLoader {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reader for an extension (without the dot, any case).
    pub fn register(&self, extension: impl Into<String>, reader: Arc<dyn LutReader>) {
        let ext = extension.into().to_ascii_lowercase();
        self.readers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(ext, reader);
    }

    /// True when some reader claims the extension.
    pub fn recognizes(&self, path: &Path) -> bool {
        self.reader_for(path).is_ok()
    }

    fn reader_for(&self, path: &Path) -> EngineResult<Arc<dyn LutReader>> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        self.readers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&ext)
            .cloned()
            .ok_or_else(|| EngineError::Format {
                path: path.to_path_buf(),
                reason: format!("no reader registered for extension '{ext}'"),
            })
    }

    /// Loads (or retrieves from cache) the ops for a LUT file.
    ///
    /// Returns the ops together with the file stamp the processor folds
    /// into its cache ID.
    pub fn load(
        &self,
        path: &Path,
        interp: Interpolation,
    ) -> EngineResult<(Vec<Op>, FileStamp)> {
        let canonical = path.canonicalize()?;
        let meta = std::fs::metadata(&canonical)?;
        let mtime_nanos = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let stamp = FileStamp {
            path: canonical.clone(),
            mtime_nanos,
            size: meta.len(),
        };
        let key = FileKey {
            path: canonical.clone(),
            mtime_nanos,
            size: meta.len(),
            interp,
        };

        {
            let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(ops) = cache.get(&key) {
                return Ok((ops.clone(), stamp));
            }
        }

        let reader = self.reader_for(&canonical)?;
        let ops = reader.read(&canonical, interp)?;

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(key, ops.clone());
        Ok((ops, stamp))
    }

    /// Drops every cached parse.
    pub fn clear_cache(&self) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Number of cached parses.
    pub fn cached_files(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// The process-wide loader used by [`crate::Config::processor`] paths.
pub fn global() -> &'static LutLoader {
    static GLOBAL: std::sync::OnceLock<LutLoader> = std::sync::OnceLock::new();
    GLOBAL.get_or_init(LutLoader::new)
}
