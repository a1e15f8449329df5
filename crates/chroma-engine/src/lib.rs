//! # chroma-engine
//!
//! The color-management engine: configs tie named color spaces, roles,
//! looks and displays together; transforms describe conversions between
//! them declaratively; the compiler lowers a transform against a config
//! into a [`Processor`], the optimized executable form.
//!
//! # Modules
//!
//! - [`config`] - the owning config document and name resolution
//! - [`transform`] - declarative transform nodes
//! - [`processor`] - compiled processors and image application
//! - [`context`] - `$VAR` substitution and search-path file lookup
//! - [`loader`] - pluggable LUT file readers with a parse cache
//! - [`cache`] - processor caching, in memory and on disk
//!
//! # Example
//!
//! ```rust
//! use chroma_engine::{ColorSpace, Config, Direction, LogTransform, Transform};
//!
//! let mut config = Config::new();
//! config.add_colorspace(ColorSpace::new("lin"));
//! config.add_colorspace(ColorSpace::new("log").with_to_reference(
//!     Transform::Log(LogTransform {
//!         base: 10.0,
//!         direction: Direction::Inverse,
//!     }),
//! ));
//!
//! let processor = config.processor("lin", "log").unwrap();
//! let mut px = [100.0f32, 1.0, 0.1, 1.0];
//! processor.apply_rgba(&mut px);
//! assert!((px[0] - 2.0).abs() < 1e-5);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod builder;
pub mod cache;
mod colorspace;
pub mod config;
pub mod context;
mod display;
mod error;
pub mod loader;
mod look;
pub mod processor;
pub mod role;
pub mod transform;
mod validate;

pub use cache::{
    clear_all_caches, current_config, load_processor, processor_cache, save_processor,
    set_current_config, ProcessorCache,
};
pub use colorspace::ColorSpace;
pub use config::{Config, DEFAULT_LUMA};
pub use context::{Context, EnvMode};
pub use display::{Display, View};
pub use error::{EngineError, EngineResult};
pub use loader::{FileStamp, LutLoader, LutReader};
pub use look::{parse_looks, Look};
pub use processor::Processor;
pub use role::Roles;
pub use transform::*;

pub use chroma_lut::Interpolation;
pub use chroma_ops::{DynamicHandle, DynamicPropertyKind, Op, OpKind};
