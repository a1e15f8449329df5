//! # chroma-core
//!
//! Core types shared by the chroma color-management engine.
//!
//! This crate provides the foundation the higher layers build on:
//!
//! - [`CoreError`] - unified error type for buffer and parameter failures
//! - [`BitDepth`] - pixel encoding depths and their nominal scales
//! - [`PackedImageDesc`] / [`PlanarImageDesc`] - stride-aware views over
//!   caller-owned pixel buffers
//!
//! # Image descriptors
//!
//! Pixel processing operates on RGBA float scanlines. An image descriptor
//! describes how a caller's buffer is laid out (interleaved or planar,
//! possibly flipped or padded) and gathers/scatters scanlines on demand:
//!
//! ```rust
//! use chroma_core::{ImageDesc, PackedImageDesc};
//!
//! let mut pixels = vec![0.5_f32; 4 * 4 * 3]; // 4x4, RGB
//! let mut desc = PackedImageDesc::new(&mut pixels, 4, 4, 3).unwrap();
//!
//! let mut row = vec![0.0_f32; 4 * 4]; // RGBA scanline
//! desc.read_row(0, &mut row).unwrap();
//! assert_eq!(row[3], 1.0); // missing alpha reads as opaque
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod depth;
mod error;
mod image;
mod pixel;

pub use depth::BitDepth;
pub use error::{CoreError, Result};
pub use image::{AUTO_STRIDE, ImageDesc, PackedImageDesc, PlanarImageDesc};
pub use pixel::{REC709_LUMA, luma};
