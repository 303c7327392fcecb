//! Sources of GPS fixes for replay.
//!
//! - [`RunGenerator`]: synthetic runs shaped by a [`RoutePattern`](crate::config::RoutePattern)
//! - [`GpxLoader`]: fixes recorded in existing GPX files

mod gpx_files;
mod procedural;

pub use gpx_files::{GpxLoadError, GpxLoader};
pub use procedural::{RunConfig, RunGenerator};
