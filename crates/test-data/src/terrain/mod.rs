//! Terrain for synthetic runs.

mod elevation;

pub use elevation::{ElevationGenerator, elevation_jitter};
