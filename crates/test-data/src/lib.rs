//! Synthetic runs and GPX fixtures for exercising the tracker.
//!
//! Runs are generated from a route pattern, a runner profile and a noise
//! terrain, or loaded from GPX, and then replayed through a
//! [`TrackerHandle`](tracker::actor::TrackerHandle).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rand::{SeedableRng, rngs::StdRng};
//! use test_data::prelude::*;
//! use tracker::prelude::*;
//!
//! let mut rng = StdRng::seed_from_u64(12345);
//! let fixes = RunGenerator::new(12345)
//!     .with_pattern(RoutePattern::Loop)
//!     .with_distance(5000.0)
//!     .generate(&RunnerProfile::tempo(), &mut rng);
//!
//! let (handle, _task) = spawn_tracker(&TrackerConfig::default(), Arc::new(OfflineBackend::new()));
//! let run = replay_fixes(&handle, &fixes).await?;
//! ```

pub mod config;
pub mod profiles;
pub mod replay;
pub mod sources;
pub mod terrain;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::config::{BoundingBox, Region, ReplayConfig, RoutePattern};
    pub use crate::profiles::{AthleteProfile, RunnerProfile, sample_variance, speed_at_grade};
    pub use crate::replay::replay_fixes;
    pub use crate::sources::{GpxLoadError, GpxLoader, RunConfig, RunGenerator};
    pub use crate::terrain::ElevationGenerator;
}
