//! Running session tracking for the Runner's High client.
//!
//! GPS fixes are accumulated into a path with a running great-circle
//! distance; finishing a session derives [`RunningStats`](models::RunningStats)
//! from the local path and the backend's (loosely typed) result payload, and
//! the path can be exported as GPX for course sharing.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tracker::prelude::*;
//!
//! let config = TrackerConfig::from_env();
//! let (handle, _task) = spawn_tracker(&config, Arc::new(OfflineBackend::new()));
//!
//! handle.start().await?;
//! handle.begin_tracking().await?;
//! handle.record_location(37.5665, 126.9780).await?;
//! let run = handle.finish().await?;
//! ```

pub mod accumulator;
pub mod actor;
pub mod backend;
pub mod config;
pub mod errors;
pub mod gpx_export;
pub mod http_backend;
pub mod metrics;
pub mod models;
pub mod offline_backend;
pub mod session;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::accumulator::{LocationAccumulator, distance_between, path_distance};
    pub use crate::actor::{TrackerHandle, TrackerSnapshot, spawn_tracker};
    pub use crate::backend::{FailurePolicy, SessionBackend};
    pub use crate::config::TrackerConfig;
    pub use crate::errors::{ApiError, TrackerError};
    pub use crate::gpx_export::{encode_to_base64, now_as_iso8601_utc, to_gpx_xml};
    pub use crate::http_backend::HttpBackend;
    pub use crate::metrics::{parse_duration, parse_pace, resolve_stats, resolve_with_local};
    pub use crate::models::{
        CourseUpload, FinishedRun, Fix, LocationPoint, RunningSessionState, RunningStats,
        SessionId,
    };
    pub use crate::offline_backend::OfflineBackend;
    pub use crate::session::{RunningSession, SessionPhase, share_course};
}
