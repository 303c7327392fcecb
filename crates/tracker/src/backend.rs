//! Remote session backend and the failure policy of each call site.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    errors::ApiError,
    models::{CourseUpload, LocationPoint, RunningStats, SessionId},
};

/// Calls the tracker makes against the session backend.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Creates a session and returns its backend-issued id.
    async fn start_session(&self) -> Result<SessionId, ApiError>;

    async fn upload_location(
        &self,
        session_id: &SessionId,
        point: &LocationPoint,
    ) -> Result<(), ApiError>;

    /// Submits final stats. Returns the backend's result payload as-is.
    async fn submit_stats(
        &self,
        session_id: &SessionId,
        stats: &RunningStats,
    ) -> Result<Value, ApiError>;

    async fn acquire_badges(&self, session_id: &SessionId) -> Result<(), ApiError>;

    /// Shares a course and returns its id.
    async fn upload_course(&self, course: &CourseUpload) -> Result<String, ApiError>;
}

/// What a call site does with a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return the error to the caller.
    Surface,
    /// Log a warning and record a user-facing message; carry on.
    Report,
    /// Log at debug level and drop the error.
    Silent,
}

pub const START_SESSION_POLICY: FailurePolicy = FailurePolicy::Surface;
pub const SUBMIT_STATS_POLICY: FailurePolicy = FailurePolicy::Report;
pub const LOCATION_UPLOAD_POLICY: FailurePolicy = FailurePolicy::Silent;
pub const BADGE_POLICY: FailurePolicy = FailurePolicy::Silent;
pub const COURSE_UPLOAD_POLICY: FailurePolicy = FailurePolicy::Surface;

impl FailurePolicy {
    /// Applies the policy to `result`.
    ///
    /// `Surface` passes the result through. The other policies turn an error
    /// into `Ok(None)` after logging it.
    pub fn apply<T>(self, call: &str, result: Result<T, ApiError>) -> Result<Option<T>, ApiError> {
        match (self, result) {
            (_, Ok(value)) => Ok(Some(value)),
            (FailurePolicy::Surface, Err(e)) => Err(e),
            (FailurePolicy::Report, Err(e)) => {
                warn!("{call} failed: {e}");
                Ok(None)
            }
            (FailurePolicy::Silent, Err(e)) => {
                debug!("{call} failed, ignoring: {e}");
                Ok(None)
            }
        }
    }
}
