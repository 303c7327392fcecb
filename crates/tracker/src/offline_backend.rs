//! In-process backend for offline runs and tests.

use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    backend::SessionBackend,
    errors::ApiError,
    metrics::{format_duration, format_pace},
    models::{CourseUpload, LocationPoint, RunningStats, SessionId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCall {
    StartSession,
    UploadLocation,
    SubmitStats,
    AcquireBadges,
    UploadCourse,
}

/// Everything the offline backend has been sent.
#[derive(Debug, Clone, Default)]
pub struct OfflineRecord {
    pub sessions: Vec<SessionId>,
    pub locations: Vec<(SessionId, LocationPoint)>,
    pub submissions: Vec<(SessionId, RunningStats)>,
    pub badge_requests: Vec<SessionId>,
    pub courses: Vec<CourseUpload>,
}

#[derive(Debug, Default)]
struct OfflineState {
    record: OfflineRecord,
    failing: HashSet<BackendCall>,
    echo: Option<Value>,
}

/// Issues UUID session ids and echoes submitted stats back in the
/// backend's current field layout.
#[derive(Debug, Default)]
pub struct OfflineBackend {
    state: Mutex<OfflineState>,
}

impl OfflineBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `call` fail with [`ApiError::Rejected`].
    pub fn fail_on(self, call: BackendCall) -> Self {
        self.lock().failing.insert(call);
        self
    }

    /// Replaces the stats echo with a fixed payload.
    pub fn with_echo(self, echo: Value) -> Self {
        self.lock().echo = Some(echo);
        self
    }

    pub fn record(&self) -> OfflineRecord {
        self.lock().record.clone()
    }

    fn lock(&self) -> MutexGuard<'_, OfflineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, call: BackendCall) -> Result<MutexGuard<'_, OfflineState>, ApiError> {
        let state = self.lock();
        if state.failing.contains(&call) {
            return Err(ApiError::Rejected(format!("{call:?} is failing offline")));
        }
        Ok(state)
    }
}

fn echo_for(stats: &RunningStats) -> Value {
    json!({
        "distance": stats.distance_km,
        "duration": format_duration(stats.duration_sec),
        "pace": format_pace(stats.pace_sec_per_km),
        "calories": stats.calories,
        "elevationGain": stats.elevation_gain_m,
        "avgHeartRate": stats.avg_heart_rate,
        "cadence": stats.cadence,
    })
}

#[async_trait]
impl SessionBackend for OfflineBackend {
    async fn start_session(&self) -> Result<SessionId, ApiError> {
        let mut state = self.check(BackendCall::StartSession)?;
        let id = SessionId::new(Uuid::new_v4().to_string());
        state.record.sessions.push(id.clone());
        Ok(id)
    }

    async fn upload_location(
        &self,
        session_id: &SessionId,
        point: &LocationPoint,
    ) -> Result<(), ApiError> {
        let mut state = self.check(BackendCall::UploadLocation)?;
        state
            .record
            .locations
            .push((session_id.clone(), point.clone()));
        Ok(())
    }

    async fn submit_stats(
        &self,
        session_id: &SessionId,
        stats: &RunningStats,
    ) -> Result<Value, ApiError> {
        let mut state = self.check(BackendCall::SubmitStats)?;
        state.record.submissions.push((session_id.clone(), *stats));
        Ok(state.echo.clone().unwrap_or_else(|| echo_for(stats)))
    }

    async fn acquire_badges(&self, session_id: &SessionId) -> Result<(), ApiError> {
        let mut state = self.check(BackendCall::AcquireBadges)?;
        state.record.badge_requests.push(session_id.clone());
        Ok(())
    }

    async fn upload_course(&self, course: &CourseUpload) -> Result<String, ApiError> {
        let mut state = self.check(BackendCall::UploadCourse)?;
        state.record.courses.push(course.clone());
        Ok(format!("course-{}", state.record.courses.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::resolve_stats;

    #[tokio::test]
    async fn test_issues_distinct_sessions() {
        let backend = OfflineBackend::new();
        let a = backend.start_session().await.unwrap();
        let b = backend.start_session().await.unwrap();

        assert_ne!(a, b);
        assert_eq!(backend.record().sessions, vec![a, b]);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = OfflineBackend::new().fail_on(BackendCall::SubmitStats);
        let id = backend.start_session().await.unwrap();

        let result = backend.submit_stats(&id, &RunningStats::default()).await;
        assert!(matches!(result, Err(ApiError::Rejected(_))));
        assert!(backend.record().submissions.is_empty());
    }

    #[tokio::test]
    async fn test_echo_resolves_to_submitted_stats() {
        let backend = OfflineBackend::new();
        let id = backend.start_session().await.unwrap();
        let stats = RunningStats {
            distance_km: 5.0,
            duration_sec: 1800,
            pace_sec_per_km: 360,
            calories: 320.0,
            avg_heart_rate: 150,
            elevation_gain_m: 12.0,
            cadence: 170,
        };

        let echo = backend.submit_stats(&id, &stats).await.unwrap();
        assert_eq!(resolve_stats(&echo), stats);
    }
}
