//! Session lifecycle: `Idle -> Started -> ActiveTracking -> Finished`.
//!
//! Transitions that make no sense in the current phase are silent no-ops.
//! Remote failures follow the [`FailurePolicy`](crate::backend::FailurePolicy)
//! constant of their call site.

use time::OffsetDateTime;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::{
    accumulator::LocationAccumulator,
    backend::{
        BADGE_POLICY, COURSE_UPLOAD_POLICY, LOCATION_UPLOAD_POLICY, START_SESSION_POLICY,
        SUBMIT_STATS_POLICY, SessionBackend,
    },
    config::TrackerConfig,
    errors::{ApiError, TrackerError},
    gpx_export::course_upload,
    metrics::{local_stats, resolve_with_local},
    models::{
        FinishedRun, Fix, LocationPoint, RunId, RunningSessionState, RunningStats, SessionId,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    Idle,
    Started {
        session_id: SessionId,
        run_id: RunId,
    },
    ActiveTracking {
        session_id: SessionId,
        run_id: RunId,
        started_at: OffsetDateTime,
    },
    Finished {
        session_id: SessionId,
        run_id: RunId,
        stats: RunningStats,
    },
}

impl SessionPhase {
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            SessionPhase::Idle => None,
            SessionPhase::Started { session_id, .. }
            | SessionPhase::ActiveTracking { session_id, .. }
            | SessionPhase::Finished { session_id, .. } => Some(session_id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Started { .. } => "started",
            SessionPhase::ActiveTracking { .. } => "tracking",
            SessionPhase::Finished { .. } => "finished",
        }
    }
}

/// One runner's session: lifecycle phase plus the location accumulator.
#[derive(Debug, Clone)]
pub struct RunningSession {
    phase: SessionPhase,
    accumulator: LocationAccumulator,
    body_weight_kg: f64,
}

impl RunningSession {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            phase: SessionPhase::Idle,
            accumulator: LocationAccumulator::new(),
            body_weight_kg: config.body_weight_kg,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn state(&self) -> &RunningSessionState {
        self.accumulator.state()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.phase.session_id()
    }

    /// Opens a new session on the backend.
    ///
    /// A previous result is discarded only once the backend has issued the
    /// new session; on failure the phase is unchanged and the error is
    /// returned. While a session is already open this returns its id
    /// without calling the backend.
    pub async fn start(&mut self, backend: &dyn SessionBackend) -> Result<SessionId, TrackerError> {
        if let SessionPhase::Started { session_id, .. }
        | SessionPhase::ActiveTracking { session_id, .. } = &self.phase
        {
            debug!("Session {session_id} already open, ignoring start");
            return Ok(session_id.clone());
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("session", %run_id);
        let result = backend.start_session().instrument(span.clone()).await;
        let session_id = START_SESSION_POLICY
            .apply("Session start", result)?
            .ok_or(ApiError::MissingField("sessionId"))?;

        span.in_scope(|| info!("Session {session_id} started"));
        self.accumulator.reset();
        self.phase = SessionPhase::Started {
            session_id: session_id.clone(),
            run_id,
        };
        Ok(session_id)
    }

    /// Countdown finished: begin accumulating fixes. Local only.
    ///
    /// Returns `false` unless the session was `Started`.
    pub fn begin_tracking(&mut self, now: OffsetDateTime) -> bool {
        let SessionPhase::Started { session_id, run_id } = &self.phase else {
            debug!("Ignoring begin_tracking in phase {}", self.phase.name());
            return false;
        };

        self.phase = SessionPhase::ActiveTracking {
            session_id: session_id.clone(),
            run_id: *run_id,
            started_at: now,
        };
        self.accumulator.start();
        true
    }

    /// Abandons a session that never began tracking.
    pub fn cancel(&mut self) -> bool {
        if !matches!(self.phase, SessionPhase::Started { .. }) {
            return false;
        }
        self.phase = SessionPhase::Idle;
        self.accumulator.reset();
        true
    }

    pub fn on_new_location(&mut self, latitude: f64, longitude: f64) -> Option<LocationPoint> {
        self.accumulator.on_new_location(latitude, longitude).cloned()
    }

    /// Records a fix; ignored unless tracking. Returns the recorded point.
    pub fn on_new_fix(&mut self, fix: Fix) -> Option<LocationPoint> {
        self.accumulator.on_new_fix(fix).cloned()
    }

    /// Stops tracking and submits the run.
    ///
    /// Accumulation stops before any remote call, and the session ends up
    /// `Finished` whether or not the backend accepts the stats. Returns
    /// `None` when no session is being tracked.
    pub async fn finish(
        &mut self,
        backend: &dyn SessionBackend,
        now: OffsetDateTime,
    ) -> Result<Option<FinishedRun>, TrackerError> {
        let SessionPhase::ActiveTracking {
            session_id,
            run_id,
            started_at,
        } = &self.phase
        else {
            debug!("Ignoring finish in phase {}", self.phase.name());
            return Ok(None);
        };
        let (session_id, run_id) = (session_id.clone(), *run_id);

        let local = local_stats(
            self.accumulator.state(),
            now - *started_at,
            self.body_weight_kg,
        );
        let path = self.accumulator.stop();
        self.phase = SessionPhase::Finished {
            session_id: session_id.clone(),
            run_id,
            stats: local,
        };

        let span = info_span!("session", %run_id);
        span.in_scope(|| {
            info!(
                "Session {session_id} stopped: {:.3} km, {} s, {} points",
                local.distance_km,
                local.duration_sec,
                path.len()
            )
        });

        let result = backend
            .submit_stats(&session_id, &local)
            .instrument(span)
            .await;
        let submit_error = result.as_ref().err().map(|e| e.user_message().to_string());
        let echo = SUBMIT_STATS_POLICY.apply("Stats submission", result)?;

        let stats = echo
            .as_ref()
            .map_or(local, |raw| resolve_with_local(raw, &local));
        self.phase = SessionPhase::Finished {
            session_id: session_id.clone(),
            run_id,
            stats,
        };

        Ok(Some(FinishedRun {
            session_id,
            run_id,
            stats,
            path,
            submitted: echo.is_some(),
            submit_error,
        }))
    }
}

/// Uploads one fix. Failures are dropped.
pub async fn upload_location(
    backend: &dyn SessionBackend,
    session_id: &SessionId,
    point: &LocationPoint,
) {
    let result = backend.upload_location(session_id, point).await;
    let _ = LOCATION_UPLOAD_POLICY.apply("Location upload", result);
}

/// Requests badges earned by a finished session. Failures are dropped.
pub async fn acquire_badges(backend: &dyn SessionBackend, session_id: &SessionId) {
    let result = backend.acquire_badges(session_id).await;
    let _ = BADGE_POLICY.apply("Badge acquisition", result);
}

/// Shares a recorded path as a course and returns the course id.
pub async fn share_course(
    backend: &dyn SessionBackend,
    name: &str,
    points: &[LocationPoint],
) -> Result<String, TrackerError> {
    let course = course_upload(name, points)?;
    let result = backend.upload_course(&course).await;
    let id = COURSE_UPLOAD_POLICY
        .apply("Course upload", result)?
        .ok_or(ApiError::MissingField("courseId"))?;
    info!("Shared course {id} ({:.2} km)", course.distance_km);
    Ok(id)
}
