//! Tracking task that owns the session.
//!
//! All mutation happens on one tokio task; the UI side talks to it through a
//! cloneable [`TrackerHandle`]. Commands are handled strictly in arrival
//! order, so fixes sent while a start or finish call is in flight wait for
//! it to complete.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    backend::SessionBackend,
    config::TrackerConfig,
    errors::TrackerError,
    models::{FinishedRun, Fix, RunningSessionState, SessionId},
    session::{RunningSession, SessionPhase, acquire_badges, upload_location},
};

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Start(Reply<Result<SessionId, TrackerError>>),
    BeginTracking(OffsetDateTime, Reply<bool>),
    Cancel(Reply<bool>),
    Record(Fix),
    Finish(OffsetDateTime, Reply<Result<Option<FinishedRun>, TrackerError>>),
    Snapshot(Reply<TrackerSnapshot>),
    Shutdown,
}

/// Point-in-time copy of the tracker for display.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSnapshot {
    pub phase: SessionPhase,
    pub state: RunningSessionState,
}

#[derive(Debug, Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<Command>,
}

/// Spawns the tracking task on the current runtime.
///
/// The join handle resolves to the final session once every handle is
/// dropped or [`TrackerHandle::shutdown`] is called.
pub fn spawn_tracker(
    config: &TrackerConfig,
    backend: Arc<dyn SessionBackend>,
) -> (TrackerHandle, JoinHandle<RunningSession>) {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
    let actor = TrackerActor {
        session: RunningSession::new(config),
        backend,
        upload_locations: config.upload_locations,
        rx,
    };
    (TrackerHandle { tx }, tokio::spawn(actor.run()))
}

impl TrackerHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, TrackerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| TrackerError::TrackerStopped)?;
        rx.await.map_err(|_| TrackerError::TrackerStopped)
    }

    pub async fn start(&self) -> Result<SessionId, TrackerError> {
        self.request(Command::Start).await?
    }

    /// Signals the end of the countdown.
    pub async fn begin_tracking(&self) -> Result<bool, TrackerError> {
        self.request(|reply| Command::BeginTracking(OffsetDateTime::now_utc(), reply))
            .await
    }

    pub async fn cancel(&self) -> Result<bool, TrackerError> {
        self.request(Command::Cancel).await
    }

    pub async fn record(&self, fix: Fix) -> Result<(), TrackerError> {
        self.tx
            .send(Command::Record(fix))
            .await
            .map_err(|_| TrackerError::TrackerStopped)
    }

    pub async fn record_location(&self, latitude: f64, longitude: f64) -> Result<(), TrackerError> {
        self.record(Fix::new(latitude, longitude)).await
    }

    /// Non-blocking variant for synchronous location callbacks.
    ///
    /// A fix that does not fit in the command buffer is dropped.
    pub fn try_record(&self, fix: Fix) -> Result<(), TrackerError> {
        match self.tx.try_send(Command::Record(fix)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Tracker busy, dropping fix");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(TrackerError::TrackerStopped),
        }
    }

    pub async fn finish(&self) -> Result<Option<FinishedRun>, TrackerError> {
        self.request(|reply| Command::Finish(OffsetDateTime::now_utc(), reply))
            .await?
    }

    /// Like [`finish`](Self::finish) with an explicit end time.
    pub async fn finish_at(&self, at: OffsetDateTime) -> Result<Option<FinishedRun>, TrackerError> {
        self.request(|reply| Command::Finish(at, reply)).await?
    }

    /// Like [`begin_tracking`](Self::begin_tracking) with an explicit start time.
    pub async fn begin_tracking_at(&self, at: OffsetDateTime) -> Result<bool, TrackerError> {
        self.request(|reply| Command::BeginTracking(at, reply)).await
    }

    pub async fn snapshot(&self) -> Result<TrackerSnapshot, TrackerError> {
        self.request(Command::Snapshot).await
    }

    pub async fn shutdown(&self) -> Result<(), TrackerError> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| TrackerError::TrackerStopped)
    }
}

struct TrackerActor {
    session: RunningSession,
    backend: Arc<dyn SessionBackend>,
    upload_locations: bool,
    rx: mpsc::Receiver<Command>,
}

impl TrackerActor {
    async fn run(mut self) -> RunningSession {
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Start(reply) => {
                    let result = self.session.start(self.backend.as_ref()).await;
                    let _ = reply.send(result);
                }
                Command::BeginTracking(at, reply) => {
                    let _ = reply.send(self.session.begin_tracking(at));
                }
                Command::Cancel(reply) => {
                    let _ = reply.send(self.session.cancel());
                }
                Command::Record(fix) => self.record(fix),
                Command::Finish(at, reply) => {
                    let result = self.session.finish(self.backend.as_ref(), at).await;
                    if let Ok(Some(run)) = &result {
                        self.spawn_badge_request(run.session_id.clone());
                    }
                    let _ = reply.send(result);
                }
                Command::Snapshot(reply) => {
                    let _ = reply.send(TrackerSnapshot {
                        phase: self.session.phase().clone(),
                        state: self.session.state().clone(),
                    });
                }
                Command::Shutdown => {
                    info!("Tracker shutting down");
                    break;
                }
            }
        }
        debug!("Tracker loop ended in phase {}", self.session.phase().name());
        self.session
    }

    fn record(&mut self, fix: Fix) {
        if let Some(point) = self.session.on_new_fix(fix)
            && self.upload_locations
            && let Some(session_id) = self.session.session_id().cloned()
        {
            let backend = self.backend.clone();
            tokio::spawn(async move {
                upload_location(backend.as_ref(), &session_id, &point).await;
            });
        }
    }

    fn spawn_badge_request(&self, session_id: SessionId) {
        let backend = self.backend.clone();
        tokio::spawn(async move {
            acquire_badges(backend.as_ref(), &session_id).await;
        });
    }
}
