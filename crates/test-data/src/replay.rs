//! Driving the tracker with a prepared sequence of fixes.

use time::OffsetDateTime;
use tracing::{debug, info};
use tracker::actor::TrackerHandle;
use tracker::errors::TrackerError;
use tracker::models::{FinishedRun, Fix};

/// Runs one full session: start, countdown, every fix in order, finish.
///
/// Tracking begins at the first fix's timestamp and finishes at the last
/// one, falling back to the wall clock for untimed fixes. Returns `None`
/// if the session was not in a state that could finish.
pub async fn replay_fixes(
    handle: &TrackerHandle,
    fixes: &[Fix],
) -> Result<Option<FinishedRun>, TrackerError> {
    let session_id = handle.start().await?;
    info!(%session_id, fixes = fixes.len(), "Replaying run");

    let began_at = fixes
        .first()
        .and_then(|fix| fix.timestamp)
        .unwrap_or_else(OffsetDateTime::now_utc);
    handle.begin_tracking_at(began_at).await?;

    for fix in fixes {
        handle.record(*fix).await?;
    }

    let finished_at = fixes
        .last()
        .and_then(|fix| fix.timestamp)
        .unwrap_or_else(OffsetDateTime::now_utc);
    let run = handle.finish_at(finished_at).await?;
    debug!(finished = run.is_some(), "Replay complete");
    Ok(run)
}
