//! Replays a synthetic or recorded run through the tracker.
//!
//! Run with:
//! ```
//! REPLAY_DISTANCE_M=10000 REPLAY_GPX_OUT=run.gpx cargo run -p test-data --bin replay
//! ```
//!
//! Talks to the backend at `RUNNERS_HIGH_BACKEND_URL`, or the `BACKEND_PORT`
//! from a `.dev-ports` file in the working directory, otherwise runs against
//! the in-memory backend.

use std::sync::Arc;

use anyhow::Context;
use rand::{SeedableRng, rngs::StdRng};
use test_data::prelude::*;
use tracing_subscriber::EnvFilter;
use tracker::metrics::{format_duration, format_pace};
use tracker::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let replay = ReplayConfig::from_env();
    let tracker_config = TrackerConfig::from_env().or_dev_ports(".");

    let fixes = match &replay.gpx_in {
        Some(path) => GpxLoader::load_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            let mut rng = StdRng::seed_from_u64(replay.seed);
            RunGenerator::new(replay.terrain_seed())
                .with_pattern(replay.pattern)
                .with_distance(replay.distance_m)
                .generate(&RunnerProfile::default(), &mut rng)
        }
    };
    tracing::info!("Prepared {} fixes", fixes.len());

    let backend: Arc<dyn SessionBackend> = match HttpBackend::from_config(&tracker_config) {
        Some(http) => {
            http.check_health().await?;
            tracing::info!("Using backend at {}", http.base_url());
            Arc::new(http)
        }
        None => {
            tracing::info!("No backend configured, running offline");
            Arc::new(OfflineBackend::new())
        }
    };

    let (handle, task) = spawn_tracker(&tracker_config, backend);
    let Some(run) = replay_fixes(&handle, &fixes).await? else {
        anyhow::bail!("session did not finish");
    };
    handle.shutdown().await?;
    task.await?;

    let stats = &run.stats;
    tracing::info!("Run {} finished (session {})", run.run_id, run.session_id);
    tracing::info!("  Distance: {:.2} km", stats.distance_km);
    tracing::info!("  Duration: {}", format_duration(stats.duration_sec));
    tracing::info!("  Pace: {}", format_pace(stats.pace_sec_per_km));
    tracing::info!("  Elevation gain: {:.0} m", stats.elevation_gain_m);
    tracing::info!("  Calories: {:.0} kcal", stats.calories);
    if let Some(error) = &run.submit_error {
        tracing::warn!("  Not submitted: {error}");
    }

    if let Some(path) = &replay.gpx_out {
        let xml = to_gpx_xml(&run.path)?;
        std::fs::write(path, xml).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("Wrote GPX to {}", path.display());
    }

    Ok(())
}
