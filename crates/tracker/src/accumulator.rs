//! Location accumulation for the active session.
//!
//! Every accepted fix is appended to the path and the great-circle distance
//! from the previous point is added to the running total. Fixes are taken
//! verbatim: no outlier rejection, smoothing or accuracy filtering.

use geo::{Distance as _, Haversine, geometry::Point};
use time::OffsetDateTime;
use tracing::trace;

use crate::models::{Fix, LocationPoint, RunningSessionState};

/// Great-circle distance in meters between two recorded points.
pub fn distance_between(a: &LocationPoint, b: &LocationPoint) -> f64 {
    Haversine.distance(
        Point::new(a.longitude, a.latitude),
        Point::new(b.longitude, b.latitude),
    )
}

/// Sum of pairwise distances between consecutive points, in order.
pub fn path_distance(points: &[LocationPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_between(&pair[0], &pair[1]))
        .sum()
}

/// Single-writer accumulator over [`RunningSessionState`].
#[derive(Debug, Clone, Default)]
pub struct LocationAccumulator {
    state: RunningSessionState,
    last_reported_elevation: Option<f64>,
}

impl LocationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RunningSessionState {
        &self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state.is_tracking
    }

    pub fn last_point(&self) -> Option<&LocationPoint> {
        self.state.path_points.last()
    }

    /// Clears the path and enables accumulation.
    pub fn start(&mut self) {
        self.reset();
        self.state.is_tracking = true;
    }

    /// Disables accumulation and hands over the recorded path.
    ///
    /// The state is left empty; totals must be read before calling this.
    pub fn stop(&mut self) -> Vec<LocationPoint> {
        let path = std::mem::take(&mut self.state.path_points);
        self.reset();
        path
    }

    pub fn reset(&mut self) {
        self.state = RunningSessionState::default();
        self.last_reported_elevation = None;
    }

    /// Records a bare coordinate stamped with the current time.
    pub fn on_new_location(&mut self, latitude: f64, longitude: f64) -> Option<&LocationPoint> {
        self.on_new_fix(Fix::new(latitude, longitude))
    }

    /// Records a fix. Ignored unless tracking is enabled.
    ///
    /// Returns the recorded point when the fix was accepted.
    pub fn on_new_fix(&mut self, fix: Fix) -> Option<&LocationPoint> {
        if !self.state.is_tracking {
            trace!("Ignoring fix while not tracking");
            return None;
        }

        let point = LocationPoint::new(
            fix.latitude,
            fix.longitude,
            fix.elevation.unwrap_or(0.0),
            fix.timestamp.unwrap_or_else(OffsetDateTime::now_utc),
        );

        let step = self
            .state
            .path_points
            .last()
            .map_or(0.0, |prev| distance_between(prev, &point));
        self.state.total_distance_meters += step;

        if let Some(elevation) = fix.elevation {
            if let Some(last) = self.last_reported_elevation {
                let gain = elevation - last;
                if gain > 0.0 {
                    self.state.total_elevation_gain_meters += gain;
                }
            }
            self.last_reported_elevation = Some(elevation);
        }

        self.state.path_points.push(point);
        self.state.path_points.last()
    }
}
