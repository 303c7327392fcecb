use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::gpx_export::format_iso8601_utc;

/// A recorded point on the session path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl LocationPoint {
    /// Creates a point. The timestamp is truncated to whole seconds.
    pub fn new(latitude: f64, longitude: f64, elevation: f64, timestamp: OffsetDateTime) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
            timestamp: truncate_to_second(timestamp),
        }
    }

    pub fn timestamp_iso(&self) -> String {
        format_iso8601_utc(self.timestamp)
    }
}

/// Drops the sub-second part; recorded times have one-second resolution.
pub(crate) fn truncate_to_second(at: OffsetDateTime) -> OffsetDateTime {
    at.replace_nanosecond(0).unwrap_or(at)
}

/// A single reading from the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub timestamp: Option<OffsetDateTime>,
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn at(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Live state of the running session, written only by the accumulator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunningSessionState {
    pub is_tracking: bool,
    pub path_points: Vec<LocationPoint>,
    pub total_distance_meters: f64,
    pub total_elevation_gain_meters: f64,
}

/// Final statistics of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningStats {
    pub distance_km: f64,
    pub duration_sec: u64,
    pub pace_sec_per_km: u32,
    pub calories: f64,
    pub avg_heart_rate: u32,
    pub elevation_gain_m: f64,
    pub cadence: u32,
}

/// Opaque session identifier issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Local correlation id for one run, used in log spans only.
pub type RunId = Uuid;

/// Everything kept from a run once it has been finished.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedRun {
    pub session_id: SessionId,
    pub run_id: RunId,
    pub stats: RunningStats,
    pub path: Vec<LocationPoint>,
    /// Whether the backend accepted the stats submission.
    pub submitted: bool,
    /// User-facing message when the submission failed.
    pub submit_error: Option<String>,
}

/// Request body for sharing a recorded path as a course.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpload {
    pub name: String,
    pub distance_km: f64,
    pub gpx_base64: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_point_timestamp_has_whole_seconds() {
        let point = LocationPoint::new(37.5665, 126.978, 0.0, datetime!(2024-05-01 07:30:00.123456789 UTC));
        assert_eq!(point.timestamp, datetime!(2024-05-01 07:30:00 UTC));

        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["timestamp"], "2024-05-01T07:30:00Z");
    }
}
