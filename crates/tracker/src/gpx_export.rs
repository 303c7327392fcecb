//! GPX export of a recorded path, for course sharing.
//!
//! Documents are built as `gpx` structures and serialized by its XML writer,
//! so names and other text are escaped by the emitter.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use geo::geometry::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use time::{OffsetDateTime, UtcOffset, macros::format_description};
use tracing::debug;

use crate::{
    accumulator::path_distance,
    errors::TrackerError,
    models::{CourseUpload, LocationPoint, truncate_to_second},
};

const CREATOR: &str = "runners-high";
const TRACK_NAME_PREFIX: &str = "Runner's High";

/// Formats an instant as `yyyy-MM-ddTHH:mm:ssZ` in UTC, whatever its offset.
pub fn format_iso8601_utc(at: OffsetDateTime) -> String {
    at.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
        ))
        .unwrap_or_default()
}

pub fn now_as_iso8601_utc() -> String {
    format_iso8601_utc(OffsetDateTime::now_utc())
}

/// Track name derived from the date of the first point.
fn track_name(first: &LocationPoint) -> String {
    let stamp = first.timestamp_iso();
    let date = stamp.split('T').next().unwrap_or_default();
    format!("{TRACK_NAME_PREFIX} {date}")
}

fn to_waypoint(point: &LocationPoint) -> Waypoint {
    let mut waypoint = Waypoint::new(Point::new(point.longitude, point.latitude));
    waypoint.elevation = Some(point.elevation);
    let at = truncate_to_second(point.timestamp).to_offset(UtcOffset::UTC);
    waypoint.time = Some(gpx::Time::from(at));
    waypoint
}

/// Serializes `points` as a GPX 1.1 document with a single track segment.
///
/// An empty path yields an empty string rather than an empty document.
pub fn to_gpx_xml(points: &[LocationPoint]) -> Result<String, TrackerError> {
    let Some(first) = points.first() else {
        return Ok(String::new());
    };

    let mut track = Track::new();
    track.name = Some(track_name(first));
    track.segments = vec![TrackSegment {
        points: points.iter().map(to_waypoint).collect(),
    }];

    let gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.to_string()),
        tracks: vec![track],
        ..Default::default()
    };

    let mut buf = Vec::new();
    gpx::write(&gpx, &mut buf)?;
    debug!("Exported {} points as {} bytes of GPX", points.len(), buf.len());

    String::from_utf8(buf)
        .map_err(|e| TrackerError::InvalidInput(format!("GPX output is not UTF-8: {e}")))
}

/// Standard Base64 of the UTF-8 bytes, without line wrapping.
pub fn encode_to_base64(xml: &str) -> String {
    STANDARD.encode(xml.as_bytes())
}

/// Builds the payload for sharing `points` as a named course.
pub fn course_upload(name: &str, points: &[LocationPoint]) -> Result<CourseUpload, TrackerError> {
    if points.is_empty() {
        return Err(TrackerError::InvalidInput(
            "Cannot share a course without any points".to_string(),
        ));
    }

    let xml = to_gpx_xml(points)?;
    Ok(CourseUpload {
        name: name.to_string(),
        distance_km: path_distance(points) / 1000.0,
        gpx_base64: encode_to_base64(&xml),
    })
}
