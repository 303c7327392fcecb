//! Loading recorded runs from GPX files.

use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use gpx::Gpx;
use thiserror::Error;
use time::OffsetDateTime;
use tracker::models::Fix;

#[derive(Debug, Error)]
pub enum GpxLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("GPX parse error: {0}")]
    Parse(#[from] gpx::errors::GpxError),
    #[error("GPX file has no track points")]
    NoPoints,
}

/// Reads track points out of GPX documents as tracker fixes.
pub struct GpxLoader;

impl GpxLoader {
    pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<Fix>, GpxLoadError> {
        let file = std::fs::File::open(path)?;
        Self::load_reader(BufReader::new(file))
    }

    pub fn load_bytes(data: &[u8]) -> Result<Vec<Fix>, GpxLoadError> {
        Self::load_reader(Cursor::new(data))
    }

    fn load_reader(reader: impl Read) -> Result<Vec<Fix>, GpxLoadError> {
        let gpx = gpx::read(reader)?;
        let fixes = Self::fixes(&gpx);
        if fixes.is_empty() {
            return Err(GpxLoadError::NoPoints);
        }
        Ok(fixes)
    }

    /// Track points of every track and segment, in document order.
    fn fixes(gpx: &Gpx) -> Vec<Fix> {
        gpx.tracks
            .iter()
            .flat_map(|track| &track.segments)
            .flat_map(|segment| &segment.points)
            .map(|waypoint| {
                let point = waypoint.point();
                Fix {
                    latitude: point.y(),
                    longitude: point.x(),
                    elevation: waypoint.elevation,
                    timestamp: waypoint.time.map(OffsetDateTime::from),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use tracker::gpx_export::to_gpx_xml;
    use tracker::models::LocationPoint;

    #[test]
    fn test_loads_tracker_export() {
        let t0 = datetime!(2024-05-01 06:30 UTC);
        let points = vec![
            LocationPoint::new(37.5665, 126.978, 21.0, t0),
            LocationPoint::new(37.5675, 126.979, 24.5, t0 + time::Duration::seconds(30)),
        ];
        let xml = to_gpx_xml(&points).unwrap();

        let fixes = GpxLoader::load_bytes(xml.as_bytes()).unwrap();
        assert_eq!(fixes.len(), 2);
        assert!((fixes[1].latitude - 37.5675).abs() < 1e-9);
        assert!((fixes[1].longitude - 126.979).abs() < 1e-9);
        assert_eq!(fixes[1].elevation, Some(24.5));
        assert_eq!(fixes[1].timestamp, Some(t0 + time::Duration::seconds(30)));
    }

    #[test]
    fn test_waypoints_only_is_empty() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <wpt lat="37.5665" lon="126.978"></wpt>
</gpx>"#;
        assert!(matches!(
            GpxLoader::load_bytes(xml.as_bytes()),
            Err(GpxLoadError::NoPoints)
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            GpxLoader::load_file("/nonexistent/run.gpx"),
            Err(GpxLoadError::Io(_))
        ));
    }
}
