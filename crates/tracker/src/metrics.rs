//! Derived run statistics.
//!
//! The backend has renamed and re-typed its result fields several times, so
//! every quantity is resolved through an ordered table of [`FieldRule`]s: the
//! first field that is present, readable and accepted by its predicate wins.
//! Missing or malformed fields never produce an error; they fall through to
//! the next rule and finally to a default.

use serde_json::Value;
use time::Duration;

use crate::models::{RunningSessionState, RunningStats};

/// Rough energy cost of running, in kcal per kg of body weight per km.
const KCAL_PER_KG_KM: f64 = 1.036;

/// One candidate source for a quantity: where to look, how to read it and
/// whether the value read is usable.
#[derive(Clone, Copy)]
pub struct FieldRule {
    pub key: &'static str,
    pub read: fn(&Value) -> Option<f64>,
    pub accept: fn(f64) -> bool,
}

impl FieldRule {
    const fn positive(key: &'static str, read: fn(&Value) -> Option<f64>) -> Self {
        Self {
            key,
            read,
            accept: is_positive,
        }
    }

    const fn present(key: &'static str, read: fn(&Value) -> Option<f64>) -> Self {
        Self {
            key,
            read,
            accept: is_present,
        }
    }

    fn apply(&self, raw: &Value) -> Option<f64> {
        raw.get(self.key)
            .and_then(self.read)
            .filter(|value| (self.accept)(*value))
    }
}

impl std::fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRule").field("key", &self.key).finish()
    }
}

fn is_positive(value: f64) -> bool {
    value > 0.0
}

fn is_present(_: f64) -> bool {
    true
}

/// Distance in kilometers.
pub const DISTANCE_KM: &[FieldRule] = &[
    FieldRule::positive("distance", read_number),
    FieldRule::positive("totalDistance", read_number),
    FieldRule::positive("distanceKm", read_number),
    FieldRule::positive("distance_km", read_number),
];

/// Duration in seconds.
pub const DURATION_SEC: &[FieldRule] = &[
    FieldRule::positive("duration", read_duration),
    FieldRule::positive("durationSec", read_number),
    FieldRule::positive("totalTime", read_number),
    FieldRule::positive("duration_sec", read_number),
];

/// Pace in seconds per kilometer.
pub const PACE_SEC_PER_KM: &[FieldRule] = &[
    FieldRule::positive("pace", read_pace),
    FieldRule::positive("paceSecPerKm", read_number),
    FieldRule::positive("avgPace", read_number),
];

/// Elevation gain in meters.
pub const ELEVATION_GAIN_M: &[FieldRule] = &[
    FieldRule::positive("elevationGain", read_number),
    FieldRule::positive("totalElevationGain", read_number),
    FieldRule::present("elevation", read_number),
];

pub const AVG_HEART_RATE: &[FieldRule] = &[
    FieldRule::positive("avgHeartRate", read_number),
    FieldRule::positive("avg_heart_rate", read_number),
];

pub const CALORIES: &[FieldRule] = &[
    FieldRule::positive("calories", read_number),
    FieldRule::positive("kcal", read_number),
];

pub const CADENCE: &[FieldRule] = &[
    FieldRule::positive("cadence", read_number),
    FieldRule::positive("avgCadence", read_number),
];

/// Evaluates `rules` in order and returns the first accepted value.
pub fn first_accepted(raw: &Value, rules: &[FieldRule]) -> Option<f64> {
    rules.iter().find_map(|rule| rule.apply(raw))
}

/// Reads a JSON number or a numeric string.
fn read_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

/// Reads an "MM:SS" string, or plain seconds.
fn read_duration(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => Some(parse_duration(s) as f64),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Reads an `M'SS"` string, or plain seconds per kilometer.
fn read_pace(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => Some(f64::from(parse_pace(s))),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Parses a pace string such as `6'45"` into seconds per kilometer.
///
/// Parts that are not numbers count as 0, so malformed input yields 0.
pub fn parse_pace(text: &str) -> u32 {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    let mut parts = trimmed.splitn(2, '\'');
    let minutes = parts
        .next()
        .and_then(|m| m.trim().parse::<u32>().ok())
        .unwrap_or(0);
    let seconds = parts
        .next()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(0);
    minutes.saturating_mul(60).saturating_add(seconds)
}

/// Parses `MM:SS` (or `HH:MM:SS`) into seconds. Anything else yields 0.
pub fn parse_duration(text: &str) -> u64 {
    let parts: Option<Vec<u64>> = text
        .trim()
        .split(':')
        .map(|part| part.trim().parse::<u64>().ok())
        .collect();

    let total = match parts.as_deref() {
        Some(&[minutes, seconds]) => minutes.checked_mul(60).and_then(|m| m.checked_add(seconds)),
        Some(&[hours, minutes, seconds]) => hours
            .checked_mul(3600)
            .and_then(|h| h.checked_add(minutes.checked_mul(60)?))
            .and_then(|t| t.checked_add(seconds)),
        _ => None,
    };
    // Out-of-range values are as malformed as non-numeric ones.
    total.unwrap_or(0)
}

pub fn format_pace(sec_per_km: u32) -> String {
    format!("{}'{:02}\"", sec_per_km / 60, sec_per_km % 60)
}

pub fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Values the backend supplied, before falling back to anything local.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ServerFields {
    pub distance_km: Option<f64>,
    pub duration_sec: Option<f64>,
    pub pace_sec_per_km: Option<f64>,
    pub calories: Option<f64>,
    pub avg_heart_rate: Option<f64>,
    pub elevation_gain_m: Option<f64>,
    pub cadence: Option<f64>,
}

impl ServerFields {
    pub fn from_response(raw: &Value) -> Self {
        Self {
            distance_km: first_accepted(raw, DISTANCE_KM),
            duration_sec: first_accepted(raw, DURATION_SEC),
            pace_sec_per_km: first_accepted(raw, PACE_SEC_PER_KM),
            calories: first_accepted(raw, CALORIES),
            avg_heart_rate: first_accepted(raw, AVG_HEART_RATE),
            elevation_gain_m: first_accepted(raw, ELEVATION_GAIN_M),
            cadence: first_accepted(raw, CADENCE),
        }
    }

    /// Fills every field the server left out from `local`.
    pub fn or_local(self, local: &RunningStats) -> RunningStats {
        RunningStats {
            distance_km: self.distance_km.unwrap_or(local.distance_km),
            duration_sec: self
                .duration_sec
                .map_or(local.duration_sec, |v| v.round() as u64),
            pace_sec_per_km: self
                .pace_sec_per_km
                .map_or(local.pace_sec_per_km, |v| v.round() as u32),
            calories: self.calories.unwrap_or(local.calories),
            avg_heart_rate: self
                .avg_heart_rate
                .map_or(local.avg_heart_rate, |v| v.round() as u32),
            elevation_gain_m: self.elevation_gain_m.unwrap_or(local.elevation_gain_m),
            cadence: self.cadence.map_or(local.cadence, |v| v.round() as u32),
        }
    }
}

/// Resolves a loosely-typed result payload into fully populated stats.
pub fn resolve_stats(raw: &Value) -> RunningStats {
    ServerFields::from_response(raw).or_local(&RunningStats::default())
}

/// Like [`resolve_stats`], but missing server fields fall back to `local`.
pub fn resolve_with_local(raw: &Value, local: &RunningStats) -> RunningStats {
    ServerFields::from_response(raw).or_local(local)
}

/// Stats computed on the device from the accumulated session.
pub fn local_stats(
    state: &RunningSessionState,
    elapsed: Duration,
    body_weight_kg: f64,
) -> RunningStats {
    let distance_km = state.total_distance_meters / 1000.0;
    let duration_sec = elapsed.whole_seconds().max(0) as u64;
    let pace_sec_per_km = if distance_km > 0.0 {
        (duration_sec as f64 / distance_km).round() as u32
    } else {
        0
    };

    RunningStats {
        distance_km,
        duration_sec,
        pace_sec_per_km,
        calories: estimate_calories(distance_km, body_weight_kg),
        avg_heart_rate: 0,
        elevation_gain_m: state.total_elevation_gain_meters,
        cadence: 0,
    }
}

pub fn estimate_calories(distance_km: f64, body_weight_kg: f64) -> f64 {
    if distance_km <= 0.0 || body_weight_kg <= 0.0 {
        return 0.0;
    }
    body_weight_kg * distance_km * KCAL_PER_KG_KM
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_pace() {
        assert_eq!(parse_pace("6'45\""), 405);
        assert_eq!(parse_pace("0'00\""), 0);
        assert_eq!(parse_pace("abc"), 0);
        assert_eq!(parse_pace("5'xx\""), 300);
        assert_eq!(parse_pace("'30\""), 30);
        assert_eq!(parse_pace(""), 0);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("20:15"), 1215);
        assert_eq!(parse_duration("1:02:03"), 3723);
        assert_eq!(parse_duration("1215"), 0);
        assert_eq!(parse_duration("ab:cd"), 0);
        assert_eq!(parse_duration("20:"), 0);
        assert_eq!(parse_duration(""), 0);
    }

    #[test]
    fn test_parse_duration_out_of_range() {
        assert_eq!(parse_duration("307445734561825861:00"), 0);
        assert_eq!(parse_duration("5124095576030432:00:00"), 0);
        assert_eq!(parse_duration("0:307445734561825861:00"), 0);

        let stats = resolve_stats(&json!({ "duration": "307445734561825861:00", "durationSec": 1800 }));
        assert_eq!(stats.duration_sec, 1800);
    }

    #[test]
    fn test_format_helpers_invert_parsers() {
        assert_eq!(format_pace(405), "6'45\"");
        assert_eq!(parse_pace(&format_pace(405)), 405);
        assert_eq!(format_duration(1215), "20:15");
        assert_eq!(parse_duration(&format_duration(5400)), 5400);
    }

    #[test]
    fn test_current_field_beats_legacy_alias() {
        let raw = json!({
            "distance": 5.2,
            "distance_km": 9.9,
            "duration": "30:00",
            "durationSec": 1,
            "pace": "5'46\"",
            "avgPace": 999,
            "avgHeartRate": 150,
            "avg_heart_rate": 120,
        });

        let stats = resolve_stats(&raw);
        assert_eq!(stats.distance_km, 5.2);
        assert_eq!(stats.duration_sec, 1800);
        assert_eq!(stats.pace_sec_per_km, 346);
        assert_eq!(stats.avg_heart_rate, 150);
    }

    #[test]
    fn test_legacy_aliases_used_when_current_missing_or_zero() {
        let raw = json!({
            "distance": 0,
            "distanceKm": "4.5",
            "duration": "garbage",
            "totalTime": 1500,
            "paceSecPerKm": 333,
            "avg_heart_rate": 141,
            "kcal": 310.5,
            "avgCadence": 172,
        });

        let stats = resolve_stats(&raw);
        assert_eq!(stats.distance_km, 4.5);
        assert_eq!(stats.duration_sec, 1500);
        assert_eq!(stats.pace_sec_per_km, 333);
        assert_eq!(stats.avg_heart_rate, 141);
        assert_eq!(stats.calories, 310.5);
        assert_eq!(stats.cadence, 172);
    }

    #[test]
    fn test_elevation_falls_back_to_plain_field() {
        let stats = resolve_stats(&json!({ "elevationGain": 0, "elevation": 12.0 }));
        assert_eq!(stats.elevation_gain_m, 12.0);

        let stats = resolve_stats(&json!({ "totalElevationGain": 30.0, "elevation": 12.0 }));
        assert_eq!(stats.elevation_gain_m, 30.0);
    }

    #[test]
    fn test_malformed_payload_defaults_to_zero() {
        for raw in [
            json!(null),
            json!("not an object"),
            json!({ "distance": "far", "duration": [1, 2], "pace": { "m": 5 } }),
        ] {
            assert_eq!(resolve_stats(&raw), RunningStats::default());
        }
    }

    #[test]
    fn test_local_values_fill_gaps() {
        let local = RunningStats {
            distance_km: 3.0,
            duration_sec: 1080,
            pace_sec_per_km: 360,
            calories: 200.0,
            avg_heart_rate: 0,
            elevation_gain_m: 15.0,
            cadence: 0,
        };

        let stats = resolve_with_local(&json!({ "avgHeartRate": 155, "distance": 3.1 }), &local);
        assert_eq!(stats.distance_km, 3.1);
        assert_eq!(stats.duration_sec, 1080);
        assert_eq!(stats.pace_sec_per_km, 360);
        assert_eq!(stats.avg_heart_rate, 155);
        assert_eq!(stats.elevation_gain_m, 15.0);
    }

    #[test]
    fn test_local_stats_from_session() {
        let state = RunningSessionState {
            is_tracking: false,
            path_points: Vec::new(),
            total_distance_meters: 5000.0,
            total_elevation_gain_meters: 42.0,
        };

        let stats = local_stats(&state, Duration::minutes(30), 60.0);
        assert_eq!(stats.distance_km, 5.0);
        assert_eq!(stats.duration_sec, 1800);
        assert_eq!(stats.pace_sec_per_km, 360);
        assert!((stats.calories - 310.8).abs() < 1e-9);
        assert_eq!(stats.elevation_gain_m, 42.0);
    }

    #[test]
    fn test_local_stats_without_distance() {
        let stats = local_stats(&RunningSessionState::default(), Duration::seconds(90), 60.0);
        assert_eq!(stats.duration_sec, 90);
        assert_eq!(stats.pace_sec_per_km, 0);
        assert_eq!(stats.calories, 0.0);
    }
}
