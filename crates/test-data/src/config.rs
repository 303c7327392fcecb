//! Configuration types for synthetic runs and replay.

use std::{env, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;
use tracker::config::parse_or;

/// Geographic bounding box defined by southwest and northeast corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Returns a random point within the bounding box.
    pub fn random_point(&self, rng: &mut impl rand::Rng) -> (f64, f64) {
        let lat = rng.gen_range(self.min_lat..self.max_lat);
        let lon = rng.gen_range(self.min_lon..self.max_lon);
        (lat, lon)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// Pre-defined areas to start synthetic runs in.
#[derive(Debug, Clone, Copy)]
pub struct Region;

impl Region {
    /// Around Seoul City Hall: flat city blocks.
    pub const SEOUL_CITY_HALL: BoundingBox = BoundingBox::new(37.560, 126.970, 37.572, 126.986);

    /// Yeouido Han River park: flat riverside paths.
    pub const YEOUIDO: BoundingBox = BoundingBox::new(37.522, 126.915, 37.532, 126.940);

    /// Namsan: steep park roads.
    pub const NAMSAN: BoundingBox = BoundingBox::new(37.546, 126.982, 37.556, 126.995);
}

/// Shape of a generated route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoutePattern {
    /// Run out, turn around and retrace the path to the start.
    #[default]
    OutAndBack,
    /// Circle back to the start along a loop.
    Loop,
    /// Random walk that does not return.
    Wander,
}

impl std::str::FromStr for RoutePattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "out_and_back" => Ok(Self::OutAndBack),
            "loop" => Ok(Self::Loop),
            "wander" => Ok(Self::Wander),
            other => Err(format!("unknown route pattern `{other}`")),
        }
    }
}

/// Settings for the `replay` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// RNG seed for reproducible runs.
    pub seed: u64,
    /// Target run distance in meters.
    pub distance_m: f64,
    pub pattern: RoutePattern,
    /// Replay this GPX file instead of generating a run.
    pub gpx_in: Option<PathBuf>,
    /// Write the finished run's GPX export here.
    pub gpx_out: Option<PathBuf>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            distance_m: 5000.0,
            pattern: RoutePattern::OutAndBack,
            gpx_in: None,
            gpx_out: None,
        }
    }
}

impl ReplayConfig {
    /// Reads `REPLAY_*` variables, keeping defaults for anything unset or invalid.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let distance_m = parse_or(var("REPLAY_DISTANCE_M"), "REPLAY_DISTANCE_M", defaults.distance_m);
        let distance_m = if distance_m > 0.0 {
            distance_m
        } else {
            warn!("Ignoring non-positive REPLAY_DISTANCE_M={distance_m}, using default");
            defaults.distance_m
        };

        Self {
            seed: parse_or(var("REPLAY_SEED"), "REPLAY_SEED", defaults.seed),
            distance_m,
            pattern: parse_or(var("REPLAY_PATTERN"), "REPLAY_PATTERN", defaults.pattern),
            gpx_in: var("REPLAY_GPX_IN").map(PathBuf::from),
            gpx_out: var("REPLAY_GPX_OUT").map(PathBuf::from),
        }
    }

    /// Seed for the terrain noise, folding in the high half of `seed`.
    pub fn terrain_seed(&self) -> u32 {
        ((self.seed >> 32) ^ (self.seed & u64::from(u32::MAX))) as u32
    }
}
