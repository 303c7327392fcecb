//! Procedural run generation.

use std::f64::consts::TAU;

use geo::{Distance as _, Haversine, Point};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use time::{Duration, OffsetDateTime};
use tracker::models::Fix;

use crate::config::{BoundingBox, Region, RoutePattern};
use crate::profiles::{self, AthleteProfile};
use crate::terrain::{ElevationGenerator, elevation_jitter};

const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Target distance in meters, including the way back for closed routes.
    pub distance_m: f64,
    pub pattern: RoutePattern,
    /// Start (lat, lon). Random inside `bounds` when unset.
    pub start: Option<(f64, f64)>,
    pub bounds: BoundingBox,
    pub start_time: OffsetDateTime,
    /// Spacing between consecutive fixes in meters.
    pub fix_spacing_m: f64,
    /// Horizontal GPS error, standard deviation in meters.
    pub gps_jitter_m: f64,
    pub elevation_jitter_m: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            distance_m: 5000.0,
            pattern: RoutePattern::OutAndBack,
            start: None,
            bounds: Region::YEOUIDO,
            start_time: OffsetDateTime::now_utc(),
            fix_spacing_m: 15.0,
            gps_jitter_m: 2.0,
            elevation_jitter_m: 1.0,
        }
    }
}

/// Generates synthetic runs as a sequence of fixes.
pub struct RunGenerator {
    config: RunConfig,
    terrain: ElevationGenerator,
}

impl RunGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            config: RunConfig::default(),
            terrain: ElevationGenerator::seoul(seed),
        }
    }

    pub fn with_distance(mut self, meters: f64) -> Self {
        self.config.distance_m = meters.max(0.0);
        self
    }

    pub fn with_pattern(mut self, pattern: RoutePattern) -> Self {
        self.config.pattern = pattern;
        self
    }

    pub fn with_start(mut self, lat: f64, lon: f64) -> Self {
        self.config.start = Some((lat, lon));
        self
    }

    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.config.bounds = bounds;
        self
    }

    pub fn with_start_time(mut self, at: OffsetDateTime) -> Self {
        self.config.start_time = at;
        self
    }

    pub fn with_fix_spacing(mut self, meters: f64) -> Self {
        self.config.fix_spacing_m = meters.max(1.0);
        self
    }

    /// Sets both horizontal and vertical GPS noise to zero or the given values.
    pub fn with_jitter(mut self, horizontal_m: f64, vertical_m: f64) -> Self {
        self.config.gps_jitter_m = horizontal_m.max(0.0);
        self.config.elevation_jitter_m = vertical_m.max(0.0);
        self
    }

    pub fn with_terrain(mut self, terrain: ElevationGenerator) -> Self {
        self.terrain = terrain;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Generates a complete run with elevation and timestamps.
    pub fn generate(&self, profile: &dyn AthleteProfile, rng: &mut impl Rng) -> Vec<Fix> {
        let start = self
            .config
            .start
            .unwrap_or_else(|| self.config.bounds.random_point(rng));
        let route = self.route(start, rng);
        self.apply_timing(&route, profile, rng)
    }

    /// Route geometry without noise or timing.
    pub fn route(&self, start: (f64, f64), rng: &mut impl Rng) -> Vec<(f64, f64)> {
        match self.config.pattern {
            RoutePattern::OutAndBack => {
                let mut route = self.wander(start, self.config.distance_m / 2.0, rng);
                let back: Vec<_> = route.iter().rev().skip(1).copied().collect();
                route.extend(back);
                route
            }
            RoutePattern::Loop => self.circle(start, rng),
            RoutePattern::Wander => self.wander(start, self.config.distance_m, rng),
        }
    }

    /// Random walk with heading momentum.
    fn wander(&self, start: (f64, f64), distance_m: f64, rng: &mut impl Rng) -> Vec<(f64, f64)> {
        let mut route = vec![start];
        let mut current = start;
        let mut covered = 0.0;
        let mut heading = rng.gen_range(0.0..TAU);

        while covered < distance_m {
            heading += rng.gen_range(-0.25..0.25);
            let step = (self.config.fix_spacing_m * rng.gen_range(0.8..1.2))
                .min(distance_m - covered)
                .max(0.5);
            let (lat, lon) = offset(current, step, heading);

            // Turn back toward the start area instead of leaving it.
            if !self.config.bounds.contains(lat, lon) {
                heading += std::f64::consts::PI;
            }
            current = (lat, lon);
            route.push(current);
            covered += step;
        }
        route
    }

    /// Closed loop through `start` whose circumference matches the target distance.
    fn circle(&self, start: (f64, f64), rng: &mut impl Rng) -> Vec<(f64, f64)> {
        let radius = self.config.distance_m / TAU;
        let steps = ((self.config.distance_m / self.config.fix_spacing_m).ceil() as usize).max(3);
        let bearing = rng.gen_range(0.0..TAU);
        let center = offset(start, radius, bearing);
        // Angle of `start` as seen from the center.
        let phase = bearing + std::f64::consts::PI;

        // Low-frequency radius wobble so the loop is not a perfect circle.
        let wobble_phase = rng.gen_range(0.0..TAU);
        let mut route: Vec<_> = (0..steps)
            .map(|i| {
                let t = TAU * i as f64 / steps as f64;
                let wobble = 1.0 + 0.04 * (3.0 * t + wobble_phase).sin();
                offset(center, radius * wobble, phase + t)
            })
            .collect();
        route[0] = start;
        route.push(start);
        route
    }

    fn apply_timing(
        &self,
        route: &[(f64, f64)],
        profile: &dyn AthleteProfile,
        rng: &mut impl Rng,
    ) -> Vec<Fix> {
        let jitter_deg = self.config.gps_jitter_m / METERS_PER_DEGREE_LAT;
        let jitter = Normal::new(0.0, jitter_deg).ok().filter(|_| jitter_deg > 0.0);

        let mut at = self.config.start_time;
        let mut fixes = Vec::with_capacity(route.len());

        for (i, &(lat, lon)) in route.iter().enumerate() {
            let elevation = self.terrain.elevation_at(lat, lon);
            if let Some(&(prev_lat, prev_lon)) = i.checked_sub(1).and_then(|p| route.get(p)) {
                let step = Haversine.distance(Point::new(prev_lon, prev_lat), Point::new(lon, lat));
                let grade = if step > 0.0 {
                    (elevation - self.terrain.elevation_at(prev_lat, prev_lon)) / step
                } else {
                    0.0
                };
                let variance = profiles::sample_variance(profile, rng);
                let speed = profiles::speed_at_grade(profile, grade, variance);
                // Whole milliseconds keep timestamps strictly increasing.
                at += Duration::milliseconds(((step / speed) * 1000.0).ceil().max(1.0) as i64);
            }

            let (d_lat, d_lon) = match &jitter {
                Some(normal) => (normal.sample(rng), normal.sample(rng)),
                None => (0.0, 0.0),
            };
            fixes.push(
                Fix::new(lat + d_lat, lon + d_lon)
                    .with_elevation(elevation + elevation_jitter(rng, self.config.elevation_jitter_m))
                    .at(at),
            );
        }
        fixes
    }
}

/// Moves `meters` from `from` along `heading` (radians clockwise from north).
fn offset(from: (f64, f64), meters: f64, heading: f64) -> (f64, f64) {
    let (lat, lon) = from;
    let d_lat = meters * heading.cos() / METERS_PER_DEGREE_LAT;
    let d_lon = meters * heading.sin() / (METERS_PER_DEGREE_LAT * lat.to_radians().cos());
    (lat + d_lat, lon + d_lon)
}
