//! Perlin noise elevation for generated runs.

use noise::{NoiseFn, Perlin};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Deterministic elevation field.
///
/// City running routes rarely span more than a few tens of meters of relief,
/// so the presets use low amplitudes and a spatial frequency tuned so that a
/// few hundred meters of running crosses one noticeable rise.
#[derive(Debug, Clone)]
pub struct ElevationGenerator {
    perlin: Perlin,
    base_m: f64,
    relief_m: f64,
    /// Noise cycles per degree of latitude/longitude.
    frequency: f64,
    octaves: u32,
}

impl ElevationGenerator {
    pub fn new(seed: u32) -> Self {
        Self::seoul(seed)
    }

    /// River basin with modest hills, as along the Han.
    pub fn seoul(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            base_m: 30.0,
            relief_m: 20.0,
            frequency: 150.0,
            octaves: 3,
        }
    }

    /// Park hill climbs, e.g. Namsan's loop roads.
    pub fn hilly(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            base_m: 120.0,
            relief_m: 90.0,
            frequency: 250.0,
            octaves: 4,
        }
    }

    /// Running track or riverside path.
    pub fn flat(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            base_m: 12.0,
            relief_m: 1.5,
            frequency: 80.0,
            octaves: 1,
        }
    }

    pub fn with_base(mut self, meters: f64) -> Self {
        self.base_m = meters;
        self
    }

    pub fn with_relief(mut self, meters: f64) -> Self {
        self.relief_m = meters.max(0.0);
        self
    }

    pub fn base(&self) -> f64 {
        self.base_m
    }

    pub fn relief(&self) -> f64 {
        self.relief_m
    }

    /// Elevation in meters at a coordinate.
    pub fn elevation_at(&self, lat: f64, lon: f64) -> f64 {
        let mut total = 0.0;
        let mut weight = 1.0;
        let mut weights = 0.0;
        let mut frequency = self.frequency;

        for _ in 0..self.octaves {
            total += self.perlin.get([lat * frequency, lon * frequency]) * weight;
            weights += weight;
            weight *= 0.5;
            frequency *= 2.0;
        }

        if weights == 0.0 {
            return self.base_m;
        }
        self.base_m + (total / weights) * self.relief_m
    }

    pub fn profile(&self, coords: &[(f64, f64)]) -> Vec<f64> {
        coords
            .iter()
            .map(|&(lat, lon)| self.elevation_at(lat, lon))
            .collect()
    }
}

/// Barometer/GPS altitude noise with standard deviation `std_dev_m`.
pub fn elevation_jitter(rng: &mut impl Rng, std_dev_m: f64) -> f64 {
    match Normal::new(0.0, std_dev_m) {
        Ok(normal) => normal.sample(rng),
        Err(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_same_seed_same_terrain() {
        let a = ElevationGenerator::seoul(9);
        let b = ElevationGenerator::seoul(9);
        assert_eq!(a.elevation_at(37.55, 126.99), b.elevation_at(37.55, 126.99));
    }

    #[test]
    fn test_elevation_within_relief() {
        let terrain = ElevationGenerator::hilly(3);
        for (lat, lon) in [(37.550, 126.985), (37.553, 126.990), (37.555, 126.993)] {
            let elevation = terrain.elevation_at(lat, lon);
            assert!((elevation - terrain.base()).abs() <= terrain.relief());
        }
    }

    #[test]
    fn test_flat_preset_is_flat() {
        let terrain = ElevationGenerator::flat(1);
        let coords: Vec<_> = (0..50).map(|i| (37.525, 126.915 + i as f64 * 0.0005)).collect();
        let profile = terrain.profile(&coords);
        assert_eq!(profile.len(), 50);
        let max = profile.iter().cloned().fold(f64::MIN, f64::max);
        let min = profile.iter().cloned().fold(f64::MAX, f64::min);
        assert!(max - min <= 3.0);
    }

    #[test]
    fn test_zero_jitter() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(elevation_jitter(&mut rng, 0.0), 0.0);
        assert_eq!(elevation_jitter(&mut rng, -1.0), 0.0);
    }
}
