//! Runner performance profiles.
//!
//! A profile turns terrain grade into running speed and supplies the
//! day-to-day variation used when timestamping generated runs.

mod runner;

pub use runner::RunnerProfile;

use rand_distr::{Distribution, Normal};

pub trait AthleteProfile: Send + Sync {
    /// Speed on flat ground in meters per second.
    fn base_speed_mps(&self) -> f64;

    /// Speed multiplier at `grade` (rise over run, 0.05 = 5% uphill).
    fn grade_factor(&self, grade: f64) -> f64;

    /// Coefficient of variation of speed between samples.
    fn variance(&self) -> f64;
}

/// Speed at a grade after applying a sampled variance factor.
pub fn speed_at_grade(profile: &dyn AthleteProfile, grade: f64, variance_factor: f64) -> f64 {
    let speed = profile.base_speed_mps() * profile.grade_factor(grade) * variance_factor;
    // Walking pace floor keeps step times finite on steep climbs.
    speed.max(0.8)
}

/// Samples a multiplier around 1.0 from the profile's variance.
pub fn sample_variance(profile: &dyn AthleteProfile, rng: &mut impl rand::Rng) -> f64 {
    match Normal::new(1.0, profile.variance()) {
        Ok(normal) if profile.variance() > 0.0 => normal.sample(rng).clamp(0.75, 1.3),
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_speed_floor() {
        let profile = RunnerProfile::recovery();
        assert_eq!(speed_at_grade(&profile, 0.5, 1.0), 0.8);
    }

    #[test]
    fn test_variance_is_clamped() {
        let profile = RunnerProfile::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let factor = sample_variance(&profile, &mut rng);
            assert!((0.75..=1.3).contains(&factor));
        }
    }
}
