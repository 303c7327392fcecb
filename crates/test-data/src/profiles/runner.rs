//! Runner profile.

use super::AthleteProfile;

/// Recreational runner defined by a flat-ground pace.
///
/// Climbing costs roughly 3.3% of speed per 1% of grade; descending gains
/// about half of that, capped at 25% faster than flat pace.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerProfile {
    pace_sec_per_km: f64,
    variance: f64,
}

impl Default for RunnerProfile {
    fn default() -> Self {
        Self::with_pace(360.0)
    }
}

impl RunnerProfile {
    /// Creates a profile running `pace_sec_per_km` on the flat (e.g. 360 for 6'00").
    pub fn with_pace(pace_sec_per_km: f64) -> Self {
        Self {
            pace_sec_per_km: pace_sec_per_km.max(120.0),
            variance: 0.05,
        }
    }

    pub fn with_variance(mut self, variance: f64) -> Self {
        self.variance = variance.max(0.0);
        self
    }

    /// 4'30" tempo runner.
    pub fn tempo() -> Self {
        Self::with_pace(270.0)
    }

    /// 7'30" recovery jog.
    pub fn recovery() -> Self {
        Self::with_pace(450.0).with_variance(0.03)
    }

    pub fn pace_sec_per_km(&self) -> f64 {
        self.pace_sec_per_km
    }
}

impl AthleteProfile for RunnerProfile {
    fn base_speed_mps(&self) -> f64 {
        1000.0 / self.pace_sec_per_km
    }

    fn grade_factor(&self, grade: f64) -> f64 {
        if grade >= 0.0 {
            (1.0 - grade * 3.3).max(0.3)
        } else {
            (1.0 - grade * 1.6).min(1.25)
        }
    }

    fn variance(&self) -> f64 {
        self.variance
    }
}
