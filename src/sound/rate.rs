//! Playback-rate strategies
//!
//! Rate acts as a pitch/tempo proxy for distance from the line center.

use serde::{Deserialize, Serialize};

use super::shaping::{Interpolator, clamped_lerp};

/// Maps a lane position to a playback-rate multiplier
///
/// Implementations must be non-decreasing in `|position|`.
pub trait RateStrategy {
    /// Rate multiplier for `position` in `[-1, 1]`
    fn rate(&self, position: f32) -> f32;
}

/// Interpolates `|position|` over `[from, to]` onto `[min_rate, max_rate]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateCurve {
    /// Magnitude where the ramp begins; below it the rate stays at `min_rate`
    pub from: f32,
    /// Magnitude where the ramp reaches `max_rate`
    pub to: f32,
    /// Rate inside the neutral zone
    pub min_rate: f32,
    /// Rate at and beyond `to`
    pub max_rate: f32,
    /// Easing across the ramp
    #[serde(default)]
    pub interpolator: Interpolator,
}

impl RateCurve {
    /// Steering default: 1x at the center rising linearly to 2x at the edge
    pub const STEERING: Self = Self {
        from: 0.0,
        to: 1.0,
        min_rate: 1.0,
        max_rate: 2.0,
        interpolator: Interpolator::Linear,
    };

    /// Warning default: neutral until 0.4, then a quadratic climb to 2x
    pub const WARNING: Self = Self {
        from: 0.4,
        to: 1.0,
        min_rate: 1.0,
        max_rate: 2.0,
        interpolator: Interpolator::Square,
    };

    /// Check the curve is well formed and non-decreasing
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.from)
            && self.to > self.from
            && self.min_rate > 0.0
            && self.max_rate >= self.min_rate
    }
}

impl RateStrategy for RateCurve {
    fn rate(&self, position: f32) -> f32 {
        clamped_lerp(
            position.abs(),
            self.from,
            self.to,
            self.min_rate,
            self.max_rate,
            self.interpolator,
        )
    }
}
