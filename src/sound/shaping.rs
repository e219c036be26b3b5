//! Position shaping and interpolation helpers
//!
//! Raw lateral offsets are first remapped to the usable lane band, then bent
//! through an "elbow" curve so small deviations stay quiet and deviations
//! past the half-band ramp up quickly.

use serde::{Deserialize, Serialize};

/// Easing applied to the normalized interpolation parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolator {
    /// Straight line
    #[default]
    Linear,
    /// Quadratic ease-in, slow start then steep rise
    Square,
}

impl Interpolator {
    /// Apply the easing to `t` in `[0, 1]`
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Self::Linear => t,
            Self::Square => t * t,
        }
    }
}

/// Map `x` from `[x0, x1]` onto `[y0, y1]` without clamping
#[must_use]
pub fn lerp(x: f32, x0: f32, x1: f32, y0: f32, y1: f32) -> f32 {
    if (x1 - x0).abs() < f32::EPSILON {
        return y0;
    }
    let t = (x - x0) / (x1 - x0);
    (y1 - y0).mul_add(t, y0)
}

/// Map `x` from `[x0, x1]` onto `[y0, y1]`, clamping the parameter to `[0, 1]`
/// before easing
#[must_use]
pub fn clamped_lerp(x: f32, x0: f32, x1: f32, y0: f32, y1: f32, easing: Interpolator) -> f32 {
    if (x1 - x0).abs() < f32::EPSILON {
        return if x < x0 { y0 } else { y1 };
    }
    let t = ((x - x0) / (x1 - x0)).clamp(0.0, 1.0);
    (y1 - y0).mul_add(easing.apply(t), y0)
}

/// Half-width of the raw range that maps onto the full lane for a sensitivity
#[must_use]
pub fn max_lane_position(sensitivity: f32) -> f32 {
    sensitivity.mul_add(-0.5, 1.0)
}

/// Remap a raw screen-space offset (-1 left, 1 right) onto the lane band
///
/// Anything beyond the band edge saturates at -1 or 1, so corrections start
/// earlier when the lane is narrower than the full view.
#[must_use]
pub fn lane_remap(raw: f32, sensitivity: f32) -> f32 {
    let max_lane = max_lane_position(sensitivity);
    clamped_lerp(raw, -max_lane, max_lane, -1.0, 1.0, Interpolator::Linear)
}

/// Apply elbow shaping to a lane position already clamped to `[-1, 1]`
///
/// With `curvature == 0` this is the identity. As curvature grows the value at
/// `|x| = 0.5` shrinks from 0.5 toward 0.01, flattening the center zone and
/// steepening the outer zone.
#[must_use]
pub fn shape(x: f32, curvature: f32) -> f32 {
    if curvature == 0.0 {
        return x;
    }
    let mid_y = lerp(curvature, 0.0, 1.0, 0.5, 0.01);
    let magnitude = x.abs();
    let shaped = if magnitude < 0.5 {
        lerp(magnitude, 0.0, 0.5, 0.0, mid_y)
    } else {
        lerp(magnitude, 0.5, 1.0, mid_y, 1.0)
    };
    shaped.copysign(x)
}
