//! Stereo panning strategies
//!
//! A strategy maps a shaped lane position in `[-1, 1]` to a left/right volume
//! pair. Steering and warning channels each get their own strategy so the
//! corridor sound and the danger sound can pan differently.

use serde::{Deserialize, Serialize};

use super::shaping::{Interpolator, clamped_lerp};

/// Left/right channel volume, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StereoVolume {
    /// Left channel gain
    pub left: f32,
    /// Right channel gain
    pub right: f32,
}

impl StereoVolume {
    /// Both channels muted
    pub const SILENT: Self = Self {
        left: 0.0,
        right: 0.0,
    };

    /// Both channels at full gain
    pub const FULL: Self = Self {
        left: 1.0,
        right: 1.0,
    };

    /// Create a volume pair, clamping each side to `[0, 1]`
    #[must_use]
    pub fn new(left: f32, right: f32) -> Self {
        Self {
            left: left.clamp(0.0, 1.0),
            right: right.clamp(0.0, 1.0),
        }
    }

    /// Scale both sides by `gain`
    #[must_use]
    pub fn scaled(self, gain: f32) -> Self {
        Self::new(self.left * gain, self.right * gain)
    }

    /// Swap left and right
    #[must_use]
    pub const fn mirrored(self) -> Self {
        Self {
            left: self.right,
            right: self.left,
        }
    }

    /// Whether both sides are zero
    #[must_use]
    pub fn is_silent(self) -> bool {
        self.left <= 0.0 && self.right <= 0.0
    }
}

/// Maps a lane position to a stereo volume
pub trait PanningStrategy {
    /// Volume for `position` in `[-1, 1]`
    fn volume(&self, position: f32) -> StereoVolume;
}

/// Full volume on the side matching the sign of the position, none on the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HardPan {
    /// Put the sound in the opposite ear instead
    pub reversed: bool,
}

impl PanningStrategy for HardPan {
    fn volume(&self, position: f32) -> StereoVolume {
        let volume = if position > 0.0 {
            StereoVolume::new(0.0, 1.0)
        } else if position < 0.0 {
            StereoVolume::new(1.0, 0.0)
        } else {
            return StereoVolume::FULL;
        };
        if self.reversed {
            volume.mirrored()
        } else {
            volume
        }
    }
}

/// Centered below `threshold`, crossing over linearly to a full pan at the edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearThresholdPan {
    /// Magnitude below which both sides play at full volume
    pub threshold: f32,
}

impl PanningStrategy for LinearThresholdPan {
    fn volume(&self, position: f32) -> StereoVolume {
        let threshold = self.threshold.abs();
        let magnitude = position.abs();
        if magnitude <= threshold {
            return StereoVolume::FULL;
        }
        let fading = clamped_lerp(magnitude, threshold, 1.0, 1.0, 0.0, Interpolator::Linear);
        if position > 0.0 {
            StereoVolume::new(fading, 1.0)
        } else {
            StereoVolume::new(1.0, fading)
        }
    }
}

/// Configurable choice of panning strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanningKind {
    /// See [`HardPan`]
    HardPan {
        /// Put the sound in the opposite ear
        #[serde(default)]
        reversed: bool,
    },
    /// See [`LinearThresholdPan`]
    LinearThreshold {
        /// Centered-zone half width
        threshold: f32,
    },
}

impl PanningKind {
    /// Check the parameters are usable
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::HardPan { .. } => true,
            Self::LinearThreshold { threshold } => (0.0..1.0).contains(threshold),
        }
    }
}

impl PanningStrategy for PanningKind {
    fn volume(&self, position: f32) -> StereoVolume {
        match *self {
            Self::HardPan { reversed } => HardPan { reversed }.volume(position),
            Self::LinearThreshold { threshold } => {
                LinearThresholdPan { threshold }.volume(position)
            }
        }
    }
}
