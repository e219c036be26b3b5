//! Debounced turn and straight-path announcements
//!
//! Two independent schedulers share one [`Speech`] sink. Every announcement
//! flushes the sink so a fresh cue replaces whatever is still being spoken.

use std::time::{Duration, Instant};

use super::sink::{QueueMode, Speech};
use crate::config::{Config, SpeechConfig};

/// Minimum time between two turn announcements
pub const TURN_ANNOUNCEMENT_INTERVAL: Duration = Duration::from_secs(3);

/// Minimum time between two straight-path announcements
pub const STRAIGHT_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// A turn is re-announced only when its angle moved by more than this
pub const TURN_ANGLE_CHANGE_DEGREES: f32 = 2.0;

/// Look-ahead below this maximum angle counts as straight
pub const STRAIGHT_MAX_ANGLE_DEGREES: f32 = 5.0;

/// Shortest look-ahead distance worth announcing as straight
pub const STRAIGHT_MIN_DISTANCE: f32 = 100.0;

/// Side of an upcoming curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// Negative angles curve left
    #[must_use]
    pub fn from_angle(angle: f32) -> Self {
        if angle < 0.0 { Self::Left } else { Self::Right }
    }
}

/// How sharp a curve is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TurnIntensity {
    Gentle,
    Moderate,
    Sharp,
}

impl TurnIntensity {
    /// Times the direction word is spoken
    #[must_use]
    pub const fn repeat(self) -> usize {
        match self {
            Self::Gentle => 1,
            Self::Moderate => 2,
            Self::Sharp => 3,
        }
    }
}

/// Angle thresholds separating the intensity tiers, in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnTiers {
    pub min: f32,
    pub double: f32,
    pub max: f32,
}

impl Default for TurnTiers {
    fn default() -> Self {
        Self {
            min: 5.0,
            double: 10.0,
            max: 30.0,
        }
    }
}

impl TurnTiers {
    /// Thresholds from the configuration
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            min: config.min_turn_angle_degrees,
            double: config.double_turn_angle_degrees,
            max: config.max_turn_angle_degrees,
        }
    }

    /// Tier for a signed angle; `None` below the minimum
    #[must_use]
    pub fn classify(&self, angle: f32) -> Option<TurnIntensity> {
        let magnitude = angle.abs();
        if magnitude >= self.max {
            Some(TurnIntensity::Sharp)
        } else if magnitude >= self.double {
            Some(TurnIntensity::Moderate)
        } else if magnitude >= self.min {
            Some(TurnIntensity::Gentle)
        } else {
            None
        }
    }
}

/// Something that was handed to the speech sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    Turn {
        direction: TurnDirection,
        intensity: TurnIntensity,
    },
    Straight,
}

/// Turn and straight-path announcement scheduler
#[derive(Debug)]
pub struct Announcer {
    speech: Speech,
    phrases: SpeechConfig,
    tiers: TurnTiers,
    last_turn_angle: f32,
    last_turn_at: Option<Instant>,
    straight_announced: bool,
    last_straight_at: Option<Instant>,
}

impl Announcer {
    /// Create a scheduler speaking through `speech` with phrases from `config`
    #[must_use]
    pub fn new(speech: Speech, config: &Config) -> Self {
        Self {
            speech,
            phrases: config.speech.clone(),
            tiers: TurnTiers::from_config(config),
            last_turn_angle: 0.0,
            last_turn_at: None,
            straight_announced: false,
            last_straight_at: None,
        }
    }

    /// Announce an upcoming curve now
    pub fn on_turn(&mut self, angle: f32) -> Option<Announcement> {
        self.on_turn_at(angle, Instant::now())
    }

    /// Announce an upcoming curve as of `now`
    ///
    /// Speaks only when speech is ready, more than
    /// [`TURN_ANNOUNCEMENT_INTERVAL`] passed since the last turn announcement,
    /// the angle reaches a tier and it differs from the last announced angle
    /// by more than [`TURN_ANGLE_CHANGE_DEGREES`].
    pub fn on_turn_at(&mut self, angle: f32, now: Instant) -> Option<Announcement> {
        if !angle.is_finite() {
            tracing::trace!(angle, "ignoring non-finite turn angle");
            return None;
        }
        if !self.speech.is_ready() || !elapsed(self.last_turn_at, now, TURN_ANNOUNCEMENT_INTERVAL)
        {
            return None;
        }
        let intensity = self.tiers.classify(angle)?;
        if (angle - self.last_turn_angle).abs() <= TURN_ANGLE_CHANGE_DEGREES {
            tracing::trace!(angle, last = self.last_turn_angle, "turn unchanged, not announced");
            return None;
        }

        let direction = TurnDirection::from_angle(angle);
        let text = self.turn_phrase(direction, intensity);
        self.speech.speak(&text, QueueMode::Flush);
        tracing::debug!(angle, ?direction, ?intensity, "turn announced");

        self.last_turn_at = Some(now);
        self.last_turn_angle = angle;
        self.straight_announced = false;
        Some(Announcement::Turn {
            direction,
            intensity,
        })
    }

    /// Announce a long straight ahead now
    pub fn check_straight_path(&mut self, max_angle: f32, distance: f32) -> Option<Announcement> {
        self.check_straight_path_at(max_angle, distance, Instant::now())
    }

    /// Announce a long straight ahead as of `now`
    ///
    /// Speaks once per straight segment. Any look-ahead whose maximum angle
    /// reaches [`STRAIGHT_MAX_ANGLE_DEGREES`] ends the segment.
    pub fn check_straight_path_at(
        &mut self,
        max_angle: f32,
        distance: f32,
        now: Instant,
    ) -> Option<Announcement> {
        if !max_angle.is_finite() || distance.is_nan() {
            tracing::trace!(max_angle, distance, "ignoring non-finite look-ahead");
            return None;
        }
        let distance = distance.max(0.0);
        let straight = max_angle.abs() < STRAIGHT_MAX_ANGLE_DEGREES;

        if straight
            && distance >= STRAIGHT_MIN_DISTANCE
            && !self.straight_announced
            && elapsed(self.last_straight_at, now, STRAIGHT_CHECK_INTERVAL)
            && self.speech.is_ready()
        {
            self.speech.speak(&self.phrases.straight, QueueMode::Flush);
            tracing::debug!(max_angle, distance, "straight path announced");
            self.straight_announced = true;
            self.last_straight_at = Some(now);
            return Some(Announcement::Straight);
        }
        if !straight {
            self.straight_announced = false;
        }
        None
    }

    /// Whether the current straight segment was already announced
    #[must_use]
    pub const fn straight_announced(&self) -> bool {
        self.straight_announced
    }

    /// Release the speech sink; announcements are silent afterwards
    pub fn shutdown(&mut self) {
        self.speech.shutdown();
    }

    fn turn_phrase(&self, direction: TurnDirection, intensity: TurnIntensity) -> String {
        let word = match direction {
            TurnDirection::Left => &self.phrases.left,
            TurnDirection::Right => &self.phrases.right,
        };
        vec![word.as_str(); intensity.repeat()].join(&self.phrases.separator)
    }
}

fn elapsed(last: Option<Instant>, now: Instant, interval: Duration) -> bool {
    last.is_none_or(|at| now.saturating_duration_since(at) > interval)
}
