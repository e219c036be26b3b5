//! Guidance control facade
//!
//! Single entry point for the navigation pipeline. Routes steering input to
//! the [`ChannelController`] and curvature input to the [`Announcer`] and the
//! turning loop. No call returns an error; failures are logged where they
//! happen.

use std::sync::Arc;
use std::time::Instant;

use crate::Result;
use crate::config::Config;
use crate::sound::{
    ChannelController, ChannelOutput, Interpolator, MixingEngine, StereoVolume, SteeringTuning,
    clamped_lerp,
};
use crate::speech::{Announcement, Announcer, Speech};

/// Audio feedback for one guidance session
pub struct GuidanceControl {
    config: Config,
    channels: ChannelController,
    announcer: Announcer,
    stopped: bool,
}

impl GuidanceControl {
    /// Validate `config` and start loading every sound
    ///
    /// Loops start muted once their resources finish loading; calls made
    /// before that are harmless no-ops.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is out of range
    pub fn new(config: Config, engine: Arc<dyn MixingEngine>, speech: Speech) -> Result<Self> {
        config.validate()?;
        let channels = ChannelController::new(engine, SteeringTuning::from_config(&config));
        channels.load(&config.sounds);
        let announcer = Announcer::new(speech, &config);
        tracing::debug!(turn_tone = config.turn_tone, "guidance control created");

        Ok(Self {
            config,
            channels,
            announcer,
            stopped: false,
        })
    }

    /// Lateral offset from the line, -1 full left to 1 full right
    pub fn set_position(&mut self, position: f32) {
        self.channels.set_position(position);
    }

    /// Signed curvature of the line ahead in degrees; negative curves left
    pub fn set_turning(&mut self, angle: f32) -> Option<Announcement> {
        self.set_turning_at(angle, Instant::now())
    }

    /// [`Self::set_turning`] as of `now`
    pub fn set_turning_at(&mut self, angle: f32, now: Instant) -> Option<Announcement> {
        if self.stopped {
            return None;
        }
        if !angle.is_finite() {
            tracing::trace!(angle, "ignoring non-finite turn angle");
            return None;
        }
        let announcement = self.announcer.on_turn_at(angle, now);
        if self.config.turn_tone {
            self.channels.set_turning_tone(turn_tone(angle, &self.config));
        } else {
            self.channels.silence_turning();
        }
        announcement
    }

    /// Largest turn angle over the look-ahead and its distance
    pub fn check_straight_path(&mut self, max_angle: f32, distance: f32) -> Option<Announcement> {
        self.check_straight_path_at(max_angle, distance, Instant::now())
    }

    /// [`Self::check_straight_path`] as of `now`
    pub fn check_straight_path_at(
        &mut self,
        max_angle: f32,
        distance: f32,
        now: Instant,
    ) -> Option<Announcement> {
        if self.stopped {
            return None;
        }
        self.announcer.check_straight_path_at(max_angle, distance, now)
    }

    /// The line is no longer detected
    pub fn set_no_line_found(&mut self) {
        self.channels.set_no_line_found();
    }

    /// Play the low battery alert
    pub fn warn_low_battery(&self) {
        self.channels.warn_low_battery();
    }

    /// Play the notification alert
    pub fn alert_notification(&self) {
        self.channels.alert_notification();
    }

    /// Mute all loops until the next position
    pub fn pause(&self) {
        self.channels.pause();
    }

    /// Leave the loops muted until the next position arrives
    pub fn resume(&self) {
        self.channels.resume();
    }

    /// Release every sound and the speech sink; later calls do nothing
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.channels.stop();
        self.announcer.shutdown();
        tracing::debug!("guidance control stopped");
    }

    /// Whether [`Self::stop`] was called
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Channel state and last outputs, for diagnostics
    #[must_use]
    pub const fn channels(&self) -> &ChannelController {
        &self.channels
    }

    /// The validated configuration
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for GuidanceControl {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Turning loop output for a signed curve angle
///
/// Volume ramps from silent at the minimum turn angle to
/// `max_turning_volume` at the maximum and sounds in the ear opposite the
/// curve. With `fast_turns` the rate rises from 1 to 2 over the same band.
#[must_use]
pub fn turn_tone(angle: f32, config: &Config) -> ChannelOutput {
    let magnitude = angle.abs();
    let (min, max) = (config.min_turn_angle_degrees, config.max_turn_angle_degrees);
    let level = clamped_lerp(
        magnitude,
        min,
        max,
        0.0,
        config.max_turning_volume,
        Interpolator::Linear,
    );
    let volume = if angle < 0.0 {
        StereoVolume::new(0.0, level)
    } else {
        StereoVolume::new(level, 0.0)
    };
    let rate = if config.fast_turns {
        clamped_lerp(magnitude, min, max, 1.0, 2.0, Interpolator::Linear)
    } else {
        1.0
    };
    ChannelOutput { volume, rate }
}
