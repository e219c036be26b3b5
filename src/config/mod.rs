//! Configuration for the guidance audio core
//!
//! A [`Config`] is fixed at construction. Defaults reproduce the tuning of the
//! shipped product; a TOML file (see [`file`]) can override any of it.

pub mod file;

use std::path::{Path, PathBuf};

use crate::sound::{PanningKind, RateCurve};
use crate::{Error, Result};

/// Tunables for steering, turn cues and announcements
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Fraction of the lane half-width treated as the usable band, in `[0, 1)`
    pub sensitivity: f32,

    /// Elbow shaping strength, in `[0, 1]`
    pub sensitivity_curvature: f32,

    /// Ceiling on warning loop volume
    pub max_warning_volume: f32,

    /// Ceiling on turning tone volume
    pub max_turning_volume: f32,

    /// Smallest curve angle that produces any turn cue
    pub min_turn_angle_degrees: f32,

    /// Angle at which the announcement word is doubled
    pub double_turn_angle_degrees: f32,

    /// Angle at which the announcement word is tripled and the tone peaks
    pub max_turn_angle_degrees: f32,

    /// Raise the turning tone rate with curve sharpness
    pub fast_turns: bool,

    /// Drive the turning loop in addition to spoken turn cues
    pub turn_tone: bool,

    /// Panner for the steering loop
    pub steering_panner: PanningKind,

    /// Panner for the warning loop
    pub warning_panner: PanningKind,

    /// Rate curve for the steering loop
    pub steering_rate: RateCurve,

    /// Rate curve for the warning loop
    pub warning_rate: RateCurve,

    /// Sound resource locations
    pub sounds: SoundResources,

    /// Speech locale and phrases
    pub speech: SpeechConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensitivity: 0.35,
            sensitivity_curvature: 0.4,
            max_warning_volume: 1.0,
            max_turning_volume: 0.1875,
            min_turn_angle_degrees: 5.0,
            double_turn_angle_degrees: 10.0,
            max_turn_angle_degrees: 30.0,
            fast_turns: false,
            turn_tone: false,
            steering_panner: PanningKind::HardPan { reversed: false },
            warning_panner: PanningKind::LinearThreshold { threshold: 0.4 },
            steering_rate: RateCurve::STEERING,
            warning_rate: RateCurve::WARNING,
            sounds: SoundResources::default(),
            speech: SpeechConfig::default(),
        }
    }
}

/// Paths of the six sound resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundResources {
    /// Steering loop
    pub steering: PathBuf,
    /// Warning loop
    pub warning: PathBuf,
    /// Turning loop
    pub turn: PathBuf,
    /// Line-lost alert
    pub stop: PathBuf,
    /// Low battery alert
    pub low_battery: PathBuf,
    /// Notification alert
    pub alert_notification: PathBuf,
}

impl Default for SoundResources {
    fn default() -> Self {
        Self {
            steering: PathBuf::from("steering.wav"),
            warning: PathBuf::from("warning.wav"),
            turn: PathBuf::from("turn.wav"),
            stop: PathBuf::from("stop.wav"),
            low_battery: PathBuf::from("low_battery.wav"),
            alert_notification: PathBuf::from("alert_notification.wav"),
        }
    }
}

impl SoundResources {
    /// Resolve relative paths against `dir`; absolute paths are kept
    #[must_use]
    pub fn in_dir(self, dir: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { dir.join(p) };
        Self {
            steering: resolve(self.steering),
            warning: resolve(self.warning),
            turn: resolve(self.turn),
            stop: resolve(self.stop),
            low_battery: resolve(self.low_battery),
            alert_notification: resolve(self.alert_notification),
        }
    }
}

/// Speech locale and the words used in announcements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    /// Voice locale passed to the speech backend
    pub locale: String,
    /// Word for a left curve; repeated per intensity tier
    pub left: String,
    /// Word for a right curve; repeated per intensity tier
    pub right: String,
    /// Sentence spoken when a long straight lies ahead
    pub straight: String,
    /// Placed between repeated words
    pub separator: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            locale: "zh".to_string(),
            left: "左".to_string(),
            right: "右".to_string(),
            straight: "前方直线，你可以尽情奔跑".to_string(),
            separator: String::new(),
        }
    }
}

impl Config {
    /// Load defaults overlaid with a TOML file
    ///
    /// Uses `path` when given, otherwise the standard config location if it
    /// exists. The result is validated.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit file cannot be read or parsed, or if the
    /// merged configuration is out of range
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let overlay = match path {
            Some(path) => file::load_from_path(path)?,
            None => file::load_config_file(),
        };
        let config = overlay.apply(Self::default());
        config.validate()?;
        Ok(config)
    }

    /// Range-check every tunable
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first offending field
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.sensitivity) {
            return Err(Error::Config(format!(
                "sensitivity must be in [0, 1), got {}",
                self.sensitivity
            )));
        }
        if !(0.0..=1.0).contains(&self.sensitivity_curvature) {
            return Err(Error::Config(format!(
                "sensitivity curvature must be in [0, 1], got {}",
                self.sensitivity_curvature
            )));
        }
        for (name, volume) in [
            ("max warning volume", self.max_warning_volume),
            ("max turning volume", self.max_turning_volume),
        ] {
            if !(0.0..=1.0).contains(&volume) {
                return Err(Error::Config(format!(
                    "{name} must be in [0, 1], got {volume}"
                )));
            }
        }
        let (min, double, max) = (
            self.min_turn_angle_degrees,
            self.double_turn_angle_degrees,
            self.max_turn_angle_degrees,
        );
        if !(min >= 0.0 && min < double && double < max) {
            return Err(Error::Config(format!(
                "turn angles must satisfy 0 <= min < double < max, got {min}/{double}/{max}"
            )));
        }
        for (name, panner) in [
            ("steering panner", self.steering_panner),
            ("warning panner", self.warning_panner),
        ] {
            if !panner.is_valid() {
                return Err(Error::Config(format!("{name} is invalid: {panner:?}")));
            }
        }
        for (name, curve) in [
            ("steering rate", self.steering_rate),
            ("warning rate", self.warning_rate),
        ] {
            if !curve.is_valid() {
                return Err(Error::Config(format!("{name} is invalid: {curve:?}")));
            }
        }
        if self.speech.left.is_empty() || self.speech.right.is_empty() {
            return Err(Error::Config("turn words must not be empty".to_string()));
        }
        Ok(())
    }
}
