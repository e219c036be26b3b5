//! TOML configuration file loading
//!
//! Supports `~/.config/guideline/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::Config;
use crate::Result;
use crate::sound::{PanningKind, RateCurve};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuidelineConfigFile {
    /// Steering and warning loop tuning
    #[serde(default)]
    pub steering: SteeringFileConfig,

    /// Turn tone and announcement thresholds
    #[serde(default)]
    pub turns: TurnsFileConfig,

    /// Sound resource locations
    #[serde(default)]
    pub sounds: SoundsFileConfig,

    /// Speech locale and phrases
    #[serde(default)]
    pub speech: SpeechFileConfig,
}

/// Steering-related configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SteeringFileConfig {
    pub sensitivity: Option<f32>,
    pub curvature: Option<f32>,
    pub max_warning_volume: Option<f32>,
    pub panner: Option<PanningKind>,
    pub warning_panner: Option<PanningKind>,
    pub rate: Option<RateCurve>,
    pub warning_rate: Option<RateCurve>,
}

/// Turn cue configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TurnsFileConfig {
    pub min_angle_degrees: Option<f32>,
    pub double_angle_degrees: Option<f32>,
    pub max_angle_degrees: Option<f32>,
    pub max_volume: Option<f32>,
    pub fast_turns: Option<bool>,
    /// Play the turning loop alongside speech
    pub tone: Option<bool>,
}

/// Sound file locations; relative paths resolve against `dir`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SoundsFileConfig {
    pub dir: Option<PathBuf>,
    pub steering: Option<PathBuf>,
    pub warning: Option<PathBuf>,
    pub turn: Option<PathBuf>,
    pub stop: Option<PathBuf>,
    pub low_battery: Option<PathBuf>,
    pub alert_notification: Option<PathBuf>,
}

/// Speech configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeechFileConfig {
    pub locale: Option<String>,
    pub left: Option<String>,
    pub right: Option<String>,
    pub straight: Option<String>,
    pub separator: Option<String>,
}

impl GuidelineConfigFile {
    /// Overlay the values present in the file onto `base`
    #[must_use]
    pub fn apply(self, mut base: Config) -> Config {
        let steering = self.steering;
        override_with(&mut base.sensitivity, steering.sensitivity);
        override_with(&mut base.sensitivity_curvature, steering.curvature);
        override_with(&mut base.max_warning_volume, steering.max_warning_volume);
        override_with(&mut base.steering_panner, steering.panner);
        override_with(&mut base.warning_panner, steering.warning_panner);
        override_with(&mut base.steering_rate, steering.rate);
        override_with(&mut base.warning_rate, steering.warning_rate);

        let turns = self.turns;
        override_with(&mut base.min_turn_angle_degrees, turns.min_angle_degrees);
        override_with(&mut base.double_turn_angle_degrees, turns.double_angle_degrees);
        override_with(&mut base.max_turn_angle_degrees, turns.max_angle_degrees);
        override_with(&mut base.max_turning_volume, turns.max_volume);
        override_with(&mut base.fast_turns, turns.fast_turns);
        override_with(&mut base.turn_tone, turns.tone);

        let sounds = self.sounds;
        let resources = &mut base.sounds;
        override_with(&mut resources.steering, sounds.steering);
        override_with(&mut resources.warning, sounds.warning);
        override_with(&mut resources.turn, sounds.turn);
        override_with(&mut resources.stop, sounds.stop);
        override_with(&mut resources.low_battery, sounds.low_battery);
        override_with(&mut resources.alert_notification, sounds.alert_notification);
        if let Some(dir) = sounds.dir {
            base.sounds = base.sounds.in_dir(&dir);
        }

        let speech = self.speech;
        override_with(&mut base.speech.locale, speech.locale);
        override_with(&mut base.speech.left, speech.left);
        override_with(&mut base.speech.right, speech.right);
        override_with(&mut base.speech.straight, speech.straight);
        override_with(&mut base.speech.separator, speech.separator);

        base
    }
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Load the TOML config file from the standard path
///
/// Returns `GuidelineConfigFile::default()` if the file doesn't exist or can't
/// be parsed.
pub fn load_config_file() -> GuidelineConfigFile {
    let Some(path) = config_file_path() else {
        return GuidelineConfigFile::default();
    };

    if !path.exists() {
        return GuidelineConfigFile::default();
    }

    match load_from_path(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            GuidelineConfigFile::default()
        }
    }
}

/// Read and parse a TOML config file
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid config TOML
pub fn load_from_path(path: &Path) -> Result<GuidelineConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Return the config file path: `~/.config/guideline/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("guideline").join("config.toml"))
}
