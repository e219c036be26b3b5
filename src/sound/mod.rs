//! Sound output
//!
//! Position shaping, panning and rate strategies, the mixing engine
//! interface with its cpal implementation, and the channel controller.

mod channels;
mod decode;
mod engine;
mod mixer;
mod panning;
mod rate;
mod shaping;

pub use channels::{
    AlertKind, ChannelController, ChannelOutput, ChannelRole, ChannelState, LOOP_CHANNELS,
    SessionState, SteeringTuning,
};
pub use decode::{Clip, decode_file, decode_mp3, decode_wav};
pub use engine::{LoadCallback, MixingEngine, SoundHandle};
pub use mixer::{CpalMixer, MixerState};
pub use panning::{HardPan, LinearThresholdPan, PanningKind, PanningStrategy, StereoVolume};
pub use rate::{RateCurve, RateStrategy};
pub use shaping::{Interpolator, clamped_lerp, lane_remap, lerp, max_lane_position, shape};
