//! Guideline Audio - audio feedback for hands-free line following
//!
//! Turns the navigation pipeline's signals into sound a runner can follow
//! without looking at a screen:
//! - Stereo-panned, rate-modulated steering and warning loops
//! - A turning loop and spoken turn and straight-path cues
//! - One-shot alerts for a lost line, low battery and notifications
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Navigation / vision pipeline           │
//! │  position  │  turning  │  straight  │  no line      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 GuidanceControl                     │
//! │   ChannelController        │   Announcer            │
//! └──────────┬─────────────────┴──────────┬─────────────┘
//!            │                            │
//! ┌──────────▼──────────┐      ┌──────────▼─────────────┐
//! │ MixingEngine (cpal) │      │ SpeechSink (espeak-ng) │
//! └─────────────────────┘      └────────────────────────┘
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod sound;
pub mod speech;

pub use config::Config;
pub use control::GuidanceControl;
pub use error::{Error, Result};
