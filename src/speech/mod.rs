//! Spoken announcements
//!
//! A [`SpeechSink`] backend wrapped in [`Speech`] readiness tracking, and the
//! [`Announcer`] that decides when turns and straights are worth saying.

mod announcer;
mod espeak;
mod sink;

pub use announcer::{
    Announcement, Announcer, STRAIGHT_CHECK_INTERVAL, STRAIGHT_MAX_ANGLE_DEGREES,
    STRAIGHT_MIN_DISTANCE, TURN_ANGLE_CHANGE_DEGREES, TURN_ANNOUNCEMENT_INTERVAL, TurnDirection,
    TurnIntensity, TurnTiers,
};
pub use espeak::EspeakSink;
pub use sink::{QueueMode, Speech, SpeechInit, SpeechSink};
