//! Audio mixing engine interface
//!
//! The channel controller talks to audio output only through this trait, so
//! the real cpal mixer and test doubles are interchangeable.

use std::path::Path;

use super::panning::StereoVolume;
use crate::Result;

/// Opaque handle to a sound resource loaded into an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundHandle(pub u32);

impl std::fmt::Display for SoundHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sound#{}", self.0)
    }
}

/// Completion callback for [`MixingEngine::load`]
///
/// May be invoked on any thread, at most once, possibly before `load` returns.
pub type LoadCallback = Box<dyn FnOnce(Result<SoundHandle>) + Send + 'static>;

/// A mixer that can load sound resources and play them as loops or one-shots
///
/// Every playback method is fire-and-forget: unknown or released handles are
/// ignored and no call blocks on audio I/O.
pub trait MixingEngine: Send + Sync {
    /// Begin loading `resource`, returning its handle immediately
    fn load(&self, resource: &Path, on_complete: LoadCallback) -> SoundHandle;

    /// Start looping a loaded sound indefinitely
    fn play_loop(&self, handle: SoundHandle, volume: StereoVolume, rate: f32);

    /// Retarget the volume of a playing sound
    fn set_volume(&self, handle: SoundHandle, volume: StereoVolume);

    /// Retarget the playback rate of a playing sound
    fn set_rate(&self, handle: SoundHandle, rate: f32);

    /// Play a loaded sound once; a lower-priority request never interrupts a
    /// higher-priority one-shot already playing
    fn play_once(&self, handle: SoundHandle, volume: StereoVolume, priority: u8);

    /// Stop any playback of `handle`
    fn stop(&self, handle: SoundHandle);

    /// Free the decoded resource; the handle is invalid afterwards
    fn release(&self, handle: SoundHandle);
}
