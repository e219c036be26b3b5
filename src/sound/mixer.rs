//! Software mixer on top of a cpal output stream
//!
//! Loops and one-shots are summed in the output callback with per-voice
//! stereo gain and a fractional read step for the playback rate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, mpsc};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream};

use super::decode::{Clip, decode_file};
use super::engine::{LoadCallback, MixingEngine, SoundHandle};
use super::panning::StereoVolume;
use crate::{Error, Result};

/// Preferred output sample rate
const MIXER_SAMPLE_RATE: u32 = 44100;

/// Lowest and highest accepted playback rate, matching common sound pools
const MIN_RATE: f32 = 0.5;
const MAX_RATE: f32 = 2.0;

#[derive(Debug, Clone)]
struct Voice {
    clip: Arc<Clip>,
    cursor: f64,
    volume: StereoVolume,
    rate: f32,
    looping: bool,
    priority: u8,
}

impl Voice {
    fn new(clip: Arc<Clip>, volume: StereoVolume, rate: f32, looping: bool, priority: u8) -> Self {
        Self {
            clip,
            cursor: 0.0,
            volume,
            rate: rate.clamp(MIN_RATE, MAX_RATE),
            looping,
            priority,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finished(&self) -> bool {
        !self.looping && self.cursor >= self.clip.len() as f64
    }

    /// Produce one stereo frame and advance
    fn next_frame(&mut self, device_rate: u32) -> (f32, f32) {
        let sample = self.clip.sample_at(self.cursor, self.looping);
        let step = f64::from(self.rate) * f64::from(self.clip.sample_rate) / f64::from(device_rate);
        self.cursor += step;
        #[allow(clippy::cast_precision_loss)]
        let len = self.clip.len() as f64;
        if self.looping && self.cursor >= len {
            self.cursor %= len;
        }
        (sample * self.volume.left, sample * self.volume.right)
    }
}

/// Loaded clips and active voices, shared with the output callback
#[derive(Debug, Default)]
pub struct MixerState {
    clips: HashMap<SoundHandle, Arc<Clip>>,
    loops: HashMap<SoundHandle, Voice>,
    one_shot: Option<(SoundHandle, Voice)>,
}

impl MixerState {
    /// Register a decoded clip under `handle`
    pub fn insert_clip(&mut self, handle: SoundHandle, clip: Clip) {
        self.clips.insert(handle, Arc::new(clip));
    }

    /// Whether `handle` is currently producing sound, looped or one-shot
    #[must_use]
    pub fn is_active(&self, handle: SoundHandle) -> bool {
        self.loops.contains_key(&handle) || self.one_shot.as_ref().is_some_and(|(h, _)| *h == handle)
    }

    fn play_loop(&mut self, handle: SoundHandle, volume: StereoVolume, rate: f32) {
        let Some(clip) = self.clips.get(&handle) else {
            tracing::debug!(%handle, "play_loop on unknown sound");
            return;
        };
        let voice = Voice::new(Arc::clone(clip), volume, rate, true, 0);
        self.loops.insert(handle, voice);
    }

    fn play_once(&mut self, handle: SoundHandle, volume: StereoVolume, priority: u8) {
        let Some(clip) = self.clips.get(&handle) else {
            tracing::debug!(%handle, "play_once on unknown sound");
            return;
        };
        if let Some((_, current)) = &self.one_shot {
            if !current.finished() && current.priority > priority {
                tracing::debug!(%handle, priority, "one-shot dropped for higher priority sound");
                return;
            }
        }
        let voice = Voice::new(Arc::clone(clip), volume, 1.0, false, priority);
        self.one_shot = Some((handle, voice));
    }

    fn set_volume(&mut self, handle: SoundHandle, volume: StereoVolume) {
        if let Some(voice) = self.loops.get_mut(&handle) {
            voice.volume = volume;
        }
    }

    fn set_rate(&mut self, handle: SoundHandle, rate: f32) {
        if let Some(voice) = self.loops.get_mut(&handle) {
            voice.rate = rate.clamp(MIN_RATE, MAX_RATE);
        }
    }

    fn stop(&mut self, handle: SoundHandle) {
        self.loops.remove(&handle);
        if self.one_shot.as_ref().is_some_and(|(h, _)| *h == handle) {
            self.one_shot = None;
        }
    }

    fn release(&mut self, handle: SoundHandle) {
        self.stop(handle);
        self.clips.remove(&handle);
    }

    /// Mix all voices into an interleaved output buffer
    ///
    /// Left goes to channel 0 and right to channel 1; extra channels are
    /// zeroed. A mono device gets the average of both sides.
    pub fn render(&mut self, out: &mut [f32], channels: usize, device_rate: u32) {
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            let (mut left, mut right) = (0.0_f32, 0.0_f32);
            for voice in self.loops.values_mut() {
                let (l, r) = voice.next_frame(device_rate);
                left += l;
                right += r;
            }
            if let Some((_, voice)) = &mut self.one_shot {
                let (l, r) = voice.next_frame(device_rate);
                left += l;
                right += r;
            }

            frame.fill(0.0);
            if channels == 1 {
                frame[0] = f32::midpoint(left, right).clamp(-1.0, 1.0);
            } else {
                frame[0] = left.clamp(-1.0, 1.0);
                frame[1] = right.clamp(-1.0, 1.0);
            }
        }

        if self.one_shot.as_ref().is_some_and(|(_, v)| v.finished()) {
            self.one_shot = None;
        }
    }
}

/// [`MixingEngine`] that plays to the default output device
///
/// The cpal stream lives on a dedicated thread because streams are not `Send`
/// on every platform.
pub struct CpalMixer {
    state: Arc<Mutex<MixerState>>,
    next_handle: AtomicU32,
    device_rate: u32,
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
}

impl CpalMixer {
    /// Open the default output device and start the mixing stream
    ///
    /// # Errors
    ///
    /// Returns error if no usable output device or stream configuration exists
    pub fn new() -> Result<Self> {
        let state = Arc::new(Mutex::new(MixerState::default()));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let stream_state = Arc::clone(&state);
        std::thread::Builder::new()
            .name("guideline-mixer".to_string())
            .spawn(move || match open_stream(stream_state) {
                Ok((stream, rate)) => {
                    let _ = ready_tx.send(Ok(rate));
                    // Blocks until the mixer is dropped
                    let _ = shutdown_rx.recv();
                    drop(stream);
                    tracing::debug!("mixer stream closed");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })?;

        let device_rate = ready_rx
            .recv()
            .map_err(|_| Error::Audio("mixer thread exited before opening a stream".to_string()))??;

        Ok(Self {
            state,
            next_handle: AtomicU32::new(1),
            device_rate,
            shutdown: Mutex::new(Some(shutdown_tx)),
        })
    }

    /// Output sample rate of the open stream
    #[must_use]
    pub const fn device_rate(&self) -> u32 {
        self.device_rate
    }

    fn state(&self) -> MutexGuard<'_, MixerState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl MixingEngine for CpalMixer {
    fn load(&self, resource: &Path, on_complete: LoadCallback) -> SoundHandle {
        let handle = SoundHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let state = Arc::clone(&self.state);
        let path: PathBuf = resource.to_path_buf();
        // Shared so the callback still fires if the loader thread never starts
        let callback = Arc::new(Mutex::new(Some(on_complete)));
        let loader_callback = Arc::clone(&callback);

        let spawned = std::thread::Builder::new()
            .name(format!("guideline-load-{}", handle.0))
            .spawn(move || {
                let result = decode_file(&path).map(|clip| {
                    state
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .insert_clip(handle, clip);
                    handle
                });
                if let Some(on_complete) = take_callback(&loader_callback) {
                    on_complete(result);
                }
            });

        if let Err(e) = spawned {
            tracing::error!(%handle, error = %e, "failed to spawn sound loader");
            if let Some(on_complete) = take_callback(&callback) {
                on_complete(Err(Error::Io(e)));
            }
        }
        handle
    }

    fn play_loop(&self, handle: SoundHandle, volume: StereoVolume, rate: f32) {
        self.state().play_loop(handle, volume, rate);
    }

    fn set_volume(&self, handle: SoundHandle, volume: StereoVolume) {
        self.state().set_volume(handle, volume);
    }

    fn set_rate(&self, handle: SoundHandle, rate: f32) {
        self.state().set_rate(handle, rate);
    }

    fn play_once(&self, handle: SoundHandle, volume: StereoVolume, priority: u8) {
        self.state().play_once(handle, volume, priority);
    }

    fn stop(&self, handle: SoundHandle) {
        self.state().stop(handle);
    }

    fn release(&self, handle: SoundHandle) {
        self.state().release(handle);
    }
}

impl Drop for CpalMixer {
    fn drop(&mut self) {
        if let Ok(mut shutdown) = self.shutdown.lock() {
            shutdown.take();
        }
    }
}

fn take_callback(slot: &Mutex<Option<LoadCallback>>) -> Option<LoadCallback> {
    slot.lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .take()
}

/// Build and start the output stream, returning it with its sample rate
fn open_stream(state: Arc<Mutex<MixerState>>) -> Result<(Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

    let supports_rate = |c: &cpal::SupportedStreamConfigRange| {
        c.sample_format() == cpal::SampleFormat::F32
            && c.min_sample_rate() <= SampleRate(MIXER_SAMPLE_RATE)
            && c.max_sample_rate() >= SampleRate(MIXER_SAMPLE_RATE)
    };

    let supported_config = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| c.channels() == 2 && supports_rate(c))
        .or_else(|| {
            // Fallback: mono
            device
                .supported_output_configs()
                .ok()?
                .find(|c| c.channels() == 1 && supports_rate(c))
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

    let config = supported_config
        .with_sample_rate(SampleRate(MIXER_SAMPLE_RATE))
        .config();
    let channels = usize::from(config.channels);

    tracing::debug!(
        device = %device.name().unwrap_or_default(),
        sample_rate = MIXER_SAMPLE_RATE,
        channels,
        "mixer output initialized"
    );

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| match state.lock() {
                Ok(mut mixer) => mixer.render(data, channels, MIXER_SAMPLE_RATE),
                Err(_) => data.fill(0.0),
            },
            |err| {
                tracing::error!(error = %err, "mixer stream error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    Ok((stream, MIXER_SAMPLE_RATE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_clip(value: f32, frames: usize) -> Clip {
        Clip {
            samples: vec![value; frames],
            sample_rate: 8000,
        }
    }

    #[test]
    fn test_render_applies_stereo_volume() {
        let mut mixer = MixerState::default();
        let handle = SoundHandle(1);
        mixer.insert_clip(handle, constant_clip(0.5, 16));
        mixer.play_loop(handle, StereoVolume::new(1.0, 0.0), 1.0);

        let mut out = vec![0.0; 8];
        mixer.render(&mut out, 2, 8000);
        for frame in out.chunks(2) {
            assert!((frame[0] - 0.5).abs() < 1e-6);
            assert_eq!(frame[1], 0.0);
        }
    }

    #[test]
    fn test_loop_keeps_playing_past_clip_end() {
        let mut mixer = MixerState::default();
        let handle = SoundHandle(1);
        mixer.insert_clip(handle, constant_clip(0.25, 4));
        mixer.play_loop(handle, StereoVolume::FULL, 2.0);

        let mut out = vec![0.0; 64];
        mixer.render(&mut out, 2, 8000);
        assert!(out.iter().all(|s| (s - 0.25).abs() < 1e-6));
        assert!(mixer.is_active(handle));
    }

    #[test]
    fn test_one_shot_finishes_and_clears() {
        let mut mixer = MixerState::default();
        let handle = SoundHandle(2);
        mixer.insert_clip(handle, constant_clip(0.5, 3));
        mixer.play_once(handle, StereoVolume::FULL, 0);
        assert!(mixer.is_active(handle));

        let mut out = vec![0.0; 10];
        mixer.render(&mut out, 1, 8000);
        assert!((out[0] - 0.5).abs() < 1e-6);
        assert_eq!(out[9], 0.0);
        assert!(!mixer.is_active(handle));
    }

    #[test]
    fn test_low_priority_one_shot_does_not_interrupt() {
        let mut mixer = MixerState::default();
        mixer.insert_clip(SoundHandle(1), constant_clip(0.5, 100));
        mixer.insert_clip(SoundHandle(2), constant_clip(0.5, 100));

        mixer.play_once(SoundHandle(1), StereoVolume::FULL, 1);
        mixer.play_once(SoundHandle(2), StereoVolume::FULL, 0);
        assert!(mixer.is_active(SoundHandle(1)));
        assert!(!mixer.is_active(SoundHandle(2)));

        mixer.play_once(SoundHandle(2), StereoVolume::FULL, 1);
        assert!(mixer.is_active(SoundHandle(2)));
    }

    #[test]
    fn test_release_forgets_clip() {
        let mut mixer = MixerState::default();
        let handle = SoundHandle(3);
        mixer.insert_clip(handle, constant_clip(0.5, 8));
        mixer.play_loop(handle, StereoVolume::FULL, 1.0);
        mixer.release(handle);
        assert!(!mixer.is_active(handle));

        mixer.play_loop(handle, StereoVolume::FULL, 1.0);
        assert!(!mixer.is_active(handle));
    }
}
