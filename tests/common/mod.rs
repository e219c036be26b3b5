//! Shared test utilities
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use guideline_audio::config::{Config, SoundResources};
use guideline_audio::sound::{LoadCallback, MixingEngine, SoundHandle, StereoVolume};
use guideline_audio::speech::{QueueMode, Speech, SpeechSink};
use guideline_audio::{Error, GuidanceControl};

/// One call made on the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(PathBuf, SoundHandle),
    PlayLoop(SoundHandle, StereoVolume, f32),
    SetVolume(SoundHandle, StereoVolume),
    SetRate(SoundHandle, f32),
    PlayOnce(SoundHandle, StereoVolume, u8),
    Stop(SoundHandle),
    Release(SoundHandle),
}

#[derive(Default)]
struct Inner {
    next_handle: u32,
    calls: Vec<Call>,
    pending: HashMap<PathBuf, (SoundHandle, LoadCallback)>,
    failing: HashSet<PathBuf>,
}

/// Engine that records every call and completes loads on demand
#[derive(Default)]
pub struct RecordingEngine {
    inner: Mutex<Inner>,
    immediate: bool,
}

impl RecordingEngine {
    /// Loads stay pending until [`Self::complete`]
    #[must_use]
    pub fn manual() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Loads complete synchronously inside `load`
    #[must_use]
    pub fn immediate() -> Arc<Self> {
        Arc::new(Self {
            immediate: true,
            ..Self::default()
        })
    }

    /// Make the load of `path` fail when it completes
    pub fn fail(&self, path: impl Into<PathBuf>) {
        self.inner.lock().unwrap().failing.insert(path.into());
    }

    /// Deliver the completion for `path`; false if nothing was pending
    pub fn complete(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let entry = {
            let mut inner = self.inner.lock().unwrap();
            let failing = inner.failing.contains(path);
            inner.pending.remove(path).map(|entry| (entry, failing))
        };
        // The callback may call back into the engine, so the lock is released
        match entry {
            Some(((handle, callback), failing)) => {
                callback(result_for(path, handle, failing));
                true
            }
            None => false,
        }
    }

    /// Paths whose loads have not completed yet
    pub fn pending(&self) -> Vec<PathBuf> {
        self.inner.lock().unwrap().pending.keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    /// Handle returned for the load of `path`
    pub fn handle_for(&self, path: impl AsRef<Path>) -> SoundHandle {
        let path = path.as_ref();
        self.calls()
            .into_iter()
            .find_map(|call| match call {
                Call::Load(p, handle) if p == path => Some(handle),
                _ => None,
            })
            .unwrap_or_else(|| panic!("{} was never loaded", path.display()))
    }

    pub fn play_loops(&self) -> Vec<(SoundHandle, StereoVolume, f32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::PlayLoop(h, v, r) => Some((h, v, r)),
                _ => None,
            })
            .collect()
    }

    pub fn play_onces(&self) -> Vec<(SoundHandle, StereoVolume, u8)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::PlayOnce(h, v, p) => Some((h, v, p)),
                _ => None,
            })
            .collect()
    }

    /// Most recent volume set on `handle`, including the one it started with
    pub fn last_volume(&self, handle: SoundHandle) -> Option<StereoVolume> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::SetVolume(h, v) | Call::PlayLoop(h, v, _) if h == handle => Some(v),
            _ => None,
        })
    }

    /// Most recent rate set on `handle`, including the one it started with
    pub fn last_rate(&self, handle: SoundHandle) -> Option<f32> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::SetRate(h, r) | Call::PlayLoop(h, _, r) if h == handle => Some(r),
            _ => None,
        })
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

fn result_for(path: &Path, handle: SoundHandle, failing: bool) -> guideline_audio::Result<SoundHandle> {
    if failing {
        Err(Error::Decode(format!("{} is corrupt", path.display())))
    } else {
        Ok(handle)
    }
}

impl MixingEngine for RecordingEngine {
    fn load(&self, path: &Path, on_loaded: LoadCallback) -> SoundHandle {
        let (handle, failing) = {
            let mut inner = self.inner.lock().unwrap();
            inner.next_handle += 1;
            let handle = SoundHandle(inner.next_handle);
            inner.calls.push(Call::Load(path.to_path_buf(), handle));
            (handle, inner.failing.contains(path))
        };
        if self.immediate {
            on_loaded(result_for(path, handle, failing));
        } else {
            self.inner
                .lock()
                .unwrap()
                .pending
                .insert(path.to_path_buf(), (handle, on_loaded));
        }
        handle
    }

    fn play_loop(&self, handle: SoundHandle, volume: StereoVolume, rate: f32) {
        self.record(Call::PlayLoop(handle, volume, rate));
    }

    fn set_volume(&self, handle: SoundHandle, volume: StereoVolume) {
        self.record(Call::SetVolume(handle, volume));
    }

    fn set_rate(&self, handle: SoundHandle, rate: f32) {
        self.record(Call::SetRate(handle, rate));
    }

    fn play_once(&self, handle: SoundHandle, volume: StereoVolume, priority: u8) {
        self.record(Call::PlayOnce(handle, volume, priority));
    }

    fn stop(&self, handle: SoundHandle) {
        self.record(Call::Stop(handle));
    }

    fn release(&self, handle: SoundHandle) {
        self.record(Call::Release(handle));
    }
}

/// Speech sink that records what it was asked to say
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub spoken: Arc<Mutex<Vec<(String, QueueMode)>>>,
    pub shut_down: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn texts(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl SpeechSink for RecordingSink {
    fn speak(&mut self, text: &str, mode: QueueMode) {
        self.spoken.lock().unwrap().push((text.to_string(), mode));
    }

    fn stop(&mut self) {}

    fn shutdown(&mut self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

/// Default sound paths, never touched on disk by the recording engine
#[must_use]
pub fn sounds() -> SoundResources {
    SoundResources::default()
}

/// A facade over `engine` with ready speech and the given config
pub fn control_with(
    engine: &Arc<RecordingEngine>,
    config: Config,
) -> (GuidanceControl, RecordingSink) {
    let sink = RecordingSink::default();
    let speech = Speech::ready(Box::new(sink.clone()));
    let control = GuidanceControl::new(config, Arc::clone(engine) as Arc<dyn MixingEngine>, speech)
        .expect("valid config");
    (control, sink)
}

/// A facade over `engine` with default config and ready speech
pub fn control(engine: &Arc<RecordingEngine>) -> (GuidanceControl, RecordingSink) {
    control_with(engine, Config::default())
}
