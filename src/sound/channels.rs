//! Channel controller
//!
//! Owns the three continuous loops (steering, warning, turning) and the
//! one-shot alerts. Loops are started muted as soon as every loop resource has
//! finished loading and are afterwards steered purely through volume and rate,
//! so silencing and resuming never restart playback.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::engine::{MixingEngine, SoundHandle};
use super::panning::{PanningStrategy, StereoVolume};
use super::rate::RateStrategy;
use super::shaping::{lane_remap, shape};
use crate::Result;
use crate::config::{Config, SoundResources};

/// Number of continuous loop channels that must finish loading before start
pub const LOOP_CHANNELS: usize = 3;

/// Rate the steering and warning loops start at; some decoders ignore later
/// rate changes on clips started at 1.0
const LOOP_START_RATE: f32 = 2.0;

/// A continuously looping channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    /// Corridor sound that pans toward the side to correct
    Steering,
    /// Danger sound near the lane edge
    Warning,
    /// Curve-ahead tone
    Turning,
}

impl ChannelRole {
    /// All loop channels in slot order
    pub const ALL: [Self; LOOP_CHANNELS] = [Self::Steering, Self::Warning, Self::Turning];

    const fn index(self) -> usize {
        match self {
            Self::Steering => 0,
            Self::Warning => 1,
            Self::Turning => 2,
        }
    }

    const fn start_rate(self) -> f32 {
        match self {
            Self::Steering | Self::Warning => LOOP_START_RATE,
            Self::Turning => 1.0,
        }
    }

    fn resource(self, sounds: &SoundResources) -> &Path {
        match self {
            Self::Steering => &sounds.steering,
            Self::Warning => &sounds.warning,
            Self::Turning => &sounds.turn,
        }
    }
}

impl std::fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Steering => write!(f, "steering"),
            Self::Warning => write!(f, "warning"),
            Self::Turning => write!(f, "turning"),
        }
    }
}

/// A one-shot alert sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    /// Played when the line is lost
    Stop,
    /// Device battery is low
    LowBattery,
    /// Generic notification chime
    Notification,
}

impl AlertKind {
    /// All alerts in slot order
    pub const ALL: [Self; 3] = [Self::Stop, Self::LowBattery, Self::Notification];

    const fn index(self) -> usize {
        match self {
            Self::Stop => 0,
            Self::LowBattery => 1,
            Self::Notification => 2,
        }
    }

    /// Stop outranks the informational alerts
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Stop => 1,
            Self::LowBattery | Self::Notification => 0,
        }
    }

    fn resource(self, sounds: &SoundResources) -> &Path {
        match self {
            Self::Stop => &sounds.stop,
            Self::LowBattery => &sounds.low_battery,
            Self::Notification => &sounds.alert_notification,
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::LowBattery => write!(f, "low_battery"),
            Self::Notification => write!(f, "notification"),
        }
    }
}

/// Lifecycle of a single channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// No load requested yet
    #[default]
    Unloaded,
    /// Waiting for the engine to finish loading
    Loading,
    /// Loaded, not yet playing
    Ready,
    /// Looping with a non-zero volume
    Playing,
    /// Looping at zero volume
    Silenced,
    /// Resource failed to load; permanently silent
    Failed,
    /// Torn down by [`ChannelController::stop`]
    Stopped,
}

impl ChannelState {
    /// Whether the loop is running and accepts volume/rate changes
    #[must_use]
    pub const fn is_looping(self) -> bool {
        matches!(self, Self::Playing | Self::Silenced)
    }
}

/// Whether steering feedback is live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No position yet, or the line was lost
    #[default]
    Paused,
    /// Positions are being turned into sound
    Active,
}

/// Volume and rate last applied to a channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelOutput {
    /// Stereo volume
    pub volume: StereoVolume,
    /// Playback-rate multiplier
    pub rate: f32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    handle: Option<SoundHandle>,
    state: ChannelState,
}

#[derive(Debug, Default)]
struct Slots {
    loops: [Slot; LOOP_CHANNELS],
    alerts: [Slot; 3],
    stopped: bool,
}

impl Slots {
    fn any_looping(&self) -> bool {
        self.loops.iter().any(|s| s.state.is_looping())
    }
}

/// State reachable from engine load callbacks on arbitrary threads
struct LoadTracker {
    engine: Arc<dyn MixingEngine>,
    completed: AtomicUsize,
    started: AtomicBool,
    slots: Mutex<Slots>,
}

impl LoadTracker {
    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn on_loop_loaded(&self, role: ChannelRole, result: Result<SoundHandle>) {
        {
            let mut slots = self.slots();
            let stopped = slots.stopped;
            let slot = &mut slots.loops[role.index()];
            match result {
                Ok(handle) if stopped => {
                    tracing::debug!(%role, %handle, "loop loaded after stop, releasing");
                    self.engine.release(handle);
                }
                Ok(handle) => {
                    tracing::debug!(%role, %handle, "loop loaded");
                    slot.handle = Some(handle);
                    slot.state = ChannelState::Ready;
                }
                Err(e) => {
                    tracing::error!(%role, error = %e, "unable to load loop sound, channel stays silent");
                    slot.state = ChannelState::Failed;
                }
            }
        }

        let completed = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        if completed == LOOP_CHANNELS
            && self
                .started
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            self.start_loops();
        }
    }

    fn on_alert_loaded(&self, kind: AlertKind, result: Result<SoundHandle>) {
        let mut slots = self.slots();
        let stopped = slots.stopped;
        let slot = &mut slots.alerts[kind.index()];
        match result {
            Ok(handle) if stopped => self.engine.release(handle),
            Ok(handle) => {
                tracing::debug!(alert = %kind, %handle, "alert loaded");
                slot.handle = Some(handle);
                slot.state = ChannelState::Ready;
            }
            Err(e) => {
                tracing::error!(alert = %kind, error = %e, "unable to load alert sound");
                slot.state = ChannelState::Failed;
            }
        }
    }

    /// Start every loaded loop muted
    fn start_loops(&self) {
        let mut slots = self.slots();
        if slots.stopped {
            return;
        }
        for role in ChannelRole::ALL {
            let slot = &mut slots.loops[role.index()];
            if let (ChannelState::Ready, Some(handle)) = (slot.state, slot.handle) {
                self.engine
                    .play_loop(handle, StereoVolume::SILENT, role.start_rate());
                slot.state = ChannelState::Silenced;
            }
        }
        tracing::debug!("loops started muted");
    }
}

/// Panning and rate strategies plus lane tuning used by `set_position`
#[derive(Clone)]
pub struct SteeringTuning {
    /// Fraction of the lane half-width treated as the usable band
    pub sensitivity: f32,
    /// Elbow shaping strength
    pub curvature: f32,
    /// Ceiling applied to the warning volume
    pub max_warning_volume: f32,
    /// Steering channel panner
    pub steering_panner: Arc<dyn PanningStrategy + Send + Sync>,
    /// Warning channel panner
    pub warning_panner: Arc<dyn PanningStrategy + Send + Sync>,
    /// Steering channel rate
    pub steering_rate: Arc<dyn RateStrategy + Send + Sync>,
    /// Warning channel rate
    pub warning_rate: Arc<dyn RateStrategy + Send + Sync>,
}

impl SteeringTuning {
    /// Build the tuning from a configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            sensitivity: config.sensitivity,
            curvature: config.sensitivity_curvature,
            max_warning_volume: config.max_warning_volume,
            steering_panner: Arc::new(config.steering_panner),
            warning_panner: Arc::new(config.warning_panner),
            steering_rate: Arc::new(config.steering_rate),
            warning_rate: Arc::new(config.warning_rate),
        }
    }
}

impl std::fmt::Debug for SteeringTuning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteeringTuning")
            .field("sensitivity", &self.sensitivity)
            .field("curvature", &self.curvature)
            .field("max_warning_volume", &self.max_warning_volume)
            .finish_non_exhaustive()
    }
}

/// Drives the loop and alert channels of a [`MixingEngine`]
pub struct ChannelController {
    tracker: Arc<LoadTracker>,
    tuning: SteeringTuning,
    session: SessionState,
    last_steering: Option<ChannelOutput>,
    last_warning: Option<ChannelOutput>,
}

impl ChannelController {
    /// Create a controller; nothing is loaded until [`Self::load`]
    #[must_use]
    pub fn new(engine: Arc<dyn MixingEngine>, tuning: SteeringTuning) -> Self {
        Self {
            tracker: Arc::new(LoadTracker {
                engine,
                completed: AtomicUsize::new(0),
                started: AtomicBool::new(false),
                slots: Mutex::new(Slots::default()),
            }),
            tuning,
            session: SessionState::Paused,
            last_steering: None,
            last_warning: None,
        }
    }

    /// Begin loading every loop and alert resource
    ///
    /// Loops start muted once all of them have completed, whichever thread
    /// delivers the last completion. Failed resources are logged and stay
    /// silent. Calling this more than once has no effect.
    pub fn load(&self, sounds: &SoundResources) {
        {
            let mut guard = self.tracker.slots();
            let slots = &mut *guard;
            if slots.stopped || slots.loops.iter().any(|s| s.state != ChannelState::Unloaded) {
                tracing::debug!("load ignored, channels already loading");
                return;
            }
            for slot in slots.loops.iter_mut().chain(slots.alerts.iter_mut()) {
                slot.state = ChannelState::Loading;
            }
        }

        let engine = Arc::clone(&self.tracker.engine);
        for role in ChannelRole::ALL {
            let tracker = Arc::clone(&self.tracker);
            let path = role.resource(sounds);
            let handle = engine.load(
                path,
                Box::new(move |result| tracker.on_loop_loaded(role, result)),
            );
            tracing::debug!(%role, %handle, path = %path.display(), "loading loop sound");
        }
        for kind in AlertKind::ALL {
            let tracker = Arc::clone(&self.tracker);
            let path = kind.resource(sounds);
            let handle = engine.load(
                path,
                Box::new(move |result| tracker.on_alert_loaded(kind, result)),
            );
            tracing::debug!(alert = %kind, %handle, path = %path.display(), "loading alert sound");
        }
    }

    /// Steer the steering and warning loops from a raw lateral offset
    ///
    /// No-op until the loops are running, after [`Self::stop`], or for a
    /// non-finite input. Out-of-range offsets are clamped to `[-1, 1]`.
    pub fn set_position(&mut self, raw_position: f32) {
        if !raw_position.is_finite() {
            tracing::trace!(raw_position, "ignoring non-finite position");
            return;
        }
        let raw = raw_position.clamp(-1.0, 1.0);

        let mut slots = self.tracker.slots();
        if slots.stopped || !slots.any_looping() {
            tracing::trace!(raw, "position ignored, loops not running");
            return;
        }
        self.session = SessionState::Active;

        let position = shape(
            lane_remap(raw, self.tuning.sensitivity),
            self.tuning.curvature,
        );
        tracing::trace!(raw, adjusted = position, "set position");

        let steering = ChannelOutput {
            volume: self.tuning.steering_panner.volume(position),
            rate: self.tuning.steering_rate.rate(position),
        };
        let warning = ChannelOutput {
            volume: self
                .tuning
                .warning_panner
                .volume(position)
                .scaled(self.tuning.max_warning_volume),
            rate: self.tuning.warning_rate.rate(position),
        };

        let engine = self.tracker.engine.as_ref();
        apply(engine, &mut slots, ChannelRole::Steering, steering);
        apply(engine, &mut slots, ChannelRole::Warning, warning);
        drop(slots);

        self.last_steering = Some(steering);
        self.last_warning = Some(warning);
    }

    /// Drive the turning loop while the session is active; silence it otherwise
    pub fn set_turning_tone(&mut self, output: ChannelOutput) {
        let mut slots = self.tracker.slots();
        if slots.stopped {
            return;
        }
        let output = if self.session == SessionState::Active {
            output
        } else {
            ChannelOutput {
                volume: StereoVolume::SILENT,
                rate: output.rate,
            }
        };
        apply(
            self.tracker.engine.as_ref(),
            &mut slots,
            ChannelRole::Turning,
            output,
        );
    }

    /// Mute the turning loop without stopping it
    pub fn silence_turning(&self) {
        let mut slots = self.tracker.slots();
        if slots.stopped {
            return;
        }
        mute(self.tracker.engine.as_ref(), &mut slots, ChannelRole::Turning);
    }

    /// The line was lost: play the stop alert, pause steering, mute the loops
    ///
    /// Only acts when the session is active, so repeated events stay quiet.
    pub fn set_no_line_found(&mut self) {
        if self.session != SessionState::Active {
            return;
        }
        self.play_alert(AlertKind::Stop);
        self.session = SessionState::Paused;
        self.silence();
        tracing::debug!("no line found, steering paused");
    }

    /// Play the low battery alert
    pub fn warn_low_battery(&self) {
        self.play_alert(AlertKind::LowBattery);
    }

    /// Play the notification alert
    pub fn alert_notification(&self) {
        self.play_alert(AlertKind::Notification);
    }

    /// Mute every loop while keeping it running for a fast resume
    pub fn pause(&self) {
        self.silence();
        tracing::debug!("channels paused");
    }

    /// Nothing to restore; the next position re-drives the loops
    pub fn resume(&self) {
        tracing::debug!("channels resumed, waiting for next position");
    }

    /// Stop and release every channel; all later calls are no-ops
    pub fn stop(&mut self) {
        let mut slots = self.tracker.slots();
        if slots.stopped {
            return;
        }
        slots.stopped = true;

        let engine = self.tracker.engine.as_ref();
        for slot in &mut slots.loops {
            if let Some(handle) = slot.handle.take() {
                engine.stop(handle);
                engine.release(handle);
            }
            slot.state = ChannelState::Stopped;
        }
        for slot in &mut slots.alerts {
            if let Some(handle) = slot.handle.take() {
                engine.release(handle);
            }
            slot.state = ChannelState::Stopped;
        }
        drop(slots);

        self.session = SessionState::Paused;
        tracing::debug!("channels stopped");
    }

    /// Current state of a loop channel
    #[must_use]
    pub fn channel_state(&self, role: ChannelRole) -> ChannelState {
        self.tracker.slots().loops[role.index()].state
    }

    /// Current state of an alert channel
    #[must_use]
    pub fn alert_state(&self, kind: AlertKind) -> ChannelState {
        self.tracker.slots().alerts[kind.index()].state
    }

    /// Whether the muted start transition has fired
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.tracker.started.load(Ordering::Acquire)
    }

    /// Whether steering is live
    #[must_use]
    pub const fn session(&self) -> SessionState {
        self.session
    }

    /// Steering output from the latest position, for diagnostics
    #[must_use]
    pub const fn last_steering(&self) -> Option<ChannelOutput> {
        self.last_steering
    }

    /// Warning output from the latest position, for diagnostics
    #[must_use]
    pub const fn last_warning(&self) -> Option<ChannelOutput> {
        self.last_warning
    }

    fn play_alert(&self, kind: AlertKind) {
        let slots = self.tracker.slots();
        if slots.stopped {
            return;
        }
        let slot = slots.alerts[kind.index()];
        match (slot.state, slot.handle) {
            (ChannelState::Ready, Some(handle)) => {
                self.tracker
                    .engine
                    .play_once(handle, StereoVolume::FULL, kind.priority());
                tracing::debug!(alert = %kind, "alert played");
            }
            (state, _) => {
                tracing::debug!(alert = %kind, ?state, "alert skipped, sound not available");
            }
        }
    }

    fn silence(&self) {
        let mut slots = self.tracker.slots();
        if slots.stopped {
            return;
        }
        let engine = self.tracker.engine.as_ref();
        for role in ChannelRole::ALL {
            mute(engine, &mut slots, role);
        }
    }
}

fn apply(engine: &dyn MixingEngine, slots: &mut Slots, role: ChannelRole, output: ChannelOutput) {
    let slot = &mut slots.loops[role.index()];
    let Some(handle) = slot.handle else {
        return;
    };
    if !slot.state.is_looping() {
        return;
    }
    engine.set_volume(handle, output.volume);
    engine.set_rate(handle, output.rate);
    slot.state = if output.volume.is_silent() {
        ChannelState::Silenced
    } else {
        ChannelState::Playing
    };
}

fn mute(engine: &dyn MixingEngine, slots: &mut Slots, role: ChannelRole) {
    let slot = &mut slots.loops[role.index()];
    if let (true, Some(handle)) = (slot.state.is_looping(), slot.handle) {
        engine.set_volume(handle, StereoVolume::SILENT);
        slot.state = ChannelState::Silenced;
    }
}
