//! Speech synthesis sink and its readiness gate

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::Result;

/// What to do with speech already queued or playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// Interrupt the current utterance and drop anything queued
    Flush,
    /// Speak after whatever is already queued
    Add,
}

/// A text-to-speech backend
///
/// Calls must return without waiting for audio.
pub trait SpeechSink: Send {
    /// Speak `text`
    fn speak(&mut self, text: &str, mode: QueueMode);

    /// Interrupt current speech and clear the queue
    fn stop(&mut self);

    /// Release the backend; later calls are ignored
    fn shutdown(&mut self);
}

/// Completion of asynchronous sink initialization
///
/// An `Err`, or a sender dropped without a result, disables speech for good.
pub type SpeechInit = oneshot::Receiver<Result<()>>;

enum Readiness {
    Pending(SpeechInit),
    Ready,
    Disabled,
}

/// A sink paired with its initialization state
///
/// Until initialization succeeds every `speak` is a silent no-op. A failed
/// initialization is logged once and never retried.
pub struct Speech {
    sink: Option<Box<dyn SpeechSink>>,
    readiness: Readiness,
}

impl Speech {
    /// Wrap a sink whose initialization completes on `init`
    #[must_use]
    pub fn new(sink: Box<dyn SpeechSink>, init: SpeechInit) -> Self {
        Self {
            sink: Some(sink),
            readiness: Readiness::Pending(init),
        }
    }

    /// Wrap a sink that is usable immediately
    #[must_use]
    pub fn ready(sink: Box<dyn SpeechSink>) -> Self {
        Self {
            sink: Some(sink),
            readiness: Readiness::Ready,
        }
    }

    /// No speech at all
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            sink: None,
            readiness: Readiness::Disabled,
        }
    }

    /// Whether speech can be produced now, polling a pending initialization
    pub fn is_ready(&mut self) -> bool {
        if let Readiness::Pending(init) = &mut self.readiness {
            match init.try_recv() {
                Ok(Ok(())) => {
                    tracing::debug!("speech ready");
                    self.readiness = Readiness::Ready;
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "speech unavailable, announcements disabled");
                    self.readiness = Readiness::Disabled;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Closed) => {
                    tracing::warn!("speech initialization abandoned, announcements disabled");
                    self.readiness = Readiness::Disabled;
                }
            }
        }
        matches!(self.readiness, Readiness::Ready) && self.sink.is_some()
    }

    /// Speak `text` if ready; returns whether it was handed to the sink
    pub fn speak(&mut self, text: &str, mode: QueueMode) -> bool {
        if !self.is_ready() {
            return false;
        }
        match self.sink.as_mut() {
            Some(sink) => {
                sink.speak(text, mode);
                true
            }
            None => false,
        }
    }

    /// Stop and release the sink; speech stays disabled afterwards
    pub fn shutdown(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            sink.stop();
            sink.shutdown();
        }
        self.readiness = Readiness::Disabled;
    }
}

impl std::fmt::Debug for Speech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let readiness = match self.readiness {
            Readiness::Pending(_) => "pending",
            Readiness::Ready => "ready",
            Readiness::Disabled => "disabled",
        };
        f.debug_struct("Speech")
            .field("readiness", &readiness)
            .finish_non_exhaustive()
    }
}
