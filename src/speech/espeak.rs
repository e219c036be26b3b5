//! espeak-ng speech sink
//!
//! Each utterance runs as a short-lived `espeak-ng` process on a worker
//! thread. Flushing kills the process in flight, so a fresh cue cuts off a
//! stale one.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use tokio::sync::oneshot;

use super::sink::{QueueMode, SpeechInit, SpeechSink};
use crate::{Error, Result};

/// Programs tried in order
const PROGRAMS: [&str; 2] = ["espeak-ng", "espeak"];

/// How often a running utterance is checked for completion
const POLL_INTERVAL: Duration = Duration::from_millis(50);

enum Request {
    Speak(String, QueueMode),
    Stop,
    Shutdown,
}

/// Speech sink driving the espeak-ng command line synthesizer
pub struct EspeakSink {
    tx: Option<mpsc::Sender<Request>>,
}

impl EspeakSink {
    /// Start the worker for `locale`
    ///
    /// The returned [`SpeechInit`] resolves once the synthesizer was found
    /// and confirmed to have a voice for the locale.
    ///
    /// # Errors
    ///
    /// Returns error if the worker thread cannot be spawned
    pub fn spawn(locale: &str) -> Result<(Self, SpeechInit)> {
        let (init_tx, init_rx) = oneshot::channel();
        let (tx, rx) = mpsc::channel();
        let locale = locale.to_string();

        std::thread::Builder::new()
            .name("guideline-speech".to_string())
            .spawn(move || {
                let program =
                    match find_program().and_then(|p| check_voice(&p, &locale).map(|()| p)) {
                        Ok(program) => program,
                        Err(e) => {
                            let _ = init_tx.send(Err(e));
                            return;
                        }
                    };
                tracing::debug!(program = %program.display(), %locale, "speech synthesizer ready");
                let _ = init_tx.send(Ok(()));
                run(&program, &locale, &rx);
            })?;

        Ok((Self { tx: Some(tx) }, init_rx))
    }

    fn send(&self, request: Request) {
        if let Some(tx) = &self.tx
            && tx.send(request).is_err()
        {
            tracing::trace!("speech worker gone, command dropped");
        }
    }
}

impl SpeechSink for EspeakSink {
    fn speak(&mut self, text: &str, mode: QueueMode) {
        self.send(Request::Speak(text.to_string(), mode));
    }

    fn stop(&mut self) {
        self.send(Request::Stop);
    }

    fn shutdown(&mut self) {
        self.send(Request::Shutdown);
        // The worker exits within one poll interval; it is not joined
        self.tx = None;
    }
}

impl Drop for EspeakSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for EspeakSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EspeakSink")
            .field("running", &self.tx.is_some())
            .finish_non_exhaustive()
    }
}

fn find_program() -> Result<PathBuf> {
    PROGRAMS
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| Error::Speech("espeak-ng not found on PATH".to_string()))
}

/// `--voices=<locale>` prints a header line followed by one line per voice
fn check_voice(program: &Path, locale: &str) -> Result<()> {
    let output = Command::new(program)
        .arg(format!("--voices={locale}"))
        .stderr(Stdio::null())
        .output()?;
    if !output.status.success() {
        return Err(Error::Speech(format!(
            "voice listing failed with {}",
            output.status
        )));
    }
    let voices = String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .count()
        .saturating_sub(1);
    if voices == 0 {
        return Err(Error::Speech(format!("no voice for locale {locale}")));
    }
    Ok(())
}

fn run(program: &Path, locale: &str, rx: &mpsc::Receiver<Request>) {
    let mut queue: VecDeque<String> = VecDeque::new();
    let mut current: Option<Child> = None;

    loop {
        let request = if current.is_some() || !queue.is_empty() {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(request) => Some(request),
                Err(mpsc::RecvTimeoutError::Timeout) => None,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(request) => Some(request),
                Err(_) => break,
            }
        };

        match request {
            Some(Request::Speak(text, QueueMode::Flush)) => {
                kill(&mut current);
                queue.clear();
                queue.push_back(text);
            }
            Some(Request::Speak(text, QueueMode::Add)) => queue.push_back(text),
            Some(Request::Stop) => {
                kill(&mut current);
                queue.clear();
            }
            Some(Request::Shutdown) => break,
            None => {}
        }

        if let Some(child) = current.as_mut()
            && !matches!(child.try_wait(), Ok(None))
        {
            current = None;
        }
        if current.is_none()
            && let Some(text) = queue.pop_front()
        {
            current = utter(program, locale, &text);
        }
    }

    kill(&mut current);
    tracing::debug!("speech worker stopped");
}

fn utter(program: &Path, locale: &str, text: &str) -> Option<Child> {
    match Command::new(program)
        .args(["-v", locale])
        .arg(text)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => {
            tracing::trace!(%text, "speaking");
            Some(child)
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to start speech synthesizer");
            None
        }
    }
}

fn kill(current: &mut Option<Child>) {
    if let Some(mut child) = current.take() {
        let _ = child.kill();
        let _ = child.wait();
    }
}
