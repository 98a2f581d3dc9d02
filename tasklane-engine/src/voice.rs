use crate::traits::{
    CaptureError, CaptureErrorCode, CaptureEvent, CaptureProvider, CaptureSession,
    RecognitionBatch,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tasklane_core::config::CaptureOptions;
use tokio::sync::mpsc;

const START_FAILED: &str = "Failed to start speech recognition.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListeningState {
    #[default]
    Idle,
    Listening,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TranscriptState {
    finalized: String,
    interim: String,
}

impl TranscriptState {
    /// Everything recognized as final since listening started, each chunk
    /// followed by a single space.
    pub fn finalized(&self) -> &str {
        &self.finalized
    }

    pub fn interim(&self) -> &str {
        &self.interim
    }

    fn clear(&mut self) {
        self.finalized.clear();
        self.interim.clear();
    }
}

type ResultFn = Box<dyn FnMut(&str, bool) + Send>;
type ErrorFn = Box<dyn FnMut(&str) + Send>;
type StateFn = Box<dyn FnMut(ListeningState) + Send>;

#[derive(Default)]
pub struct VoiceCallbacks {
    on_result: Option<ResultFn>,
    on_error: Option<ErrorFn>,
    on_state: Option<StateFn>,
}

impl VoiceCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with `(text, is_final)` for each batch that changed the transcript.
    pub fn on_result<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str, bool) + Send + 'static,
    {
        self.on_result = Some(Box::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_state<F>(mut self, f: F) -> Self
    where
        F: FnMut(ListeningState) + Send + 'static,
    {
        self.on_state = Some(Box::new(f));
        self
    }
}

/// Listening state machine over a speech recognizer.
///
/// Device notifications enter through [`ingest`](Self::ingest) (or
/// [`pump`](Self::pump) for a channel). No public operation returns an
/// error; failures surface through the error callback.
pub struct VoiceCaptureEngine {
    session: Option<Box<dyn CaptureSession>>,
    state: ListeningState,
    transcript: TranscriptState,
    callbacks: VoiceCallbacks,
}

impl VoiceCaptureEngine {
    pub fn new(
        provider: Option<Arc<dyn CaptureProvider>>,
        options: &CaptureOptions,
        callbacks: VoiceCallbacks,
    ) -> Self {
        let session = provider.and_then(|p| match p.open(options) {
            Ok(s) => Some(s),
            Err(e) => {
                log::warn!("speech capture unavailable: {e}");
                None
            }
        });

        Self {
            session,
            state: ListeningState::Idle,
            transcript: TranscriptState::default(),
            callbacks,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.session.is_some()
    }

    pub fn state(&self) -> ListeningState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == ListeningState::Listening
    }

    pub fn transcript(&self) -> &TranscriptState {
        &self.transcript
    }

    pub fn start(&mut self) {
        if self.is_listening() {
            log::debug!("start ignored: already listening");
            return;
        }
        let Some(session) = self.session.as_mut() else {
            log::debug!("start ignored: speech capture not supported");
            return;
        };

        self.transcript.clear();
        match session.start() {
            Ok(()) => self.set_state(ListeningState::Listening),
            Err(CaptureError::AlreadyStarted) => {
                log::warn!("speech capture was already running");
                self.set_state(ListeningState::Listening);
            }
            Err(e) => {
                log::error!("failed to start speech capture: {e}");
                self.emit_error(START_FAILED);
            }
        }
    }

    pub fn stop(&mut self) {
        if !self.is_listening() {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.stop() {
                log::warn!("error stopping speech capture: {e}");
            }
        }
        self.set_state(ListeningState::Idle);
    }

    /// Discards the in-flight recognition. The recognizer's follow-up
    /// `aborted` error is expected and stays silent.
    pub fn cancel(&mut self) {
        if !self.is_listening() {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.abort() {
                log::warn!("error aborting speech capture: {e}");
            }
        }
        self.transcript.interim.clear();
        self.set_state(ListeningState::Idle);
    }

    pub fn reset_transcript(&mut self) {
        self.transcript.clear();
    }

    pub fn ingest(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::Started => self.set_state(ListeningState::Listening),
            CaptureEvent::Results(batch) => self.apply_batch(&batch),
            CaptureEvent::Error(code) => self.apply_error(code),
            CaptureEvent::Ended => self.set_state(ListeningState::Idle),
        }
    }

    /// Feeds events from a channel until every sender is dropped.
    pub async fn pump(&mut self, events: &mut mpsc::Receiver<CaptureEvent>) {
        while let Some(event) = events.recv().await {
            self.ingest(event);
        }
    }

    fn apply_batch(&mut self, batch: &RecognitionBatch) {
        let mut finalized = String::new();
        let mut interim = String::new();

        for segment in batch.results.iter().skip(batch.result_index) {
            if segment.is_final {
                finalized.push_str(&segment.text);
                finalized.push(' ');
            } else {
                interim.push_str(&segment.text);
            }
        }

        if !finalized.is_empty() {
            self.transcript.finalized.push_str(&finalized);
            self.transcript.interim.clear();
            self.emit_result(finalized.trim(), true);
        } else if !interim.is_empty() {
            self.transcript.interim = interim;
            let text = self.transcript.interim.trim().to_string();
            self.emit_result(&text, false);
        }
    }

    fn apply_error(&mut self, code: CaptureErrorCode) {
        self.set_state(ListeningState::Idle);
        match code.user_message() {
            None => log::debug!("speech capture aborted"),
            Some(message) => {
                log::warn!("speech capture error: {code:?}");
                self.emit_error(message);
            }
        }
    }

    fn set_state(&mut self, next: ListeningState) {
        if self.state == next {
            return;
        }
        log::debug!("listening state: {:?} -> {:?}", self.state, next);
        self.state = next;
        if let Some(cb) = self.callbacks.on_state.as_mut() {
            cb(next);
        }
    }

    fn emit_result(&mut self, text: &str, is_final: bool) {
        if let Some(cb) = self.callbacks.on_result.as_mut() {
            cb(text, is_final);
        }
    }

    fn emit_error(&mut self, message: &str) {
        if let Some(cb) = self.callbacks.on_error.as_mut() {
            cb(message);
        }
    }
}

impl Drop for VoiceCaptureEngine {
    fn drop(&mut self) {
        // Graceful stop, not abort; the session may already be stopped.
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.stop() {
                log::debug!("speech capture already stopped: {e}");
            }
        }
    }
}
