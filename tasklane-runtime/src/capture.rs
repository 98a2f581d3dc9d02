use tasklane_core::config::CaptureOptions;
use tasklane_engine::traits::{
    CaptureError, CaptureErrorCode, CaptureEvent, CaptureProvider, CaptureSession,
    RecognitionBatch, RecognitionSegment,
};
use tokio::sync::mpsc;

/// Capture provider that "hears" a fixed utterance, word by word.
///
/// Used where no microphone exists (CLI, tests). Events go to the channel
/// returned by [`ReplayCaptureProvider::new`].
#[derive(Debug, Clone)]
pub struct ReplayCaptureProvider {
    utterance: String,
    events: mpsc::UnboundedSender<CaptureEvent>,
}

impl ReplayCaptureProvider {
    pub fn new(utterance: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<CaptureEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                utterance: utterance.into(),
                events: tx,
            },
            rx,
        )
    }
}

impl CaptureProvider for ReplayCaptureProvider {
    fn open(&self, options: &CaptureOptions) -> Result<Box<dyn CaptureSession>, CaptureError> {
        log::debug!("replay capture opened (lang={})", options.lang);
        Ok(Box::new(ReplaySession {
            utterance: self.utterance.clone(),
            interim_results: options.interim_results,
            events: self.events.clone(),
            running: false,
        }))
    }
}

struct ReplaySession {
    utterance: String,
    interim_results: bool,
    events: mpsc::UnboundedSender<CaptureEvent>,
    running: bool,
}

impl ReplaySession {
    fn send(&self, event: CaptureEvent) -> Result<(), CaptureError> {
        self.events
            .send(event)
            .map_err(|_| CaptureError::Device("listener went away".into()))
    }
}

impl CaptureSession for ReplaySession {
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.running {
            return Err(CaptureError::AlreadyStarted);
        }
        self.running = true;
        self.send(CaptureEvent::Started)?;

        let words: Vec<&str> = self.utterance.split_whitespace().collect();
        if self.interim_results {
            for n in 1..words.len() {
                self.send(CaptureEvent::Results(RecognitionBatch::new(vec![
                    RecognitionSegment::interim(words[..n].join(" ")),
                ])))?;
            }
        }
        if !words.is_empty() {
            self.send(CaptureEvent::Results(RecognitionBatch::new(vec![
                RecognitionSegment::final_(words.join(" ")),
            ])))?;
        }
        self.send(CaptureEvent::Ended)?;
        self.running = false;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.running = false;
        Ok(())
    }

    fn abort(&mut self) -> Result<(), CaptureError> {
        self.running = false;
        self.send(CaptureEvent::Error(CaptureErrorCode::Aborted))
    }
}
