use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tasklane_core::config::CaptureOptions;
use tasklane_core::types::{AccessToken, Credentials, Registration, UserRecord};
use tasklane_providers::RemoteError;
use thiserror::Error;

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn register(&self, registration: &Registration) -> Result<UserRecord, RemoteError>;
    async fn login(&self, credentials: &Credentials) -> Result<AccessToken, RemoteError>;
    async fn current_user(&self, token: &str) -> Result<UserRecord, RemoteError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode session value: {0}")]
    Encode(String),
}

/// Durable key-value home of the token and the cached user.
///
/// A missing key is a normal state ("signed out"), not an error. Implementations
/// return `Ok(None)` for a stored user that no longer decodes.
pub trait SessionStore: Send + Sync {
    fn token(&self) -> Result<Option<String>, StoreError>;
    fn set_token(&self, token: &str) -> Result<(), StoreError>;
    fn user(&self) -> Result<Option<UserRecord>, StoreError>;
    fn set_user(&self, user: &UserRecord) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("capture already started")]
    AlreadyStarted,

    #[error("speech capture is not supported here")]
    Unsupported,

    #[error("capture device failed: {0}")]
    Device(String),
}

/// Error codes a recognizer reports while a capture session runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureErrorCode {
    Aborted,
    NoSpeech,
    AudioCapture,
    NotAllowed,
    Network,
    Other(String),
}

impl CaptureErrorCode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "aborted" => Self::Aborted,
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::AudioCapture,
            "not-allowed" => Self::NotAllowed,
            "network" => Self::Network,
            other => Self::Other(other.to_string()),
        }
    }

    /// Message shown to the user. `None` for an intentional abort.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Aborted => None,
            Self::NoSpeech => Some("No speech detected. Please try again."),
            Self::AudioCapture => Some("Microphone not found or not accessible."),
            Self::NotAllowed => {
                Some("Microphone access denied. Please enable microphone permissions.")
            }
            Self::Network => Some("Network error occurred."),
            Self::Other(_) => Some("An error occurred with speech recognition."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionSegment {
    pub text: String,
    pub is_final: bool,
}

impl RecognitionSegment {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Cumulative result list of a recognizer; only `results[result_index..]` changed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecognitionBatch {
    pub result_index: usize,
    pub results: Vec<RecognitionSegment>,
}

impl RecognitionBatch {
    pub fn new(results: Vec<RecognitionSegment>) -> Self {
        Self {
            result_index: 0,
            results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureEvent {
    Started,
    Results(RecognitionBatch),
    Error(CaptureErrorCode),
    Ended,
}

pub trait CaptureSession: Send {
    fn start(&mut self) -> Result<(), CaptureError>;
    fn stop(&mut self) -> Result<(), CaptureError>;
    fn abort(&mut self) -> Result<(), CaptureError>;
}

pub trait CaptureProvider: Send + Sync {
    fn open(&self, options: &CaptureOptions) -> Result<Box<dyn CaptureSession>, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_codes() {
        assert_eq!(CaptureErrorCode::from_code("aborted"), CaptureErrorCode::Aborted);
        assert_eq!(
            CaptureErrorCode::from_code("not-allowed"),
            CaptureErrorCode::NotAllowed
        );
        assert_eq!(
            CaptureErrorCode::from_code("service-not-allowed"),
            CaptureErrorCode::Other("service-not-allowed".into())
        );
    }

    #[test]
    fn aborted_has_no_user_message() {
        assert_eq!(CaptureErrorCode::Aborted.user_message(), None);
        assert!(
            CaptureErrorCode::NotAllowed
                .user_message()
                .unwrap()
                .contains("microphone permissions")
        );
        assert_eq!(
            CaptureErrorCode::Other("bad-grammar".into()).user_message(),
            Some("An error occurred with speech recognition.")
        );
    }
}
