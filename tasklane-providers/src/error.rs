use thiserror::Error;

/// Failure of a backend call, typed where the HTTP exchange happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Identifier already taken (HTTP 409, or 400 from the register endpoint).
    #[error("conflict (status {status}): {}", .message.as_deref().unwrap_or("already exists"))]
    Conflict { status: u16, message: Option<String> },

    #[error("backend returned status {status}: {}", .message.as_deref().unwrap_or("no detail"))]
    Status { status: u16, message: Option<String> },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        if status == 400 || status == 409 {
            RemoteError::Conflict { status, message }
        } else {
            RemoteError::Status { status, message }
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Conflict { status, .. } | RemoteError::Status { status, .. } => {
                Some(*status)
            }
            RemoteError::Transport(_) | RemoteError::Decode(_) => None,
        }
    }

    /// Message reported by the backend itself, if it sent one.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            RemoteError::Conflict { message, .. } | RemoteError::Status { message, .. } => {
                message.as_deref()
            }
            RemoteError::Transport(_) | RemoteError::Decode(_) => None,
        }
    }
}
