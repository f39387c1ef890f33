//! Error taxonomy for the viewer
//!
//! Only [`ViewerError::Transport`] drives the reconnection state machine.
//! Every other kind is absorbed or reported to the view without touching
//! the session.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    /// Connection-level failure (connect, read or write)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed control payload or undecodable field
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Decoder setup failure; a new Init is required to recover
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A unit rejected by the decoder
    #[error("Decode error: {0}")]
    Decode(String),

    /// Explicit Error message sent by the server
    #[error("Server error: {0}")]
    Server(String),

    /// All reconnect attempts used up
    #[error("Connection lost after {attempts} reconnect attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ViewerError {
    /// Fatal errors need user action (or a fresh Init) before streaming resumes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ViewerError::Configuration(_) | ViewerError::ReconnectExhausted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ViewerError::Configuration("no decoder".into()).is_fatal());
        assert!(ViewerError::ReconnectExhausted { attempts: 5 }.is_fatal());

        assert!(!ViewerError::Transport("reset".into()).is_fatal());
        assert!(!ViewerError::Protocol("bad json".into()).is_fatal());
        assert!(!ViewerError::Decode("corrupt".into()).is_fatal());
        assert!(!ViewerError::Server("busy".into()).is_fatal());
    }

    #[test]
    fn test_display() {
        let err = ViewerError::ReconnectExhausted { attempts: 5 };
        assert_eq!(err.to_string(), "Connection lost after 5 reconnect attempts");
    }
}
