use std::path::PathBuf;

use crate::id::SessionId;

/// Structured error reported by the Touchpoint service, either as a failed
/// method result or as an HTTP error body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
    pub reason: String,
    pub error_code: Option<String>,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            reason: message.clone(),
            message,
            error_code: None,
        }
    }

    /// Build from a JSON error object (`{ error, reason, message }`).
    ///
    /// `reason` falls back to `message`; a numeric `error` is stringified.
    /// Anything that is not an object yields "Unknown error".
    pub fn from_value(value: &serde_json::Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::new("Unknown error");
        };

        let message = obj
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        let reason = obj
            .get("reason")
            .and_then(|r| r.as_str())
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| message.clone());
        let error_code = match obj.get("error") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Self {
            message,
            reason,
            error_code,
        }
    }
}

/// Failures of the underlying transport connection.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connection timed out")]
    Timeout,

    #[error("remote error: {0}")]
    Remote(RemoteError),

    #[error("connection closed")]
    Disconnected,

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Errors surfaced by the chat layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChatError {
    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("remote error: {0}")]
    Remote(RemoteError),

    #[error("subscription failed for session {session_id}: {error}")]
    Subscription {
        session_id: SessionId,
        error: RemoteError,
    },

    #[error("unexpected disconnection")]
    UnexpectedDisconnect,

    #[error("client is closed")]
    ClientClosed,

    #[error("unknown session: {0}")]
    UnknownSession(SessionId),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<TransportError> for ChatError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Remote(remote) => ChatError::Remote(remote),
            TransportError::Disconnected => ChatError::ClientClosed,
            other => ChatError::Transport(other.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}
