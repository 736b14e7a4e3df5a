//! Domain events delivered to chat consumers.

use serde_json::Value;
use touchpoint_common::{ChatError, SessionId};

/// Events emitted by a [`ChatClient`](crate::ChatClient).
///
/// Every session-scoped event carries the id of the session it belongs to.
/// `Error` is session-scoped for subscription failures and client-wide
/// (`session_id: None`) for an unexpected disconnect.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// The session's subscription delivered its initial data.
    SessionReady { session_id: SessionId },
    /// A `messages` document was published for the session.
    Message {
        session_id: SessionId,
        message_id: String,
        payload: Value,
    },
    AgentIsTyping { session_id: SessionId, value: bool },
    /// The assigned agent changed; `None` when the assignment was cleared.
    AgentId {
        session_id: SessionId,
        value: Option<String>,
    },
    /// Emitted at most once per session, for server- or user-initiated close.
    SessionClosed { session_id: SessionId },
    Error {
        error: ChatError,
        session_id: Option<SessionId>,
    },
}

impl ChatEvent {
    /// Session the event belongs to, if it is session-scoped.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            ChatEvent::SessionReady { session_id }
            | ChatEvent::Message { session_id, .. }
            | ChatEvent::AgentIsTyping { session_id, .. }
            | ChatEvent::AgentId { session_id, .. }
            | ChatEvent::SessionClosed { session_id } => Some(session_id),
            ChatEvent::Error { session_id, .. } => session_id.as_ref(),
        }
    }
}

/// Events of the single-session [`Chat`](crate::Chat) facade.
///
/// Same vocabulary as [`ChatEvent`] without the session id.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Ready,
    Message { message_id: String, payload: Value },
    AgentIsTyping(bool),
    AgentId(Option<String>),
    Closed,
    Error(ChatError),
}

impl SessionEvent {
    /// After a terminal event the facade shuts its connection down.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::Closed | SessionEvent::Error(_))
    }
}

impl From<ChatEvent> for SessionEvent {
    fn from(event: ChatEvent) -> Self {
        match event {
            ChatEvent::SessionReady { .. } => SessionEvent::Ready,
            ChatEvent::Message {
                message_id,
                payload,
                ..
            } => SessionEvent::Message {
                message_id,
                payload,
            },
            ChatEvent::AgentIsTyping { value, .. } => SessionEvent::AgentIsTyping(value),
            ChatEvent::AgentId { value, .. } => SessionEvent::AgentId(value),
            ChatEvent::SessionClosed { .. } => SessionEvent::Closed,
            ChatEvent::Error { error, .. } => SessionEvent::Error(error),
        }
    }
}
