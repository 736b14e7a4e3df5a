//! Wire vocabulary of the Touchpoint chat service.
//!
//! Remote method names, the per-session subscription, the published
//! collections and the payload types carried inside DDP data messages. The
//! transport envelope itself is handled by `touchpoint-ddp`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Remote methods exposed by the service.
pub mod methods {
    pub const CREATE_CHAT: &str = "createChat";
    pub const POST_MESSAGE: &str = "postMessageAsUser";
    pub const SET_TYPING: &str = "setUserIsTyping";
    pub const CLOSE_CHAT: &str = "userCloseChat";
}

/// Collections published by the `userChat` subscription.
pub mod collections {
    pub const CHATS: &str = "chats";
    pub const MESSAGES: &str = "messages";
}

/// Per-session subscription, parameterized by session id.
pub const USER_CHAT_SUBSCRIPTION: &str = "userChat";

/// The only channel type this client requests and probes for.
pub const TEXT_CHANNEL: &str = "text";

/// Field of a `messages` document naming the session it belongs to.
pub const MESSAGE_CHAT_ID: &str = "chatId";

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Fields of a `chats` document that carry session state.
///
/// The outer `Option` records whether the field was present in the update
/// at all; the inner one holds its (possibly null) value. Only present
/// fields produce events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatUpdate {
    pub agent_is_typing: Option<Option<bool>>,
    pub agent_id: Option<Option<String>>,
    pub is_closed: Option<bool>,
}

impl ChatUpdate {
    /// Read the changed fields of an `added`/`changed` message.
    ///
    /// Each field is read on its own: a malformed field is logged and
    /// skipped without affecting the others.
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            agent_is_typing: field(fields, AGENT_IS_TYPING),
            agent_id: field(fields, AGENT_ID),
            is_closed: field(fields, IS_CLOSED).flatten(),
        }
    }

    /// Whether the update carries anything this client reacts to.
    pub fn is_empty(&self) -> bool {
        self.agent_is_typing.is_none() && self.agent_id.is_none() && self.is_closed.is_none()
    }
}

const AGENT_IS_TYPING: &str = "agentIsTyping";
const AGENT_ID: &str = "agentId";
const IS_CLOSED: &str = "isClosed";

/// `None` if absent or malformed, `Some(None)` if null.
fn field<T: DeserializeOwned>(fields: &Map<String, Value>, name: &str) -> Option<Option<T>> {
    let value = fields.get(name)?;
    match Option::<T>::deserialize(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(field = name, value = %value, error = %e, "Ignoring malformed chat field");
            None
        }
    }
}

/// Session id a `messages` document is addressed to, if it names one.
pub fn message_chat_id(fields: &Map<String, Value>) -> Option<&str> {
    fields.get(MESSAGE_CHAT_ID).and_then(Value::as_str)
}
