//! DDP wire messages and the event/command enums of the transport.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use touchpoint_common::{RemoteError, SubscriptionHandle, TransportError};

/// Protocol version requested in the handshake.
pub const DDP_VERSION: &str = "1";

// ---------------------------------------------------------------------------
// Wire Protocol
// ---------------------------------------------------------------------------

/// A DDP message, tagged by its `msg` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "lowercase")]
pub enum DdpMessage {
    Connect {
        version: String,
        support: Vec<String>,
    },
    Connected {
        session: String,
    },
    Failed {
        version: String,
    },
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    Method {
        method: String,
        params: Vec<Value>,
        id: String,
    },
    Result {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },
    Updated {
        #[serde(default)]
        methods: Vec<String>,
    },
    Sub {
        id: String,
        name: String,
        params: Vec<Value>,
    },
    Unsub {
        id: String,
    },
    Ready {
        #[serde(default)]
        subs: Vec<String>,
    },
    Nosub {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },
    Added {
        collection: String,
        id: String,
        #[serde(default)]
        fields: Map<String, Value>,
    },
    Changed {
        collection: String,
        id: String,
        #[serde(default)]
        fields: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        cleared: Vec<String>,
    },
    Removed {
        collection: String,
        id: String,
    },
    Error {
        reason: String,
        #[serde(
            default,
            rename = "offendingMessage",
            skip_serializing_if = "Option::is_none"
        )]
        offending_message: Option<Value>,
    },
}

impl DdpMessage {
    pub fn connect() -> Self {
        Self::Connect {
            version: DDP_VERSION.to_string(),
            support: vec![DDP_VERSION.to_string()],
        }
    }
}

// ---------------------------------------------------------------------------
// Events & Commands
// ---------------------------------------------------------------------------

/// Low-level events pushed by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Added {
        collection: String,
        id: String,
        fields: Map<String, Value>,
    },
    Changed {
        collection: String,
        id: String,
        fields: Map<String, Value>,
        cleared: Vec<String>,
    },
    Removed {
        collection: String,
        id: String,
    },
    /// Initial data for these subscriptions has been delivered.
    Ready {
        subscriptions: Vec<SubscriptionHandle>,
    },
    /// The subscription was refused or stopped. `error` is `None` when the
    /// server stopped it in response to an unsubscribe.
    NoSub {
        subscription: SubscriptionHandle,
        error: Option<RemoteError>,
    },
    /// The connection is gone. Sent exactly once per connection.
    Disconnected,
}

/// Commands sent to the connection task by [`crate::DdpClient`].
#[derive(Debug)]
pub(crate) enum DdpCommand {
    Call {
        method: String,
        params: Vec<Value>,
        reply: oneshot::Sender<Result<Value, TransportError>>,
    },
    Subscribe {
        id: String,
        name: String,
        params: Vec<Value>,
    },
    Unsubscribe {
        id: String,
    },
    Disconnect,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn connect_serializes_with_msg_tag() {
        let value = serde_json::to_value(DdpMessage::connect()).unwrap();
        assert_eq!(
            value,
            json!({ "msg": "connect", "version": "1", "support": ["1"] })
        );
    }

    #[test]
    fn method_serializes_params_in_order() {
        let msg = DdpMessage::Method {
            method: "setUserIsTyping".into(),
            params: vec![json!("abc"), json!(true)],
            id: "7".into(),
        };
        let value = serde_json::to_value(msg).unwrap();
        assert_eq!(
            value,
            json!({ "msg": "method", "method": "setUserIsTyping", "params": ["abc", true], "id": "7" })
        );
    }

    #[test]
    fn ping_without_id_omits_field() {
        let text = serde_json::to_string(&DdpMessage::Ping { id: None }).unwrap();
        assert_eq!(text, r#"{"msg":"ping"}"#);
    }

    #[test]
    fn result_with_error_parses() {
        let msg: DdpMessage = serde_json::from_str(
            r#"{"msg":"result","id":"3","error":{"error":403,"reason":"denied","message":"denied [403]"}}"#,
        )
        .unwrap();
        match msg {
            DdpMessage::Result { id, result, error } => {
                assert_eq!(id, "3");
                assert!(result.is_none());
                assert_eq!(error.unwrap()["error"], 403);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn changed_without_fields_parses() {
        let msg: DdpMessage = serde_json::from_str(
            r#"{"msg":"changed","collection":"chats","id":"abc","cleared":["agentId"]}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            DdpMessage::Changed {
                collection: "chats".into(),
                id: "abc".into(),
                fields: Map::new(),
                cleared: vec!["agentId".into()],
            }
        );
    }

    #[test]
    fn server_id_frame_is_not_a_ddp_message() {
        assert!(serde_json::from_str::<DdpMessage>(r#"{"server_id":"0"}"#).is_err());
    }
}
