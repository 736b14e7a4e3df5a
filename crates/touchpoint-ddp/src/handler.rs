//! Incoming DDP message handler.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use touchpoint_common::{RemoteError, SubscriptionHandle, TransportError};
use tracing::{debug, warn};

use super::types::{DdpMessage, TransportEvent};

/// Method calls awaiting their `result`, keyed by method id.
pub(crate) type PendingCalls = HashMap<String, oneshot::Sender<Result<Value, TransportError>>>;

/// Handle a single incoming DDP message.
///
/// Resolves pending calls, forwards data and subscription messages as
/// [`TransportEvent`]s, and returns the reply to send back, if any.
pub(crate) fn handle_ddp_message(
    msg: DdpMessage,
    pending: &mut PendingCalls,
    event_tx: &mpsc::UnboundedSender<TransportEvent>,
) -> Option<DdpMessage> {
    match msg {
        DdpMessage::Ping { id } => return Some(DdpMessage::Pong { id }),
        DdpMessage::Pong { .. } => {}
        DdpMessage::Result { id, result, error } => match pending.remove(&id) {
            Some(reply) => {
                let outcome = match error {
                    Some(err) => Err(TransportError::Remote(RemoteError::from_value(&err))),
                    None => Ok(result.unwrap_or(Value::Null)),
                };
                let _ = reply.send(outcome);
            }
            None => debug!(id = %id, "Result for unknown method call"),
        },
        DdpMessage::Updated { .. } => {}
        DdpMessage::Ready { subs } => {
            let subscriptions = subs.iter().map(|s| SubscriptionHandle::from(s.as_str())).collect();
            let _ = event_tx.send(TransportEvent::Ready { subscriptions });
        }
        DdpMessage::Nosub { id, error } => {
            let _ = event_tx.send(TransportEvent::NoSub {
                subscription: SubscriptionHandle::from(id.as_str()),
                error: error.as_ref().map(RemoteError::from_value),
            });
        }
        DdpMessage::Added {
            collection,
            id,
            fields,
        } => {
            debug!(collection = %collection, id = %id, "Document added");
            let _ = event_tx.send(TransportEvent::Added {
                collection,
                id,
                fields,
            });
        }
        DdpMessage::Changed {
            collection,
            id,
            fields,
            cleared,
        } => {
            debug!(collection = %collection, id = %id, "Document changed");
            let _ = event_tx.send(TransportEvent::Changed {
                collection,
                id,
                fields,
                cleared,
            });
        }
        DdpMessage::Removed { collection, id } => {
            let _ = event_tx.send(TransportEvent::Removed { collection, id });
        }
        DdpMessage::Error {
            reason,
            offending_message,
        } => {
            warn!(reason = %reason, offending = ?offending_message, "Server rejected a message");
        }
        other => {
            debug!(message = ?other, "Unhandled DDP message");
        }
    }
    None
}
