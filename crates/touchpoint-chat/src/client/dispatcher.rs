//! Background task that translates `TransportEvent`s into `ChatEvent`s.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use touchpoint_ddp::{Transport, TransportEvent};
use tracing::debug;

use crate::protocol::collections;

use super::state::ClientState;

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Runs until the transport reports its disconnect. Events arriving after
/// the client closed are dropped.
pub(crate) async fn dispatch_events(
    mut transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    state: Arc<Mutex<ClientState>>,
    transport: Arc<dyn Transport>,
) {
    while let Some(event) = transport_rx.recv().await {
        let mut state = state.lock().await;

        if event == TransportEvent::Disconnected {
            state.connection_lost();
            break;
        }
        if state.is_closed() {
            debug!(event = ?event, "Dropping event after close");
            continue;
        }

        match event {
            TransportEvent::Added {
                collection,
                id,
                fields,
            } => match collection.as_str() {
                collections::CHATS => state.chat_updated(transport.as_ref(), &id, &fields),
                collections::MESSAGES => state.message_added(id, fields),
                other => debug!(collection = %other, id = %id, "Ignoring document"),
            },
            TransportEvent::Changed {
                collection,
                id,
                fields,
                cleared,
            } => {
                if !cleared.is_empty() {
                    debug!(collection = %collection, id = %id, cleared = ?cleared, "Fields cleared");
                }
                match collection.as_str() {
                    collections::CHATS => state.chat_updated(transport.as_ref(), &id, &fields),
                    other => debug!(collection = %other, id = %id, "Ignoring change"),
                }
            }
            TransportEvent::Removed { collection, id } => {
                debug!(collection = %collection, id = %id, "Document removed");
            }
            TransportEvent::Ready { subscriptions } => state.subscriptions_ready(&subscriptions),
            TransportEvent::NoSub {
                subscription,
                error,
            } => state.subscription_stopped(&subscription, error),
            TransportEvent::Disconnected => {}
        }
    }
}
