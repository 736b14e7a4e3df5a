//! Shared client state and its transitions.
//!
//! Every transition runs under the client's state lock, and every event is
//! emitted under it too, so observers see registry changes and events in
//! the same order.

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use touchpoint_common::{ChatError, RemoteError, SessionId, SubscriptionHandle};
use touchpoint_ddp::Transport;
use tracing::{debug, info, warn};

use crate::events::ChatEvent;
use crate::protocol::{message_chat_id, ChatUpdate};
use crate::registry::SessionRegistry;
use crate::session::SessionSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    Connected,
    Disconnected,
}

pub(crate) struct ClientState {
    pub(crate) connection: ConnectionState,
    /// Set by `close()` before the transport is told to disconnect, so the
    /// resulting disconnect is not reported as an error.
    pub(crate) expected_disconnect: bool,
    pub(crate) registry: SessionRegistry,
    /// Dropped once disconnected, which ends the consumer's event stream.
    events: Option<mpsc::UnboundedSender<ChatEvent>>,
}

impl ClientState {
    pub(crate) fn new(events: mpsc::UnboundedSender<ChatEvent>) -> Self {
        Self {
            connection: ConnectionState::Connected,
            expected_disconnect: false,
            registry: SessionRegistry::new(),
            events: Some(events),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.connection == ConnectionState::Disconnected
    }

    fn emit(&self, event: ChatEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    // -- Consumer-initiated --------------------------------------------------

    pub(crate) fn ensure_open(&self) -> Result<(), ChatError> {
        if self.is_closed() {
            return Err(ChatError::ClientClosed);
        }
        Ok(())
    }

    /// Fails with `ClientClosed` or `UnknownSession`, in that order.
    pub(crate) fn ensure_routable(&self, session_id: &SessionId) -> Result<(), ChatError> {
        self.ensure_open()?;
        if !self.registry.contains(session_id) {
            return Err(ChatError::UnknownSession(session_id.clone()));
        }
        Ok(())
    }

    /// Register a freshly created session and open its subscription.
    pub(crate) fn open_session(&mut self, transport: &dyn Transport, session_id: SessionId) {
        if !self.registry.open(transport, session_id.clone()) {
            warn!(session_id = %session_id, "Session id already registered");
        }
    }

    /// Tear down a session on the consumer's request and report it closed.
    pub(crate) fn close_session(
        &mut self,
        transport: &dyn Transport,
        session_id: &SessionId,
    ) -> Result<(), ChatError> {
        self.ensure_open()?;
        match self.registry.close(transport, session_id) {
            Some(_) => {
                info!(session_id = %session_id, "Session closed by user");
                self.emit(ChatEvent::SessionClosed {
                    session_id: session_id.clone(),
                });
                Ok(())
            }
            None => Err(ChatError::UnknownSession(session_id.clone())),
        }
    }

    /// Expected shutdown. Returns `false` if already disconnected.
    pub(crate) fn shutdown(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.expected_disconnect = true;
        self.connection = ConnectionState::Disconnected;
        self.registry.clear();
        self.events = None;
        true
    }

    // -- Server-initiated ----------------------------------------------------

    pub(crate) fn subscriptions_ready(&mut self, handles: &[SubscriptionHandle]) {
        for handle in handles {
            let Some(session_id) = self.registry.by_subscription(handle).cloned() else {
                debug!(subscription = %handle, "Ready for unknown subscription");
                continue;
            };
            let became_active = self
                .registry
                .lookup_mut(&session_id)
                .is_some_and(|session| session.mark_ready());
            if became_active {
                info!(session_id = %session_id, "Session ready");
                self.emit(ChatEvent::SessionReady { session_id });
            }
        }
    }

    /// The server stopped a subscription, with or without an error.
    pub(crate) fn subscription_stopped(
        &mut self,
        handle: &SubscriptionHandle,
        error: Option<RemoteError>,
    ) {
        let Some(session_id) = self.registry.by_subscription(handle).cloned() else {
            debug!(subscription = %handle, "Stop for unknown subscription");
            return;
        };
        self.registry.fail(&session_id);
        let error = error.unwrap_or_else(|| RemoteError::new("subscription stopped by server"));
        warn!(
            session_id = %session_id,
            reason = %error.reason,
            "Session subscription failed"
        );
        self.emit(ChatEvent::Error {
            error: ChatError::Subscription {
                session_id: session_id.clone(),
                error,
            },
            session_id: Some(session_id),
        });
    }

    /// A `chats` document was added or changed.
    pub(crate) fn chat_updated(
        &mut self,
        transport: &dyn Transport,
        id: &str,
        fields: &Map<String, Value>,
    ) {
        let session_id = SessionId::from(id);
        let Some(session) = self.registry.lookup_mut(&session_id) else {
            debug!(session_id = %session_id, "Update for unknown session");
            return;
        };
        let update = ChatUpdate::from_fields(fields);
        if update.is_empty() {
            debug!(session_id = %session_id, "Chat update without session fields");
            return;
        }

        for signal in session.apply_update(&update) {
            match signal {
                SessionSignal::AgentIsTyping(value) => self.emit(ChatEvent::AgentIsTyping {
                    session_id: session_id.clone(),
                    value,
                }),
                SessionSignal::AgentId(value) => self.emit(ChatEvent::AgentId {
                    session_id: session_id.clone(),
                    value,
                }),
                SessionSignal::Closed => {
                    if self.registry.close(transport, &session_id).is_some() {
                        info!(session_id = %session_id, "Session closed by server");
                        self.emit(ChatEvent::SessionClosed {
                            session_id: session_id.clone(),
                        });
                    }
                }
            }
        }
    }

    /// A `messages` document was added.
    pub(crate) fn message_added(&mut self, id: String, fields: Map<String, Value>) {
        let session_id = match message_chat_id(&fields) {
            Some(chat_id) => SessionId::from(chat_id),
            None => match self.registry.sole() {
                Some(only) => only.clone(),
                None => {
                    warn!(message_id = %id, "Message without chat id cannot be routed");
                    return;
                }
            },
        };
        if !self.registry.contains(&session_id) {
            debug!(session_id = %session_id, message_id = %id, "Message for unknown session");
            return;
        }
        self.emit(ChatEvent::Message {
            session_id,
            message_id: id,
            payload: Value::Object(fields),
        });
    }

    /// The transport connection ended. Reported once, unless expected.
    pub(crate) fn connection_lost(&mut self) {
        if self.expected_disconnect || self.is_closed() {
            debug!("Connection closed");
            return;
        }
        warn!(sessions = self.registry.len(), "Connection lost unexpectedly");
        self.connection = ConnectionState::Disconnected;
        self.registry.clear();
        self.emit(ChatEvent::Error {
            error: ChatError::UnexpectedDisconnect,
            session_id: None,
        });
        self.events = None;
    }
}
