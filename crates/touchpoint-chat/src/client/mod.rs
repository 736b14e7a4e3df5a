//! Multi-session chat client.
//!
//! One [`ChatClient`] owns one transport connection and any number of chat
//! sessions on it. Domain events for all sessions arrive on a single
//! receiver returned at construction; the stream ends once the client is
//! closed or the connection is lost.

mod dispatcher;
mod state;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use touchpoint_common::{ChatError, SessionId, TransportError};
use touchpoint_config::ConnectionConfig;
use touchpoint_ddp::{DdpClient, Transport, TransportEvent};
use tracing::{debug, info};

use crate::events::ChatEvent;
use crate::protocol::methods;
use crate::request::SessionRequest;
use crate::session::Session;

use self::dispatcher::dispatch_events;
use self::state::ClientState;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle to a chat connection. Cheap to clone; clones share the connection
/// and its sessions.
#[derive(Clone)]
pub struct ChatClient {
    transport: Arc<dyn Transport>,
    state: Arc<Mutex<ClientState>>,
}

impl ChatClient {
    /// Connect to the real-time service. Returns `(client, event_receiver)`.
    pub async fn connect(
        config: &ConnectionConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChatEvent>), ChatError> {
        let (ddp, transport_events) = DdpClient::connect(config).await?;
        Ok(Self::with_transport(Arc::new(ddp), transport_events))
    }

    /// Build a client over an already connected transport.
    ///
    /// `transport_events` must be the event stream of `transport`. Spawns
    /// the dispatcher task, so this needs a Tokio runtime.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(ClientState::new(event_tx)));

        tokio::spawn(dispatch_events(
            transport_events,
            Arc::clone(&state),
            Arc::clone(&transport),
        ));

        (Self { transport, state }, event_rx)
    }

    /// Create a session and subscribe to it.
    ///
    /// Resolves with the server-assigned id once creation succeeded; the
    /// subscription is already open at that point and
    /// [`ChatEvent::SessionReady`] follows when it delivers its initial
    /// data. A remote failure leaves nothing registered.
    pub async fn create_session(&self, request: SessionRequest) -> Result<SessionId, ChatError> {
        self.state.lock().await.ensure_open()?;
        debug!(request = ?request, "Creating chat session");

        let result = self
            .transport
            .call(methods::CREATE_CHAT, request.to_params())
            .await;

        let mut state = self.state.lock().await;
        state.ensure_open()?;
        let session_id = match result? {
            Value::String(id) if !id.is_empty() => SessionId::from(id),
            other => {
                return Err(ChatError::Parse(format!(
                    "createChat returned no session id: {other}"
                )))
            }
        };
        state.open_session(self.transport.as_ref(), session_id.clone());
        info!(session_id = %session_id, customer_id = %request.customer_id(), "Chat session created");
        Ok(session_id)
    }

    /// Post a message, optionally with an attachment, as the user.
    pub async fn send_message(
        &self,
        session_id: &SessionId,
        message: &str,
        attachment: Option<Value>,
    ) -> Result<(), ChatError> {
        self.state.lock().await.ensure_routable(session_id)?;

        let mut params = vec![Value::from(session_id.as_str()), Value::from(message)];
        if let Some(attachment) = attachment {
            params.push(attachment);
        }
        let result = self.transport.call(methods::POST_MESSAGE, params).await;
        self.settle(result).await
    }

    /// Tell the agent whether the user is typing.
    pub async fn set_typing(&self, session_id: &SessionId, is_typing: bool) -> Result<(), ChatError> {
        self.state.lock().await.ensure_routable(session_id)?;

        let params = vec![Value::from(session_id.as_str()), Value::from(is_typing)];
        let result = self.transport.call(methods::SET_TYPING, params).await;
        self.settle(result).await
    }

    /// Close a session from the user's side.
    ///
    /// The session is unsubscribed, removed and reported closed before the
    /// server is told, so no further events arrive for it either way.
    pub async fn close_session(&self, session_id: &SessionId) -> Result<(), ChatError> {
        self.state
            .lock()
            .await
            .close_session(self.transport.as_ref(), session_id)?;

        let params = vec![Value::from(session_id.as_str())];
        let result = self.transport.call(methods::CLOSE_CHAT, params).await;
        self.settle(result).await
    }

    /// Disconnect on purpose. Ends the event stream without an error event.
    /// Calling it again does nothing.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if state.shutdown() {
            info!("Closing chat client");
            self.transport.disconnect();
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.is_closed()
    }

    /// Snapshot of a registered session.
    pub async fn session(&self, session_id: &SessionId) -> Option<Session> {
        self.state.lock().await.registry.lookup(session_id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    /// Outcome of a call that resolved after the client may have closed.
    async fn settle(&self, result: Result<Value, TransportError>) -> Result<(), ChatError> {
        self.state.lock().await.ensure_open()?;
        result.map(|_| ()).map_err(ChatError::from)
    }
}
