//! Single-session facade: one connection, one chat.
//!
//! The session is created as part of [`Chat::open`]; its events arrive
//! without session ids. When the chat closes or fails for any reason the
//! whole connection is shut down.

use serde_json::Value;
use tokio::sync::mpsc;
use touchpoint_common::{ChatError, SessionId};
use touchpoint_config::TouchpointConfig;
use tracing::debug;

use crate::client::ChatClient;
use crate::events::{ChatEvent, SessionEvent};
use crate::request::SessionRequest;

pub struct Chat {
    client: ChatClient,
    session_id: SessionId,
}

impl Chat {
    /// Connect and create a chat for `customer_id` with the configured
    /// session options. Invalid options fail before connecting.
    pub async fn open(
        config: &TouchpointConfig,
        customer_id: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), ChatError> {
        let request = SessionRequest::new(customer_id, &config.session)?;
        let (client, events) = ChatClient::connect(&config.connection).await?;
        Self::start(client, events, request).await
    }

    /// Create the chat on an existing client. The client is closed if
    /// creation fails.
    pub async fn start(
        client: ChatClient,
        events: mpsc::UnboundedReceiver<ChatEvent>,
        request: SessionRequest,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), ChatError> {
        let session_id = match client.create_session(request).await {
            Ok(id) => id,
            Err(e) => {
                client.close().await;
                return Err(e);
            }
        };

        let (session_tx, session_rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_events(client.clone(), events, session_tx));

        Ok((Self { client, session_id }, session_rx))
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub async fn send_message(&self, message: &str, attachment: Option<Value>) -> Result<(), ChatError> {
        self.client
            .send_message(&self.session_id, message, attachment)
            .await
    }

    pub async fn set_typing(&self, is_typing: bool) -> Result<(), ChatError> {
        self.client.set_typing(&self.session_id, is_typing).await
    }

    /// End the chat on the server, then disconnect.
    pub async fn end(&self) -> Result<(), ChatError> {
        let result = self.client.close_session(&self.session_id).await;
        self.client.close().await;
        result
    }

    /// Disconnect without ending the chat on the server. Idempotent.
    pub async fn close(&self) {
        self.client.close().await;
    }

    pub async fn is_closed(&self) -> bool {
        self.client.is_closed().await
    }
}

/// Strip session ids and close the client after the first terminal event.
async fn forward_events(
    client: ChatClient,
    mut events: mpsc::UnboundedReceiver<ChatEvent>,
    session_tx: mpsc::UnboundedSender<SessionEvent>,
) {
    while let Some(event) = events.recv().await {
        let event = SessionEvent::from(event);
        let terminal = event.is_terminal();
        let _ = session_tx.send(event);
        if terminal {
            debug!("Chat ended, closing connection");
            client.close().await;
        }
    }
}
