//! Public handle for the DDP connection.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, RwLock};
use touchpoint_common::{SubscriptionHandle, TransportError};
use touchpoint_config::ConnectionConfig;
use tracing::info;

use super::connection::{connection_loop, establish};
use super::transport::Transport;
use super::types::{DdpCommand, TransportEvent};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for a live DDP connection.
///
/// All methods send commands to the background connection task.
pub struct DdpClient {
    command_tx: mpsc::UnboundedSender<DdpCommand>,
    connected: Arc<RwLock<bool>>,
    session: String,
}

impl DdpClient {
    /// Connect, complete the handshake, and start the background task.
    /// Returns `(client, event_receiver)`.
    pub async fn connect(
        config: &ConnectionConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), TransportError> {
        info!(
            url = %config.url,
            proxied = config.proxy.is_some(),
            "Connecting to DDP endpoint"
        );
        let (ws, session) = establish(config).await?;
        info!(session = %session, "DDP session established");

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(RwLock::new(true));

        tokio::spawn(connection_loop(
            ws,
            config.heartbeat_interval_secs,
            Arc::clone(&connected),
            event_tx,
            command_rx,
        ));

        let client = Self {
            command_tx,
            connected,
            session,
        };
        Ok((client, event_rx))
    }

    /// Server-assigned DDP session id.
    pub fn session(&self) -> &str {
        &self.session
    }

    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }
}

#[async_trait]
impl Transport for DdpClient {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let (reply, reply_rx) = oneshot::channel();
        self.command_tx
            .send(DdpCommand::Call {
                method: method.to_string(),
                params,
                reply,
            })
            .map_err(|_| TransportError::Disconnected)?;
        reply_rx.await.map_err(|_| TransportError::Disconnected)?
    }

    fn subscribe(&self, name: &str, params: Vec<Value>) -> SubscriptionHandle {
        let handle = SubscriptionHandle::new();
        let _ = self.command_tx.send(DdpCommand::Subscribe {
            id: handle.as_str().to_string(),
            name: name.to_string(),
            params,
        });
        handle
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let _ = self.command_tx.send(DdpCommand::Unsubscribe {
            id: handle.as_str().to_string(),
        });
    }

    fn disconnect(&self) {
        let _ = self.command_tx.send(DdpCommand::Disconnect);
    }
}
