//! WebSocket connection setup, DDP handshake and the background
//! connection loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Interval;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use touchpoint_common::TransportError;
use touchpoint_config::ConnectionConfig;
use tracing::{debug, error, info, warn};

use super::handler::{handle_ddp_message, PendingCalls};
use super::proxy;
use super::types::{DdpCommand, DdpMessage, TransportEvent};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Id Counter
// ---------------------------------------------------------------------------

/// Monotonically increasing id for method calls.
static METHOD_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_method_id() -> String {
    METHOD_ID.fetch_add(1, Ordering::Relaxed).to_string()
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Open the socket and complete the DDP handshake within the configured
/// timeout. Returns the socket and the server-assigned DDP session.
pub(crate) async fn establish(config: &ConnectionConfig) -> Result<(WsStream, String), TransportError> {
    let timeout = Duration::from_secs(config.connect_timeout_secs);
    match tokio::time::timeout(timeout, async {
        let mut ws = open_socket(config).await?;
        let session = handshake(&mut ws).await?;
        Ok::<_, TransportError>((ws, session))
    })
    .await
    {
        Ok(result) => result,
        Err(_elapsed) => {
            error!(
                timeout_secs = config.connect_timeout_secs,
                "DDP connection timed out"
            );
            Err(TransportError::Timeout)
        }
    }
}

async fn open_socket(config: &ConnectionConfig) -> Result<WsStream, TransportError> {
    let url = config.url.as_str();
    let result = match &config.proxy {
        None => tokio_tungstenite::connect_async(url).await,
        Some(proxy_url) => {
            let stream = proxy::tunnel(proxy_url, url).await?;
            tokio_tungstenite::client_async_tls(url, stream).await
        }
    };
    match result {
        Ok((ws, _response)) => Ok(ws),
        Err(e) => {
            error!(error = %e, "Failed to open WebSocket");
            Err(TransportError::Connect(e.to_string()))
        }
    }
}

async fn handshake(ws: &mut WsStream) -> Result<String, TransportError> {
    send_message(ws, &DdpMessage::connect())
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))?;

    while let Some(frame) = ws.next().await {
        let text = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => return Err(TransportError::Connect(e.to_string())),
        };
        match serde_json::from_str::<DdpMessage>(&text) {
            Ok(DdpMessage::Connected { session }) => return Ok(session),
            Ok(DdpMessage::Failed { version }) => {
                return Err(TransportError::Protocol(format!(
                    "server requires DDP version {version}"
                )));
            }
            Ok(DdpMessage::Ping { id }) => {
                send_message(ws, &DdpMessage::Pong { id })
                    .await
                    .map_err(|e| TransportError::Connect(e.to_string()))?;
            }
            Ok(other) => debug!(message = ?other, "Ignoring message before handshake"),
            Err(_) => debug!(text = %text, "Ignoring non-DDP frame"),
        }
    }
    Err(TransportError::Disconnected)
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Background task owning the socket until it closes.
///
/// Emits exactly one [`TransportEvent::Disconnected`] on exit and fails
/// every call still waiting for a result. With heartbeats enabled, a full
/// interval without any frame from the server after a ping ends the loop.
pub(crate) async fn connection_loop(
    ws: WsStream,
    heartbeat_interval_secs: u64,
    connected: Arc<RwLock<bool>>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    mut command_rx: mpsc::UnboundedReceiver<DdpCommand>,
) {
    let (mut ws_write, mut ws_read) = ws.split();
    let mut pending = PendingCalls::new();
    let mut heartbeat = (heartbeat_interval_secs > 0).then(|| {
        let period = Duration::from_secs(heartbeat_interval_secs);
        tokio::time::interval_at(tokio::time::Instant::now() + period, period)
    });
    // Cleared by any frame from the server, not only the matching pong.
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            frame = ws_read.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    awaiting_pong = false;
                    match serde_json::from_str::<DdpMessage>(&text) {
                        Ok(msg) => {
                            if let Some(reply) = handle_ddp_message(msg, &mut pending, &event_tx) {
                                if let Err(e) = send_message(&mut ws_write, &reply).await {
                                    warn!(error = %e, "Failed to answer server");
                                    break;
                                }
                            }
                        }
                        Err(_) => debug!(text = %text, "Unrecognized frame from server"),
                    }
                }
                Some(Ok(WsMessage::Close(_))) => {
                    info!("Server closed the DDP connection");
                    break;
                }
                Some(Ok(_)) => awaiting_pong = false,
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    break;
                }
                None => break,
            },
            command = command_rx.recv() => match command {
                Some(DdpCommand::Disconnect) | None => {
                    info!("Closing DDP connection");
                    let _ = ws_write.send(WsMessage::Close(None)).await;
                    break;
                }
                Some(command) => {
                    if let Err(e) = forward_command(command, &mut ws_write, &mut pending).await {
                        warn!(error = %e, "Failed to send to server");
                        break;
                    }
                }
            },
            _ = tick(&mut heartbeat) => {
                if awaiting_pong {
                    warn!(
                        interval_secs = heartbeat_interval_secs,
                        "No reply to heartbeat, dropping connection"
                    );
                    break;
                }
                awaiting_pong = true;
                if let Err(e) = send_message(&mut ws_write, &DdpMessage::Ping { id: None }).await {
                    warn!(error = %e, "Heartbeat failed");
                    break;
                }
            }
        }
    }

    // Cleanup.
    *connected.write().await = false;
    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(TransportError::Disconnected));
    }
    let _ = event_tx.send(TransportEvent::Disconnected);
}

async fn tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn forward_command<S>(
    command: DdpCommand,
    writer: &mut S,
    pending: &mut PendingCalls,
) -> Result<(), String>
where
    S: Sink<WsMessage> + Unpin,
    S::Error: std::fmt::Display,
{
    match command {
        DdpCommand::Call {
            method,
            params,
            reply,
        } => {
            let id = next_method_id();
            debug!(method = %method, id = %id, "Calling method");
            let msg = DdpMessage::Method {
                method,
                params,
                id: id.clone(),
            };
            // Register first so a fast result always finds its caller.
            pending.insert(id.clone(), reply);
            if let Err(e) = send_message(writer, &msg).await {
                if let Some(reply) = pending.remove(&id) {
                    let _ = reply.send(Err(TransportError::Disconnected));
                }
                return Err(e);
            }
        }
        DdpCommand::Subscribe { id, name, params } => {
            debug!(name = %name, id = %id, "Subscribing");
            send_message(writer, &DdpMessage::Sub { id, name, params }).await?;
        }
        DdpCommand::Unsubscribe { id } => {
            debug!(id = %id, "Unsubscribing");
            send_message(writer, &DdpMessage::Unsub { id }).await?;
        }
        DdpCommand::Disconnect => {}
    }
    Ok(())
}

async fn send_message<S>(writer: &mut S, msg: &DdpMessage) -> Result<(), String>
where
    S: Sink<WsMessage> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    writer
        .send(WsMessage::Text(json.into()))
        .await
        .map_err(|e| e.to_string())
}
