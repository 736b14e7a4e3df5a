//! DDP client over WebSocket, used as the real-time transport.
//!
//! Speaks the Distributed Data Protocol (v1) with `tokio-tungstenite`:
//! handshake, method calls, subscriptions, collection data messages and
//! ping/pong. Connections optionally tunnel through an HTTP proxy. There is
//! no auto-reconnect; once the socket closes the client is spent.
//!
//! The chat layer only sees the [`Transport`] trait and the
//! [`TransportEvent`] stream, so it can run against any implementation.

mod client;
mod connection;
mod handler;
mod proxy;
mod transport;
mod types;

pub use client::DdpClient;
pub use transport::Transport;
pub use types::{DdpMessage, TransportEvent, DDP_VERSION};
