//! Live customer-support chat sessions over the Touchpoint real-time service.
//!
//! Turns the generic DDP transport into chat semantics: session creation,
//! per-session subscriptions, typed domain events (messages, typing
//! indicator, agent assignment, closure) and client-wide disconnect
//! handling. Any number of sessions can share one connection through
//! [`ChatClient`]; [`Chat`] is the single-session projection.
//!
//! ```rust,no_run
//! use touchpoint_chat::{ChatClient, ChatEvent, SessionRequest};
//! use touchpoint_config::TouchpointConfig;
//!
//! # async fn run() -> touchpoint_common::Result<()> {
//! let config = TouchpointConfig::default();
//! let request = SessionRequest::new("cust-1", &config.session)?;
//! let (client, mut events) = ChatClient::connect(&config.connection).await?;
//! let session = client.create_session(request).await?;
//! while let Some(event) = events.recv().await {
//!     if let ChatEvent::SessionReady { .. } = event {
//!         client.send_message(&session, "Hello!", None).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod availability;
pub mod client;
pub mod events;
pub mod protocol;
pub mod registry;
pub mod request;
pub mod session;
pub mod single;

#[cfg(test)]
pub(crate) mod testing;

pub use availability::{is_available, Availability, AvailabilityProbe};
pub use client::ChatClient;
pub use events::{ChatEvent, SessionEvent};
pub use protocol::ChatUpdate;
pub use registry::SessionRegistry;
pub use request::SessionRequest;
pub use session::{Session, SessionSignal, SessionState};
pub use single::Chat;
