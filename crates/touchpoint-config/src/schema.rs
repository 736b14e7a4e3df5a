//! Configuration types.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_URL: &str = "wss://touchpoint.telviva.com/websocket";
pub const DEFAULT_AVAILABILITY_URL: &str = "https://touchpoint.telviva.com/";
pub const DEFAULT_TOPIC: &str = "<no topic>";
pub const DEFAULT_TEAM: &str = "default";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchpointConfig {
    pub connection: ConnectionConfig,
    pub session: SessionOptions,
    pub availability: AvailabilityConfig,
}

/// Real-time connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// WebSocket endpoint of the real-time service.
    pub url: String,
    /// Outbound HTTP proxy, tunnelled with CONNECT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    pub connect_timeout_secs: u64,
    /// Client ping interval; 0 disables client pings. A ping left
    /// unanswered for a whole interval drops the connection.
    pub heartbeat_interval_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            proxy: None,
            connect_timeout_secs: 15,
            heartbeat_interval_secs: 25,
        }
    }
}

/// Per-session creation options.
///
/// `signed_context` and `unsigned_context` are kept as raw JSON values here;
/// they are checked and normalized when a session request is built.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub topic: String,
    pub team: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_context: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsigned_context: Option<serde_json::Value>,
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("topic", &self.topic)
            .field("team", &self.team)
            .field(
                "signed_context",
                &self.signed_context.as_ref().map(|_| "[REDACTED]"),
            )
            .field("signature", &self.signature.as_ref().map(|_| "[REDACTED]"))
            .field("unsigned_context", &self.unsigned_context)
            .finish()
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.into(),
            team: DEFAULT_TEAM.into(),
            signed_context: None,
            signature: None,
            unsigned_context: None,
        }
    }
}

impl SessionOptions {
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = team.into();
        self
    }

    pub fn with_signed_context(
        mut self,
        signed_context: impl Into<serde_json::Value>,
        signature: impl Into<String>,
    ) -> Self {
        self.signed_context = Some(signed_context.into());
        self.signature = Some(signature.into());
        self
    }

    pub fn with_unsigned_context(mut self, context: impl Into<serde_json::Value>) -> Self {
        self.unsigned_context = Some(context.into());
        self
    }
}

/// Settings for the HTTP availability lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    /// Whole-request limit, body included.
    pub timeout_secs: u64,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_AVAILABILITY_URL.into(),
            connect_timeout_secs: 10,
            timeout_secs: 30,
        }
    }
}
