//! HTTP availability lookup: can a customer's team take a text chat now?
//!
//! Independent of the real-time connection; one GET per check.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use touchpoint_common::{ChatError, RemoteError};
use touchpoint_config::{AvailabilityConfig, DEFAULT_TEAM};
use tracing::{debug, warn};

use crate::protocol::TEXT_CHANNEL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
}

/// One entry of the channels listing.
#[derive(Debug, Deserialize)]
struct ChannelStatus {
    #[serde(default)]
    channel: String,
    #[serde(default)]
    available: bool,
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

pub struct AvailabilityProbe {
    http: reqwest::Client,
    base_url: String,
}

impl AvailabilityProbe {
    /// `base_url` must end with `/`; requests go through `proxy` if given.
    pub fn new(config: &AvailabilityConfig, proxy: Option<&str>) -> Result<Self, ChatError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs));
        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| ChatError::Http(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        let http = builder.build().map_err(|e| ChatError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// Whether the `text` channel of `team` (default team if `None`) is
    /// available. A listing without a text channel means unavailable.
    pub async fn check(&self, customer_id: &str, team: Option<&str>) -> Result<Availability, ChatError> {
        if customer_id.is_empty() {
            return Err(ChatError::Validation("customer id must not be empty".into()));
        }
        let url = channels_url(&self.base_url, customer_id, team.unwrap_or(DEFAULT_TEAM));
        debug!(url = %url, "Checking availability");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ChatError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::Http(e.to_string()))?;

        if status.as_u16() >= 300 {
            warn!(status = %status, "Availability lookup rejected");
            return Err(ChatError::Remote(error_from_body(status, &body)));
        }

        let channels: Vec<ChannelStatus> =
            serde_json::from_str(&body).map_err(|e| ChatError::Parse(e.to_string()))?;
        Ok(text_channel_availability(&channels))
    }
}

/// One-shot check with an ad-hoc client. `base_url` defaults to the
/// public service.
pub async fn is_available(
    customer_id: &str,
    team: Option<&str>,
    base_url: Option<&str>,
    proxy: Option<&str>,
) -> Result<Availability, ChatError> {
    let mut config = AvailabilityConfig::default();
    if let Some(base_url) = base_url {
        config.base_url = base_url.to_string();
    }
    AvailabilityProbe::new(&config, proxy)?
        .check(customer_id, team)
        .await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn channels_url(base_url: &str, customer_id: &str, team: &str) -> String {
    format!(
        "{base_url}api/customers/{}/teams/{}/channels",
        urlencoding::encode(customer_id),
        urlencoding::encode(team)
    )
}

fn text_channel_availability(channels: &[ChannelStatus]) -> Availability {
    let available = channels
        .iter()
        .find(|c| c.channel == TEXT_CHANNEL)
        .is_some_and(|c| c.available);
    Availability { available }
}

/// Structured error from an error response. Bodies that are not a JSON
/// error object still carry the status code.
fn error_from_body(status: reqwest::StatusCode, body: &str) -> RemoteError {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) if value.is_object() => RemoteError::from_value(&value),
        _ => RemoteError {
            error_code: Some(status.as_u16().to_string()),
            ..RemoteError::new(format!("HTTP {status}"))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn probe(server: &MockServer) -> AvailabilityProbe {
        let config = AvailabilityConfig {
            base_url: format!("{}/", server.uri()),
            ..AvailabilityConfig::default()
        };
        AvailabilityProbe::new(&config, None).unwrap()
    }

    #[test]
    fn url_escapes_path_segments() {
        assert_eq!(
            channels_url("https://touchpoint.telviva.com/", "acme corp", "sales/eu"),
            "https://touchpoint.telviva.com/api/customers/acme%20corp/teams/sales%2Feu/channels"
        );
    }

    #[tokio::test]
    async fn text_channel_decides() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/customers/cust-1/teams/default/channels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "channel": "voice", "available": false },
                { "channel": "text", "available": true }
            ])))
            .mount(&server)
            .await;

        let availability = probe(&server).await.check("cust-1", None).await.unwrap();
        assert!(availability.available);
    }

    #[tokio::test]
    async fn missing_text_channel_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/customers/cust-1/teams/sales/channels"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "channel": "voice", "available": true }])),
            )
            .mount(&server)
            .await;

        let availability = probe(&server)
            .await
            .check("cust-1", Some("sales"))
            .await
            .unwrap();
        assert_eq!(availability, Availability { available: false });
    }

    #[tokio::test]
    async fn error_status_carries_remote_reason() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": "customer-not-found",
                "reason": "Unknown customer",
                "message": "Unknown customer [customer-not-found]"
            })))
            .mount(&server)
            .await;

        match probe(&server).await.check("nobody", None).await {
            Err(ChatError::Remote(err)) => {
                assert_eq!(err.reason, "Unknown customer");
                assert_eq!(err.error_code.as_deref(), Some("customer-not-found"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_status_without_json_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&server)
            .await;

        match probe(&server).await.check("cust-1", None).await {
            Err(ChatError::Remote(err)) => {
                assert_eq!(err.error_code.as_deref(), Some("503"));
                assert!(err.message.contains("503"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_response_hits_configured_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "channel": "text", "available": true }]))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = AvailabilityConfig {
            base_url: format!("{}/", server.uri()),
            timeout_secs: 1,
            ..AvailabilityConfig::default()
        };
        let probe = AvailabilityProbe::new(&config, None).unwrap();
        assert!(matches!(
            probe.check("cust-1", None).await,
            Err(ChatError::Http(_))
        ));
    }

    #[tokio::test]
    async fn malformed_listing_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        assert!(matches!(
            probe(&server).await.check("cust-1", None).await,
            Err(ChatError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn one_shot_check_uses_given_base_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/customers/cust-1/teams/default/channels"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "channel": "text", "available": true }])),
            )
            .mount(&server)
            .await;

        let base_url = format!("{}/", server.uri());
        let availability = is_available("cust-1", None, Some(&base_url), None)
            .await
            .unwrap();
        assert!(availability.available);
    }

    #[tokio::test]
    async fn empty_customer_id_is_rejected() {
        let config = AvailabilityConfig::default();
        let probe = AvailabilityProbe::new(&config, None).unwrap();
        assert!(matches!(
            probe.check("", None).await,
            Err(ChatError::Validation(_))
        ));
    }
}
