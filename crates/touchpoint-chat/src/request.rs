//! Validated parameters of a `createChat` call.

use std::fmt;

use serde_json::Value;
use touchpoint_common::ChatError;
use touchpoint_config::{SessionOptions, DEFAULT_TEAM, DEFAULT_TOPIC};

use crate::protocol::TEXT_CHANNEL;

/// Everything needed to create a session, checked up front so invalid
/// input fails before anything touches the network.
#[derive(Clone, PartialEq)]
pub struct SessionRequest {
    customer_id: String,
    topic: String,
    team: String,
    signed_context: Option<String>,
    signature: Option<String>,
    unsigned_context: Option<String>,
}

impl SessionRequest {
    /// Validate `options` for `customer_id`.
    ///
    /// The signed context must already be a string (it is signed as-is).
    /// A structured unsigned context is sent as its JSON text. Empty topic
    /// and team fall back to their defaults.
    pub fn new(customer_id: &str, options: &SessionOptions) -> Result<Self, ChatError> {
        if customer_id.trim().is_empty() {
            return Err(ChatError::Validation("customer id must not be empty".into()));
        }

        let signed_context = match &options.signed_context {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(ChatError::Validation(
                    "signed context must be a string".into(),
                ))
            }
        };
        let unsigned_context = match &options.unsigned_context {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        Ok(Self {
            customer_id: customer_id.to_string(),
            topic: non_empty_or(&options.topic, DEFAULT_TOPIC),
            team: non_empty_or(&options.team, DEFAULT_TEAM),
            signed_context,
            signature: options.signature.clone(),
            unsigned_context,
        })
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    /// Positional `createChat` parameters.
    pub(crate) fn to_params(&self) -> Vec<Value> {
        vec![
            Value::from(self.customer_id.as_str()),
            Value::from(self.topic.as_str()),
            Value::from(self.team.as_str()),
            Value::from(TEXT_CHANNEL),
            optional(&self.signed_context),
            optional(&self.signature),
            optional(&self.unsigned_context),
        ]
    }
}

impl fmt::Debug for SessionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRequest")
            .field("customer_id", &self.customer_id)
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

fn non_empty_or(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn optional(value: &Option<String>) -> Value {
    value.as_deref().map(Value::from).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_produce_positional_params() {
        let request = SessionRequest::new("cust-1", &SessionOptions::default()).unwrap();
        assert_eq!(
            request.to_params(),
            vec![
                json!("cust-1"),
                json!("<no topic>"),
                json!("default"),
                json!("text"),
                Value::Null,
                Value::Null,
                Value::Null,
            ]
        );
    }

    #[test]
    fn empty_customer_id_is_rejected() {
        let err = SessionRequest::new("  ", &SessionOptions::default()).unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[test]
    fn structured_signed_context_is_rejected() {
        let options = SessionOptions::default().with_signed_context(json!({ "user": 1 }), "sig");
        let err = SessionRequest::new("cust-1", &options).unwrap_err();
        assert!(matches!(err, ChatError::Validation(msg) if msg.contains("signed context")));
    }

    #[test]
    fn signed_context_and_signature_are_passed_through() {
        let options = SessionOptions::default().with_signed_context("{\"user\":1}", "sig-1");
        let params = SessionRequest::new("cust-1", &options).unwrap().to_params();
        assert_eq!(params[4], json!("{\"user\":1}"));
        assert_eq!(params[5], json!("sig-1"));
    }

    #[test]
    fn structured_unsigned_context_is_serialized() {
        let options = SessionOptions::default().with_unsigned_context(json!({ "plan": "gold" }));
        let params = SessionRequest::new("cust-1", &options).unwrap().to_params();
        assert_eq!(params[6], json!("{\"plan\":\"gold\"}"));

        let options = SessionOptions::default().with_unsigned_context("plain");
        let params = SessionRequest::new("cust-1", &options).unwrap().to_params();
        assert_eq!(params[6], json!("plain"));
    }

    #[test]
    fn empty_topic_and_team_fall_back() {
        let options = SessionOptions::default().with_topic("").with_team("");
        let request = SessionRequest::new("cust-1", &options).unwrap();
        assert_eq!(request.topic(), "<no topic>");
        assert_eq!(request.team(), "default");
    }

    #[test]
    fn debug_redacts_signed_material() {
        let options = SessionOptions::default().with_signed_context("secret-ctx", "secret-sig");
        let request = SessionRequest::new("cust-1", &options).unwrap();
        let debug = format!("{request:?}");
        assert!(!debug.contains("secret-ctx"));
        assert!(!debug.contains("secret-sig"));
    }
}
