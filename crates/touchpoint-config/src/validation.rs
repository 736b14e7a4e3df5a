//! Configuration validation.
//!
//! Collects every violation so a bad file is reported in one pass.

use touchpoint_common::ConfigError;

use crate::schema::TouchpointConfig;

/// Run all validations on a config.
pub fn validate(config: &TouchpointConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_scheme(
        &mut errors,
        "connection.url",
        &config.connection.url,
        &["ws://", "wss://"],
    );
    if let Some(proxy) = &config.connection.proxy {
        validate_scheme(&mut errors, "connection.proxy", proxy, &["http://"]);
    }
    if config.connection.connect_timeout_secs == 0 {
        errors.push("connection.connect_timeout_secs must be greater than 0".into());
    }

    if config.session.team.trim().is_empty() {
        errors.push("session.team must not be empty".into());
    }
    if let Some(ctx) = &config.session.signed_context {
        if !ctx.is_string() {
            errors.push("session.signed_context must be a string, if present".into());
        }
    }

    let base_url = &config.availability.base_url;
    validate_scheme(
        &mut errors,
        "availability.base_url",
        base_url,
        &["http://", "https://"],
    );
    if !base_url.ends_with('/') {
        errors.push(format!(
            "availability.base_url = {base_url:?} must end with '/'"
        ));
    }
    if config.availability.connect_timeout_secs == 0 {
        errors.push("availability.connect_timeout_secs must be greater than 0".into());
    }
    if config.availability.timeout_secs == 0 {
        errors.push("availability.timeout_secs must be greater than 0".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_scheme(errors: &mut Vec<String>, name: &str, value: &str, schemes: &[&str]) {
    if !schemes.iter().any(|s| value.starts_with(s)) {
        errors.push(format!(
            "{name} = {value:?} must start with one of {}",
            schemes.join(", ")
        ));
    }
}
