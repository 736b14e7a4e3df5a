//! TOML config file loading and environment overrides.

use std::path::{Path, PathBuf};

use touchpoint_common::ConfigError;
use tracing::{debug, info};

use crate::schema::TouchpointConfig;
use crate::validation;

/// Parse and validate a config from TOML text.
pub fn load_from_str(content: &str) -> Result<TouchpointConfig, ConfigError> {
    let config: TouchpointConfig = toml::from_str(content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load config from a specific TOML file path.
pub fn load_from_path(path: &Path) -> Result<TouchpointConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::ParseError(format!("failed to read {}: {e}", path.display()))
    })?;

    let config = load_from_str(&content)?;
    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform default path, falling back to defaults
/// when no file exists. Environment overrides are applied either way.
///
/// On macOS: `~/Library/Application Support/touchpoint/config.toml`
/// On Linux: `~/.config/touchpoint/config.toml`
pub fn load_default() -> Result<TouchpointConfig, ConfigError> {
    let path = default_config_path()?;
    let mut config = if path.exists() {
        load_from_path(&path)?
    } else {
        debug!("no config at {}, using defaults", path.display());
        TouchpointConfig::default()
    };
    apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        ConfigError::ParseError("could not determine config directory".into())
    })?;
    Ok(config_dir.join("touchpoint").join("config.toml"))
}

/// Apply `TOUCHPOINT_URL`, `TOUCHPOINT_PROXY` and `TOUCHPOINT_TEAM` from the
/// process environment.
pub fn apply_env_overrides(config: &mut TouchpointConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides from an arbitrary key lookup. Empty values are ignored.
pub fn apply_overrides_from<F>(config: &mut TouchpointConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get("TOUCHPOINT_URL") {
        debug!(url = %url, "connection.url overridden from environment");
        config.connection.url = url;
    }
    if let Some(proxy) = get("TOUCHPOINT_PROXY") {
        debug!("connection.proxy overridden from environment");
        config.connection.proxy = Some(proxy);
    }
    if let Some(team) = get("TOUCHPOINT_TEAM") {
        config.session.team = team;
    }
}
