//! Touchpoint client configuration.
//!
//! TOML-based configuration for the connection endpoint, session defaults
//! and the availability probe. Every section has defaults so partial files
//! (or no file at all) work.
//!
//! ```rust,no_run
//! use std::path::Path;
//! use touchpoint_config::load_from_path;
//!
//! let config = load_from_path(Path::new("touchpoint.toml")).expect("bad config");
//! println!("{}", config.connection.url);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    AvailabilityConfig, ConnectionConfig, SessionOptions, TouchpointConfig, DEFAULT_AVAILABILITY_URL,
    DEFAULT_TEAM, DEFAULT_TOPIC, DEFAULT_URL,
};
pub use toml_loader::{
    apply_env_overrides, apply_overrides_from, default_config_path, load_default, load_from_path,
    load_from_str,
};
pub use validation::validate;
