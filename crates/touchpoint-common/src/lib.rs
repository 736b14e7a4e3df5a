pub mod errors;
pub mod id;

pub use errors::{ChatError, ConfigError, RemoteError, TransportError};
pub use id::{new_id, SessionId, SubscriptionHandle};

pub type Result<T> = std::result::Result<T, ChatError>;
