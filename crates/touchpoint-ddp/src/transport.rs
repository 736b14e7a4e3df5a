use async_trait::async_trait;
use serde_json::Value;
use touchpoint_common::{SubscriptionHandle, TransportError};

/// A publish/subscribe remote-procedure transport.
///
/// Push data arrives separately as a stream of
/// [`TransportEvent`](crate::TransportEvent)s. `subscribe`, `unsubscribe`
/// and `disconnect` only enqueue work and never block, so callers can issue
/// them while holding their own state lock.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Invoke a remote method and wait for its result.
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError>;

    /// Start a subscription. The handle is assigned locally, so it is known
    /// before any `Ready`/`NoSub` event for it can be delivered.
    fn subscribe(&self, name: &str, params: Vec<Value>) -> SubscriptionHandle;

    /// Stop a subscription. Unknown or already stopped handles are ignored.
    fn unsubscribe(&self, handle: &SubscriptionHandle);

    /// Sever the connection. Idempotent.
    fn disconnect(&self);
}
