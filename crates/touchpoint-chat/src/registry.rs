//! Session registry: live sessions keyed by id, plus the reverse mapping
//! from subscription handle to session.

use std::collections::HashMap;

use touchpoint_common::{SessionId, SubscriptionHandle};
use touchpoint_ddp::Transport;
use tracing::debug;

use crate::protocol::USER_CHAT_SUBSCRIPTION;
use crate::session::Session;

/// Sessions owned by one client.
///
/// Opening a session subscribes and registers it in one step, and closing
/// it unsubscribes and removes it in one step, so a registered session is
/// never without its subscription and vice versa.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    by_subscription: HashMap<SubscriptionHandle, SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `userChat(id)` and register the session.
    ///
    /// Returns `false` without subscribing if the id is already registered.
    pub fn open(&mut self, transport: &dyn Transport, id: SessionId) -> bool {
        if self.sessions.contains_key(&id) {
            return false;
        }
        let handle = transport.subscribe(
            USER_CHAT_SUBSCRIPTION,
            vec![serde_json::Value::from(id.as_str())],
        );
        let mut session = Session::new(id.clone());
        session.start_subscription(handle.clone());
        debug!(session_id = %id, subscription = %handle, "Session registered");
        self.by_subscription.insert(handle, id.clone());
        self.sessions.insert(id, session);
        true
    }

    /// Close the session, cancel its subscription and remove it.
    ///
    /// Idempotent: returns `None` when the id is not (or no longer)
    /// registered.
    pub fn close(&mut self, transport: &dyn Transport, id: &SessionId) -> Option<Session> {
        let mut session = self.unregister(id)?;
        if let Some(handle) = session.close() {
            transport.unsubscribe(&handle);
        }
        Some(session)
    }

    /// Mark the session failed and remove it. The server already stopped
    /// the subscription, so nothing is cancelled.
    pub fn fail(&mut self, id: &SessionId) -> Option<Session> {
        let mut session = self.unregister(id)?;
        session.fail();
        Some(session)
    }

    /// Remove the session without touching the transport. Idempotent.
    pub fn unregister(&mut self, id: &SessionId) -> Option<Session> {
        let session = self.sessions.remove(id)?;
        if let Some(handle) = session.subscription() {
            self.by_subscription.remove(handle);
        }
        debug!(session_id = %id, "Session unregistered");
        Some(session)
    }

    pub fn lookup(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn lookup_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Session owning the subscription `handle`.
    pub fn by_subscription(&self, handle: &SubscriptionHandle) -> Option<&SessionId> {
        self.by_subscription.get(handle)
    }

    /// The only registered session, if exactly one is registered.
    pub fn sole(&self) -> Option<&SessionId> {
        match self.sessions.len() {
            1 => self.sessions.keys().next(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every session. Used when the connection itself goes away.
    pub fn clear(&mut self) {
        self.sessions.clear();
        self.by_subscription.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use crate::testing::MockTransport;
    use serde_json::json;

    #[tokio::test]
    async fn open_subscribes_and_registers() {
        let (transport, _events) = MockTransport::new();
        let mut registry = SessionRegistry::new();

        assert!(registry.open(&transport, "abc".into()));
        let subscriptions = transport.subscriptions();
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].1, "userChat");
        assert_eq!(subscriptions[0].2, vec![json!("abc")]);

        let session = registry.lookup(&"abc".into()).unwrap();
        assert_eq!(session.state(), SessionState::Subscribing);
        assert_eq!(session.subscription(), Some(&subscriptions[0].0));
        assert_eq!(
            registry.by_subscription(&subscriptions[0].0),
            Some(&SessionId::from("abc"))
        );
    }

    #[tokio::test]
    async fn duplicate_open_is_refused() {
        let (transport, _events) = MockTransport::new();
        let mut registry = SessionRegistry::new();
        assert!(registry.open(&transport, "abc".into()));
        assert!(!registry.open(&transport, "abc".into()));
        assert_eq!(transport.subscriptions().len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn close_unsubscribes_and_is_idempotent() {
        let (transport, _events) = MockTransport::new();
        let mut registry = SessionRegistry::new();
        registry.open(&transport, "abc".into());
        let handle = transport.subscriptions()[0].0.clone();

        let closed = registry.close(&transport, &"abc".into()).unwrap();
        assert_eq!(closed.state(), SessionState::Closed);
        assert_eq!(transport.unsubscribed(), vec![handle.clone()]);
        assert!(registry.is_empty());
        assert!(registry.by_subscription(&handle).is_none());

        assert!(registry.close(&transport, &"abc".into()).is_none());
        assert!(registry.unregister(&"abc".into()).is_none());
        assert_eq!(transport.unsubscribed().len(), 1);
    }

    #[tokio::test]
    async fn fail_removes_without_unsubscribing() {
        let (transport, _events) = MockTransport::new();
        let mut registry = SessionRegistry::new();
        registry.open(&transport, "abc".into());

        let failed = registry.fail(&"abc".into()).unwrap();
        assert_eq!(failed.state(), SessionState::Failed);
        assert!(transport.unsubscribed().is_empty());
        assert!(!registry.contains(&"abc".into()));
    }

    #[tokio::test]
    async fn sole_session() {
        let (transport, _events) = MockTransport::new();
        let mut registry = SessionRegistry::new();
        assert!(registry.sole().is_none());

        registry.open(&transport, "abc".into());
        assert_eq!(registry.sole(), Some(&SessionId::from("abc")));

        registry.open(&transport, "def".into());
        assert!(registry.sole().is_none());

        registry.clear();
        assert!(registry.is_empty());
    }
}
