//! Per-session state machine.
//!
//! ```text
//! Pending --subscribe--> Subscribing --ready--> Active
//!                            |                    |
//!                            +--nosub--> Failed <-+
//!                            |                    |
//!                            +------close-----> Closed
//! ```
//!
//! `Closed` and `Failed` are terminal. A session holds a subscription
//! handle exactly while it is `Subscribing` or `Active`.

use touchpoint_common::{SessionId, SubscriptionHandle};

use crate::protocol::ChatUpdate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created; no subscription requested yet.
    Pending,
    /// Subscription requested, initial data not yet delivered.
    Subscribing,
    Active,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }
}

/// Observable consequence of a `chats` update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    AgentIsTyping(bool),
    AgentId(Option<String>),
    /// The server marked the chat closed; the caller tears the session down.
    Closed,
}

/// One chat session as tracked by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    subscription: Option<SubscriptionHandle>,
    agent_id: Option<String>,
    agent_is_typing: bool,
}

impl Session {
    pub(crate) fn new(id: SessionId) -> Self {
        Self {
            id,
            state: SessionState::Pending,
            subscription: None,
            agent_id: None,
            agent_is_typing: false,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn subscription(&self) -> Option<&SubscriptionHandle> {
        self.subscription.as_ref()
    }

    /// Last agent assignment seen on the session.
    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    pub fn agent_is_typing(&self) -> bool {
        self.agent_is_typing
    }

    /// `Pending -> Subscribing`. Returns `false` from any other state.
    pub(crate) fn start_subscription(&mut self, handle: SubscriptionHandle) -> bool {
        if self.state != SessionState::Pending {
            return false;
        }
        self.subscription = Some(handle);
        self.state = SessionState::Subscribing;
        true
    }

    /// `Subscribing -> Active`. Returns whether the transition happened;
    /// repeated ready notifications are ignored.
    pub(crate) fn mark_ready(&mut self) -> bool {
        if self.state != SessionState::Subscribing {
            return false;
        }
        self.state = SessionState::Active;
        true
    }

    /// Fold a `chats` update into the session.
    ///
    /// Emits a signal for each field present in the update, in the order
    /// typing, agent, closed. Terminal sessions ignore updates.
    pub(crate) fn apply_update(&mut self, update: &ChatUpdate) -> Vec<SessionSignal> {
        let mut signals = Vec::new();
        if self.state.is_terminal() {
            return signals;
        }
        if let Some(value) = update.agent_is_typing {
            let value = value.unwrap_or(false);
            self.agent_is_typing = value;
            signals.push(SessionSignal::AgentIsTyping(value));
        }
        if let Some(value) = &update.agent_id {
            self.agent_id = value.clone();
            signals.push(SessionSignal::AgentId(value.clone()));
        }
        if update.is_closed == Some(true) {
            signals.push(SessionSignal::Closed);
        }
        signals
    }

    /// Move to `Closed`, handing back the subscription to cancel. `None` if
    /// the session was already terminal.
    pub(crate) fn close(&mut self) -> Option<SubscriptionHandle> {
        self.terminate(SessionState::Closed)
    }

    /// Move to `Failed` after the server stopped the subscription.
    pub(crate) fn fail(&mut self) -> Option<SubscriptionHandle> {
        self.terminate(SessionState::Failed)
    }

    fn terminate(&mut self, state: SessionState) -> Option<SubscriptionHandle> {
        if self.state.is_terminal() {
            return None;
        }
        self.state = state;
        self.agent_is_typing = false;
        self.subscription.take()
    }
}
