//! In-memory transport for exercising the chat layer without a server.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use touchpoint_common::{RemoteError, SubscriptionHandle, TransportError};
use touchpoint_ddp::{Transport, TransportEvent};

use crate::client::ChatClient;
use crate::events::ChatEvent;

type CallResult = Result<Value, TransportError>;

enum Reply {
    Now(CallResult),
    Later(oneshot::Receiver<CallResult>),
}

/// Records every call and subscription; replies are scripted per method
/// and default to `Ok(null)`.
pub(crate) struct MockTransport {
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    subscriptions: Mutex<Vec<(SubscriptionHandle, String, Vec<Value>)>>,
    unsubscribed: Mutex<Vec<SubscriptionHandle>>,
    disconnects: AtomicUsize,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl MockTransport {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let transport = Self {
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(Vec::new()),
            unsubscribed: Mutex::new(Vec::new()),
            disconnects: AtomicUsize::new(0),
            events,
        };
        (transport, rx)
    }

    /// Queue the result of the next call to `method`.
    pub(crate) fn reply(&self, method: &str, result: CallResult) {
        self.queue(method, Reply::Now(result));
    }

    /// Queue a reply for `method` that resolves when the returned sender fires.
    pub(crate) fn hold(&self, method: &str) -> oneshot::Sender<CallResult> {
        let (tx, rx) = oneshot::channel();
        self.queue(method, Reply::Later(rx));
        tx
    }

    fn queue(&self, method: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Inject a server event.
    pub(crate) fn push(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, method: &str) -> Vec<Vec<Value>> {
        self.calls()
            .into_iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params)
            .collect()
    }

    pub(crate) fn subscriptions(&self) -> Vec<(SubscriptionHandle, String, Vec<Value>)> {
        self.subscriptions.lock().unwrap().clone()
    }

    /// Handle of the most recent subscription.
    pub(crate) fn last_subscription(&self) -> SubscriptionHandle {
        self.subscriptions
            .lock()
            .unwrap()
            .last()
            .map(|(handle, _, _)| handle.clone())
            .expect("no subscription was opened")
    }

    pub(crate) fn unsubscribed(&self) -> Vec<SubscriptionHandle> {
        self.unsubscribed.lock().unwrap().clone()
    }

    pub(crate) fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, method: &str, params: Vec<Value>) -> CallResult {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));
        let reply = {
            let mut replies = self.replies.lock().unwrap();
            replies.get_mut(method).and_then(VecDeque::pop_front)
        };
        match reply {
            None => Ok(Value::Null),
            Some(Reply::Now(result)) => result,
            Some(Reply::Later(rx)) => rx.await.unwrap_or(Err(TransportError::Disconnected)),
        }
    }

    fn subscribe(&self, name: &str, params: Vec<Value>) -> SubscriptionHandle {
        let handle = SubscriptionHandle::new();
        self.subscriptions
            .lock()
            .unwrap()
            .push((handle.clone(), name.to_string(), params));
        handle
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        self.unsubscribed.lock().unwrap().push(handle.clone());
    }

    /// Like the real connection, only the first disconnect produces an event.
    fn disconnect(&self) {
        if self.disconnects.fetch_add(1, Ordering::SeqCst) == 0 {
            self.push(TransportEvent::Disconnected);
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub(crate) struct Harness {
    pub(crate) client: ChatClient,
    pub(crate) events: mpsc::UnboundedReceiver<ChatEvent>,
    pub(crate) transport: Arc<MockTransport>,
}

/// Client wired to a fresh mock transport. Must run inside a runtime.
pub(crate) fn harness() -> Harness {
    let (transport, transport_events) = MockTransport::new();
    let transport = Arc::new(transport);
    let (client, events) = ChatClient::with_transport(transport.clone(), transport_events);
    Harness {
        client,
        events,
        transport,
    }
}

pub(crate) fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

pub(crate) fn remote(code: &str, reason: &str) -> TransportError {
    TransportError::Remote(RemoteError {
        message: format!("{reason} [{code}]"),
        reason: reason.to_string(),
        error_code: Some(code.to_string()),
    })
}
