//! Mock objects and fake implementations for testing
//!
//! [`MockApiClient`] replays scripted replies per `(method, path)` in FIFO
//! order and records every call it receives. [`RecordingNotifier`] keeps the
//! notifications it was handed.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;

use crate::api::{ApiClient, ApiError};
use crate::notify::{Notifier, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// A request as the mock received it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: MockMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

struct Reply {
    result: Result<Value, ApiError>,
    gate: Option<oneshot::Receiver<()>>,
}

type ReplyQueues = HashMap<(MockMethod, String), VecDeque<Reply>>;

/// Scripted [`ApiClient`]
///
/// Unscripted requests fail with HTTP 404.
#[derive(Default)]
pub struct MockApiClient {
    replies: Mutex<ReplyQueues>,
    calls: Mutex<Vec<RecordedCall>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl MockApiClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: MockMethod, path: &str, reply: Reply) {
        locked(&self.replies)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    /// Queue a successful reply
    pub fn respond(&self, method: MockMethod, path: &str, body: Value) {
        self.push(
            method,
            path,
            Reply {
                result: Ok(body),
                gate: None,
            },
        );
    }

    /// Queue an HTTP failure
    pub fn fail(&self, method: MockMethod, path: &str, status: u16, message: Option<&str>) {
        self.push(
            method,
            path,
            Reply {
                result: Err(ApiError::Http {
                    status,
                    message: message.map(ToString::to_string),
                }),
                gate: None,
            },
        );
    }

    /// Queue a reply held back until the returned sender fires
    ///
    /// The call is recorded as soon as it arrives, before the gate opens.
    #[must_use]
    pub fn respond_gated(&self, method: MockMethod, path: &str, body: Value) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(
            method,
            path,
            Reply {
                result: Ok(body),
                gate: Some(rx),
            },
        );
        tx
    }

    /// Every call received so far, in arrival order
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        locked(&self.calls).clone()
    }

    #[must_use]
    pub fn count(&self, method: MockMethod, path: &str) -> usize {
        locked(&self.calls)
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    async fn handle(&self, call: RecordedCall) -> Result<Value, ApiError> {
        let key = (call.method, call.path.clone());
        locked(&self.calls).push(call);

        let reply = locked(&self.replies)
            .get_mut(&key)
            .and_then(VecDeque::pop_front);

        let Some(reply) = reply else {
            return Err(ApiError::Http {
                status: 404,
                message: None,
            });
        };

        if let Some(gate) = reply.gate {
            let _ = gate.await;
        }
        reply.result
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
        self.handle(RecordedCall {
            method: MockMethod::Get,
            path: path.to_string(),
            query: query.to_vec(),
            body: None,
        })
        .await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.handle(RecordedCall {
            method: MockMethod::Post,
            path: path.to_string(),
            query: Vec::new(),
            body: Some(body),
        })
        .await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.handle(RecordedCall {
            method: MockMethod::Put,
            path: path.to_string(),
            query: Vec::new(),
            body: Some(body),
        })
        .await
    }

    async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.handle(RecordedCall {
            method: MockMethod::Delete,
            path: path.to_string(),
            query: Vec::new(),
            body: None,
        })
        .await
    }
}

/// Notifier that remembers everything it was told
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(Severity, String)>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<(Severity, String)> {
        locked(&self.messages).clone()
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        locked(&self.messages)
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        locked(&self.messages).push((severity, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_replies_are_consumed_in_order() {
        let api = MockApiClient::new();
        api.respond(MockMethod::Get, "/a", json!(1));
        api.respond(MockMethod::Get, "/a", json!(2));

        assert_eq!(api.get("/a", &[]).await.unwrap(), json!(1));
        assert_eq!(api.get("/a", &[]).await.unwrap(), json!(2));
        assert_eq!(
            api.get("/a", &[]).await.unwrap_err().status(),
            Some(404)
        );
        assert_eq!(api.count(MockMethod::Get, "/a"), 3);
    }

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.success("ok");
        notifier.error("bad");
        assert_eq!(notifier.count(Severity::Success), 1);
        assert_eq!(notifier.messages()[1], (Severity::Error, "bad".to_string()));
    }
}
