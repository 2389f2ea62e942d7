//! Scripted transport for tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::error::TransportError;

use super::client::Transport;
use super::{Method, TransportRequest, TransportResponse, JSON_CONTENT_TYPE};

/// Mock response for testing.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// A JSON body with the given status.
    Json(u16, serde_json::Value),
    /// Raw bytes with the given status and content type.
    Bytes(u16, String, Vec<u8>),
    /// A status with an empty body.
    Empty(u16),
    /// A network-level failure.
    Error(String),
}

impl MockResponse {
    fn into_result(self) -> Result<TransportResponse, TransportError> {
        let (status, content_type, body) = match self {
            MockResponse::Json(status, value) => (
                status,
                Some(JSON_CONTENT_TYPE.to_string()),
                serde_json::to_vec(&value).map_err(|e| TransportError::Network(e.to_string()))?,
            ),
            MockResponse::Bytes(status, content_type, data) => (status, Some(content_type), data),
            MockResponse::Empty(status) => (status, None, Vec::new()),
            MockResponse::Error(e) => return Err(TransportError::Network(e)),
        };

        let mut headers = HashMap::new();
        if let Some(ct) = content_type {
            headers.insert("content-type".to_string(), ct);
        }
        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Mock transport for testing.
///
/// Responses are queued per (method, path) and handed out in order. The last
/// queued response for a route is sticky, so a route with a single response
/// answers every request the same way. Every request is recorded.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<(Method, String), VecDeque<MockResponse>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    /// Create a new empty mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a route.
    pub fn with_response(self, method: Method, path: &str, response: MockResponse) -> Self {
        self.push(method, path, response);
        self
    }

    /// Queue a JSON response for a route.
    pub fn with_json(self, method: Method, path: &str, status: u16, body: serde_json::Value) -> Self {
        self.with_response(method, path, MockResponse::Json(status, body))
    }

    /// Queue a response on an already shared transport.
    pub fn push(&self, method: Method, path: &str, response: MockResponse) {
        lock(&self.responses)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// All requests sent so far, oldest first.
    pub fn requests(&self) -> Vec<TransportRequest> {
        lock(&self.requests).clone()
    }

    pub fn last_request(&self) -> Option<TransportRequest> {
        lock(&self.requests).last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let key = (request.method, request.path.clone());
        lock(&self.requests).push(request);

        let response = {
            let mut responses = lock(&self.responses);
            match responses.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match response {
            Some(response) => response.into_result(),
            None => Err(TransportError::Network(format!(
                "No mock response for {} {}",
                key.0, key.1
            ))),
        }
    }
}
