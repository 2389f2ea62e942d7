//! Authenticated request pipeline.
//!
//! [`SessionClient`] owns the single active credential. It stamps every
//! outbound request with it, rewrites JSON keys in both directions, and turns a
//! 401 on an authenticated request into an expiration event: the credential is
//! dropped, the registered callback runs once, and the caller still gets
//! [`SyncError::SessionExpired`].

use std::sync::{Mutex, MutexGuard};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::case::{camel_keys, snake_keys};
use crate::error::{SyncError, TransportError};
use crate::http::{
    Method, RawBody, Transport, TransportRequest, TransportResponse, JSON_CONTENT_TYPE,
};
use crate::tree::Node;
use crate::types::{ErrorResponse, TokenResponse};

pub const TOKEN_PATH: &str = "/user/token";

/// Invoked once when the server rejects the active credential.
pub type ExpirationCallback = Box<dyn FnOnce() + Send + 'static>;

/// An outbound request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Structured data; keys are snake_cased on the way out.
    Json(Node),
    /// Pre-serialized payload (multipart, images). Forwarded untouched.
    Binary(RawBody),
}

impl Body {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, SyncError> {
        Ok(Body::Json(Node::from_serialize(value)?))
    }

    fn encode(self) -> Result<RawBody, SyncError> {
        match self {
            Body::Json(node) => Ok(RawBody {
                content_type: JSON_CONTENT_TYPE.to_string(),
                data: snake_keys(node).to_json_bytes()?,
            }),
            Body::Binary(raw) => Ok(raw),
        }
    }
}

/// A successful response with its body already decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// JSON bodies arrive with camelCase keys. Non-JSON bodies are kept as
    /// [`Node::Bytes`]. Empty bodies are `None`.
    pub body: Option<Node>,
}

impl ApiResponse {
    fn decode(response: TransportResponse) -> Result<Self, SyncError> {
        let body = if response.body.is_empty() {
            None
        } else if response.is_json() {
            Some(camel_keys(Node::from_json_bytes(&response.body)?))
        } else {
            Some(Node::Bytes(response.body))
        };
        Ok(Self {
            status: response.status,
            body,
        })
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SyncError> {
        match &self.body {
            Some(node) => Ok(node.deserialize()?),
            None => Err(SyncError::Decode("empty response body".to_string())),
        }
    }
}

enum SessionState {
    Anonymous,
    Authenticated {
        token: String,
        on_expired: ExpirationCallback,
    },
}

pub struct SessionClient<T> {
    transport: T,
    state: Mutex<SessionState>,
}

fn error_message(response: &TransportResponse) -> String {
    if response.is_json() {
        if let Ok(body) = serde_json::from_slice::<ErrorResponse>(&response.body) {
            return body.error;
        }
    }
    match String::from_utf8_lossy(&response.body).trim() {
        "" => format!("HTTP {}", response.status),
        text => text.to_string(),
    }
}

fn status_error(response: &TransportResponse) -> TransportError {
    TransportError::Status {
        status: response.status,
        message: error_message(response),
    }
}

impl<T: Transport> SessionClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(SessionState::Anonymous),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        // Every transition is a single assignment, so a poisoned lock still
        // holds a coherent state.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.lock_state(), SessionState::Authenticated { .. })
    }

    /// The bearer token currently in use, if any.
    pub fn token(&self) -> Option<String> {
        match &*self.lock_state() {
            SessionState::Authenticated { token, .. } => Some(token.clone()),
            SessionState::Anonymous => None,
        }
    }

    fn authenticate(&self, token: String, on_expired: ExpirationCallback) {
        *self.lock_state() = SessionState::Authenticated { token, on_expired };
    }

    /// Exchange a username and password for a bearer token.
    ///
    /// On success the token authorizes every later request and `on_expired`
    /// is armed. On failure the client keeps whatever state it had.
    pub async fn sign_in(
        &self,
        username: &str,
        password: &str,
        on_expired: impl FnOnce() + Send + 'static,
    ) -> Result<TokenResponse, SyncError> {
        let basic = STANDARD.encode(format!("{}:{}", username, password));
        let request = TransportRequest {
            method: Method::Post,
            path: TOKEN_PATH.to_string(),
            body: Some(Body::Json(Node::Object(Default::default())).encode()?),
            authorization: Some(format!("Basic {}", basic)),
        };

        let response = self.transport.send(request).await?;
        if matches!(response.status, 401 | 403) {
            tracing::info!(username, status = response.status, "sign-in rejected");
            return Err(SyncError::Authentication(error_message(&response)));
        }
        if !response.is_success() {
            return Err(status_error(&response).into());
        }

        let token: TokenResponse = ApiResponse::decode(response)?.json()?;
        self.authenticate(token.token.clone(), Box::new(on_expired));
        tracing::info!(username, "signed in");
        Ok(token)
    }

    /// Restore a previously issued token without a network round trip.
    pub fn resume(&self, token: String, on_expired: impl FnOnce() + Send + 'static) {
        self.authenticate(token, Box::new(on_expired));
        tracing::debug!("session resumed");
    }

    /// Drop the credential. The expiration callback is discarded, not run.
    pub fn sign_out(&self) {
        *self.lock_state() = SessionState::Anonymous;
        tracing::info!("signed out");
    }

    /// Handle a 401. If `used` is still the active token, the session ends
    /// here and its callback fires.
    fn expire(&self, used: Option<String>, response: &TransportResponse) -> SyncError {
        let Some(used) = used else {
            return SyncError::Unauthorized(error_message(response));
        };

        let previous = {
            let mut state = self.lock_state();
            let current = matches!(&*state, SessionState::Authenticated { token, .. } if *token == used);
            if current {
                Some(std::mem::replace(&mut *state, SessionState::Anonymous))
            } else {
                None
            }
        };

        if let Some(SessionState::Authenticated { on_expired, .. }) = previous {
            tracing::warn!("session expired");
            on_expired();
        }
        SyncError::SessionExpired
    }

    /// Send a request through the session.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Body>,
    ) -> Result<ApiResponse, SyncError> {
        let token = self.token();
        let request = TransportRequest {
            method,
            path: path.to_string(),
            body: body.map(Body::encode).transpose()?,
            authorization: token.as_ref().map(|t| format!("Bearer {}", t)),
        };

        let response = self.transport.send(request).await?;
        if response.status == 401 {
            return Err(self.expire(token, &response));
        }
        if !response.is_success() {
            tracing::debug!(%method, path, status = response.status, "request failed");
            return Err(status_error(&response).into());
        }
        ApiResponse::decode(response)
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, SyncError> {
        self.request(Method::Get, path, None).await?.json()
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, SyncError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::Post, path, Some(Body::json(body)?))
            .await?
            .json()
    }

    pub async fn delete(&self, path: &str) -> Result<(), SyncError> {
        self.request(Method::Delete, path, None).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockResponse, MockTransport};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let hook = count.clone();
        (count, move || {
            hook.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn client(mock: MockTransport) -> SessionClient<Arc<MockTransport>> {
        SessionClient::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn test_sign_in_sends_basic_auth_and_stores_token() {
        let client = client(MockTransport::new().with_json(
            Method::Post,
            TOKEN_PATH,
            200,
            json!({"token": "abc"}),
        ));
        let (_, hook) = counter();

        let token = client.sign_in("ann", "pw", hook).await.unwrap();
        assert_eq!(token.token, "abc");
        assert!(client.is_authenticated());

        let sent = client.transport().last_request().unwrap();
        assert_eq!(sent.authorization.as_deref(), Some("Basic YW5uOnB3"));
    }

    #[tokio::test]
    async fn test_bad_credentials_stay_anonymous() {
        let client = client(MockTransport::new().with_json(
            Method::Post,
            TOKEN_PATH,
            401,
            json!({"error": "invalid credentials"}),
        ));
        let (count, hook) = counter();

        let err = client.sign_in("ann", "nope", hook).await.unwrap_err();
        assert!(matches!(err, SyncError::Authentication(ref m) if m == "invalid credentials"));
        assert!(!client.is_authenticated());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expiry_fires_callback_once_and_goes_anonymous() {
        let client = client(
            MockTransport::new()
                .with_json(Method::Post, TOKEN_PATH, 200, json!({"token": "abc"}))
                .with_json(Method::Get, "/recipe", 401, json!({"error": "expired"})),
        );
        let (count, hook) = counter();
        client.sign_in("ann", "pw", hook).await.unwrap();

        let err = client.get::<serde_json::Value>("/recipe").await.unwrap_err();
        assert!(matches!(err, SyncError::SessionExpired));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!client.is_authenticated());

        let err = client.get::<serde_json::Value>("/recipe").await.unwrap_err();
        assert!(matches!(err, SyncError::Unauthorized(_)));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let requests = client.transport().requests();
        assert_eq!(requests[1].authorization.as_deref(), Some("Bearer abc"));
        assert_eq!(requests[2].authorization, None);
    }

    #[tokio::test]
    async fn test_sign_out_does_not_fire_callback() {
        let client = client(MockTransport::new());
        let (count, hook) = counter();
        client.resume("abc".to_string(), hook);
        assert_eq!(client.token().as_deref(), Some("abc"));

        client.sign_out();
        assert!(!client.is_authenticated());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_401_does_not_end_newer_session() {
        let client = client(
            MockTransport::new().with_json(Method::Get, "/recipe", 401, json!({"error": "x"})),
        );
        let (old_count, old_hook) = counter();
        client.resume("old".to_string(), old_hook);
        let response = TransportResponse {
            status: 401,
            headers: Default::default(),
            body: vec![],
        };

        let (new_count, new_hook) = counter();
        client.resume("new".to_string(), new_hook);
        let err = client.expire(Some("old".to_string()), &response);

        assert!(matches!(err, SyncError::SessionExpired));
        assert_eq!(client.token().as_deref(), Some("new"));
        assert_eq!(old_count.load(Ordering::SeqCst), 0);
        assert_eq!(new_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_json_bodies_are_recased_both_ways() {
        let client = client(MockTransport::new().with_json(
            Method::Post,
            "/echo",
            200,
            json!({"yield_units": "bowls", "steps": [{"step_id": 1}]}),
        ));

        let reply: serde_json::Value = client
            .post("/echo", &json!({"yieldUnits": "bowls"}))
            .await
            .unwrap();
        assert_eq!(reply, json!({"yieldUnits": "bowls", "steps": [{"stepId": 1}]}));

        let sent = client.transport().last_request().unwrap();
        let body = sent.body.unwrap();
        assert_eq!(body.content_type, JSON_CONTENT_TYPE);
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&body.data).unwrap(),
            json!({"yield_units": "bowls"})
        );
    }

    #[tokio::test]
    async fn test_binary_bodies_bypass_the_codec() {
        let payload = b"--x\r\nContent-Disposition: form-data; name=\"someField\"\r\n".to_vec();
        let client = client(MockTransport::new().with_response(
            Method::Post,
            "/upload",
            MockResponse::Bytes(200, "image/png".to_string(), vec![1, 2, 3]),
        ));

        let response = client
            .request(
                Method::Post,
                "/upload",
                Some(Body::Binary(RawBody {
                    content_type: "multipart/form-data; boundary=x".to_string(),
                    data: payload.clone(),
                })),
            )
            .await
            .unwrap();

        assert_eq!(response.body, Some(Node::Bytes(vec![1, 2, 3])));
        let sent = client.transport().last_request().unwrap().body.unwrap();
        assert_eq!(sent.data, payload);
        assert_eq!(sent.content_type, "multipart/form-data; boundary=x");
    }

    #[tokio::test]
    async fn test_server_errors_surface_unmodified() {
        let client = client(
            MockTransport::new()
                .with_json(Method::Get, "/recipe/9", 404, json!({"error": "recipe with id `9` not found"}))
                .with_response(Method::Get, "/recipe", MockResponse::Error("connection refused".into())),
        );

        let err = client.get::<serde_json::Value>("/recipe/9").await.unwrap_err();
        match err {
            SyncError::Transport(TransportError::Status { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "recipe with id `9` not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = client.get::<serde_json::Value>("/recipe").await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(TransportError::Network(_))));
    }
}
