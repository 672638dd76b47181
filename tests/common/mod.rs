// Shared helpers for integration tests; not every test binary uses all of them.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value;
use tokio::sync::oneshot;
use tower::ServiceExt;

use rippletide_gateway::agent::RippletideAgentService;
use rippletide_gateway::config::CredentialState;
use rippletide_gateway::routes;
use rippletide_gateway::service::relay_service::RelayService;

pub const API_KEY: &str = "test-api-key";
pub const AGENT_ID: &str = "agent-7";

/// A request captured by [`MockUpstream`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub raw: Bytes,
    pub body: Value,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: StatusCode,
    pub body: Value,
    pub delay: Duration,
}

impl MockReply {
    pub fn json(body: Value) -> Self {
        Self { status: StatusCode::OK, body, delay: Duration::ZERO }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            body: serde_json::json!({ "detail": "mock failure" }),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Responder = Arc<dyn Fn(&RecordedRequest) -> MockReply + Send + Sync>;

#[derive(Clone)]
struct MockState {
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    responder: Responder,
}

/// Stand-in for the Rippletide APIs: records every request and answers with
/// whatever the responder returns.
pub struct MockUpstream {
    pub url: String,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockUpstream {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> MockReply + Send + Sync + 'static,
    {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let state = MockState { recorded: recorded.clone(), responder: Arc::new(responder) };
        let app = Router::new().fallback(record_and_reply).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                eprintln!("Mock upstream error: {e}");
            }
        });

        Self { url: format!("http://{addr}"), recorded, shutdown_tx: Some(shutdown_tx) }
    }

    /// Always answers `body` with 200.
    pub async fn answering(body: Value) -> Self {
        Self::start(move |_| MockReply::json(body.clone())).await
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded.lock().unwrap().clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn record_and_reply(State(state): State<MockState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let raw = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let recorded = RecordedRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        headers: parts.headers,
        body: serde_json::from_slice(&raw).unwrap_or(Value::Null),
        raw,
    };

    let reply = (state.responder)(&recorded);
    state.recorded.lock().unwrap().push(recorded);

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    (reply.status, axum::Json(reply.body)).into_response()
}

pub fn configured() -> CredentialState {
    CredentialState::resolve(Some(API_KEY.into()), Some(AGENT_ID.into()))
}

pub fn gateway(upstream_url: &str, credentials: CredentialState) -> Router {
    gateway_with_timeout(upstream_url, credentials, Duration::from_secs(10))
}

pub fn gateway_with_timeout(
    upstream_url: &str,
    credentials: CredentialState,
    timeout: Duration,
) -> Router {
    let agent = RippletideAgentService::new(upstream_url, timeout).unwrap();
    routes::router(RelayService::new(agent, credentials))
}

pub fn chat_request(body: &str, conversation_id: Option<&str>) -> axum::http::Request<Body> {
    let mut builder = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("content-type", "application/json");
    if let Some(id) = conversation_id {
        builder = builder.header("X-Conversation-UUID", id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn request_id(&self) -> String {
        self.headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }
}

pub async fn send(app: Router, request: axum::http::Request<Body>) -> TestResponse {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse { status, headers, body }
}
