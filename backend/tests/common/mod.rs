//! Shared helpers: an in-process agent and identity providers for tests.

#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    extract::{Query, State},
    http::{HeaderMap, Request, StatusCode, Uri},
    routing::{get, post},
};
use reqwest::header::HeaderMap as ReqwestHeaderMap;
use route_proxy::{
    AppState,
    agent::AgentClient,
    auth::{AuthError, IdentityProvider, bearer_headers},
    create_router,
};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_TOKEN: &str = "test-identity-token";

/// Identity provider that counts how often it is asked for headers.
#[derive(Default)]
pub struct CountingIdentity {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl CountingIdentity {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for CountingIdentity {
    async fn auth_headers(&self, _audience: &str) -> Result<ReqwestHeaderMap, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AuthError::Rejected {
                status: 404,
                message: "no service account".into(),
            });
        }
        bearer_headers(TEST_TOKEN)
    }
}

#[derive(Debug, Clone)]
pub struct ReceivedCall {
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    reply: String,
    received: Arc<Mutex<Vec<ReceivedCall>>>,
}

/// Agent stand-in bound to an ephemeral local port. Every call to
/// `/route/generate` or `/route/feedback` answers with the same status and body.
pub struct MockAgent {
    pub base_url: String,
    received: Arc<Mutex<Vec<ReceivedCall>>>,
}

impl MockAgent {
    pub async fn start(status: StatusCode, reply: impl Into<String>) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status,
            reply: reply.into(),
            received: received.clone(),
        };
        let app = Router::new()
            .route("/route/generate", post(record_call))
            .route("/route/feedback", post(record_call))
            .with_state(state);

        let base_url = serve(app).await;
        Self { base_url, received }
    }

    pub fn calls(&self) -> Vec<ReceivedCall> {
        self.received.lock().unwrap().clone()
    }
}

async fn record_call(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(&'static str, &'static str); 1], String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.received.lock().unwrap().push(ReceivedCall {
        path: uri.path().to_string(),
        authorization: header("authorization"),
        content_type: header("content-type"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });
    (
        state.status,
        [("content-type", "application/json")],
        state.reply.clone(),
    )
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct IdentityQuery {
    pub audience: String,
    pub format: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MetadataCall {
    pub flavor: Option<String>,
    pub query: IdentityQuery,
}

/// Metadata server stand-in that mints `token-for:<audience>`.
pub struct MockMetadataServer {
    pub host: String,
    received: Arc<Mutex<Vec<MetadataCall>>>,
}

impl MockMetadataServer {
    pub async fn start() -> Self {
        let received: Arc<Mutex<Vec<MetadataCall>>> = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/computeMetadata/v1/instance/service-accounts/default/identity",
                get(mint_token),
            )
            .with_state(received.clone());

        let base_url = serve(app).await;
        let host = base_url.trim_start_matches("http://").to_string();
        Self { host, received }
    }

    pub fn calls(&self) -> Vec<MetadataCall> {
        self.received.lock().unwrap().clone()
    }
}

async fn mint_token(
    State(received): State<Arc<Mutex<Vec<MetadataCall>>>>,
    headers: HeaderMap,
    Query(query): Query<IdentityQuery>,
) -> (StatusCode, String) {
    let flavor = headers
        .get("metadata-flavor")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let token = format!("token-for:{}", query.audience);
    let authorized = flavor.as_deref() == Some("Google");
    received
        .lock()
        .unwrap()
        .push(MetadataCall { flavor, query });

    if authorized {
        (StatusCode::OK, token)
    } else {
        (StatusCode::FORBIDDEN, "missing Metadata-Flavor".into())
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base URL of a port nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn proxy_app(base_url: Option<String>, identity: Arc<dyn IdentityProvider>) -> Router {
    let agent = AgentClient::new(reqwest::Client::new(), identity, base_url);
    create_router(AppState { agent })
}

pub async fn post_json(app: Router, uri: &str, payload: &Value) -> (StatusCode, Value) {
    post_raw(app, uri, payload.to_string()).await
}

/// Posts `body` verbatim with a JSON content type.
pub async fn post_raw(app: Router, uri: &str, body: impl Into<String>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
