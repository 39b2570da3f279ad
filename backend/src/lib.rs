pub mod agent;
pub mod auth;
pub mod config;
pub mod error;
pub mod polyline;
pub mod proxy;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use shared::{ApiError, Envelope, FeedbackAck, FeedbackRequest, RouteRequest, RouteResponse};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::agent::AgentClient;
use crate::error::ProxyError;

#[derive(Clone)]
pub struct AppState {
    pub agent: AgentClient,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/fetch-ai", post(fetch_route_handler))
        .route("/api/route-feedback", post(feedback_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fetch_route_handler(
    State(state): State<AppState>,
    payload: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Json<Envelope<RouteResponse>>, (StatusCode, Json<ApiError>)> {
    let req = request_body(&state.agent, payload).map_err(api_error)?;
    tracing::info!(
        request_id = %req.request_id,
        theme = ?req.theme,
        distance_km = req.distance_km,
        "route request"
    );

    proxy::generate_route(&state.agent, &req)
        .await
        .map(|route| Json(Envelope::ok(route)))
        .map_err(api_error)
}

async fn feedback_handler(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<Envelope<FeedbackAck>>, (StatusCode, Json<ApiError>)> {
    let req = request_body(&state.agent, payload).map_err(api_error)?;
    tracing::info!(request_id = %req.request_id, route_id = %req.route_id, "feedback request");

    proxy::submit_feedback(&state.agent, &req)
        .await
        .map(|ack| Json(Envelope::ok(ack)))
        .map_err(api_error)
}

/// A missing agent address outranks a bad body; both answer with `ApiError`.
fn request_body<T>(
    agent: &AgentClient,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, ProxyError> {
    agent.base_url()?;
    let Json(body) = payload.map_err(|rejection| ProxyError::InvalidRequest(rejection.body_text()))?;
    Ok(body)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn api_error(err: ProxyError) -> (StatusCode, Json<ApiError>) {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!(kind = err.kind(), %status, "{err}");
    } else {
        tracing::warn!(kind = err.kind(), %status, "{err}");
    }

    (
        status,
        Json(ApiError {
            status_code: status.as_u16(),
            status_message: err.to_string(),
            kind: err.kind().to_string(),
        }),
    )
}
