use axum::http::StatusCode;
use thiserror::Error;

use crate::auth::AuthError;
use crate::polyline::PolylineError;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("AGENT_BASE_URL is not configured")]
    Configuration,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("could not obtain agent credentials: {0}")]
    AuthUnavailable(#[from] AuthError),
    #[error("agent rejected credentials with status {status}")]
    AuthorizationRejected { status: u16 },
    #[error("agent call failed: {message}")]
    Upstream { status: Option<u16>, message: String },
    #[error("agent returned a malformed polyline: {0}")]
    Decode(#[from] PolylineError),
    #[error("agent returned a route with no points")]
    EmptyRoute,
}

impl ProxyError {
    /// Stable machine-readable tag sent alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Configuration => "configuration_error",
            ProxyError::InvalidRequest(_) => "invalid_request",
            ProxyError::AuthUnavailable(_) => "auth_unavailable",
            ProxyError::AuthorizationRejected { .. } => "authorization_rejected",
            ProxyError::Upstream { .. } => "upstream_error",
            ProxyError::Decode(_) | ProxyError::EmptyRoute => "decode_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::AuthUnavailable(_) | ProxyError::Decode(_) | ProxyError::EmptyRoute => {
                StatusCode::BAD_GATEWAY
            }
            ProxyError::AuthorizationRejected { status } => upstream_status(Some(*status)),
            ProxyError::Upstream { status, .. } => upstream_status(*status),
        }
    }
}

/// Upstream statuses are relayed as-is; anything unusable becomes a 500.
fn upstream_status(status: Option<u16>) -> StatusCode {
    status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .filter(|code| code.is_client_error() || code.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
