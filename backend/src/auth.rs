//! Identity tokens for calling the route agent.
//!
//! The agent sits behind IAM: every call carries an OIDC identity token whose
//! audience is the agent's base URL. Tokens are fetched per call; this module
//! keeps no cache.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use thiserror::Error;

pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const IDENTITY_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/identity";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("metadata server unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("metadata server returned status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("identity token is empty")]
    EmptyToken,
    #[error("identity token is not a valid header value")]
    MalformedToken,
}

/// Source of authorization headers for a given audience.
///
/// Implementations must be callable from many in-flight requests at once and
/// hand each caller its own header set.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn auth_headers(&self, audience: &str) -> Result<HeaderMap, AuthError>;
}

/// Builds `Authorization: Bearer <token>`.
pub fn bearer_headers(token: &str) -> Result<HeaderMap, AuthError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    let mut value =
        HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| AuthError::MalformedToken)?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// Fetches identity tokens from the GCE / Cloud Run metadata server.
#[derive(Debug, Clone)]
pub struct MetadataServerIdentity {
    http: reqwest::Client,
    host: String,
}

impl MetadataServerIdentity {
    pub fn new(http: reqwest::Client, host: impl Into<String>) -> Self {
        Self {
            http,
            host: host.into(),
        }
    }

    fn identity_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}{IDENTITY_PATH}")
        } else {
            format!("http://{host}{IDENTITY_PATH}")
        }
    }
}

#[async_trait]
impl IdentityProvider for MetadataServerIdentity {
    async fn auth_headers(&self, audience: &str) -> Result<HeaderMap, AuthError> {
        tracing::debug!(audience, "requesting identity token from metadata server");

        let response = self
            .http
            .get(self.identity_url())
            .header("Metadata-Flavor", "Google")
            .query(&[("audience", audience), ("format", "full")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let token = response.text().await?;
        bearer_headers(&token)
    }
}

/// A pre-issued token, e.g. from `gcloud auth print-identity-token`.
#[derive(Clone)]
pub struct StaticIdentity {
    token: String,
}

impl StaticIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticIdentity").finish_non_exhaustive()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn auth_headers(&self, _audience: &str) -> Result<HeaderMap, AuthError> {
        bearer_headers(&self.token)
    }
}
