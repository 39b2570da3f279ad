//! HTTP client for the route agent.
//!
//! One call in, one request out: no retries, no caching. Outcomes come back as
//! an [`AgentReply`] so the status mapping stays in one place.

use std::sync::Arc;

use reqwest::{Client, header::CONTENT_TYPE};
use serde::{Serialize, de::DeserializeOwned};

use crate::auth::IdentityProvider;
use crate::error::ProxyError;

pub const GENERATE_PATH: &str = "/route/generate";
pub const FEEDBACK_PATH: &str = "/route/feedback";

/// Result of a single agent call.
#[derive(Debug)]
pub enum AgentReply<T> {
    Success(T),
    Failure { status: Option<u16>, message: String },
}

impl<T> AgentReply<T> {
    /// Maps the reply onto the proxy error taxonomy. 401 and 403 usually mean
    /// the token audience or the invoker role is wrong, so they get their own
    /// variant and an error log.
    pub fn into_result(self, audience: &str) -> Result<T, ProxyError> {
        match self {
            AgentReply::Success(body) => Ok(body),
            AgentReply::Failure {
                status: Some(status @ (401 | 403)),
                message,
            } => {
                tracing::error!(
                    audience,
                    status,
                    %message,
                    "agent rejected identity token (check audience and invoker permissions)"
                );
                Err(ProxyError::AuthorizationRejected { status })
            }
            AgentReply::Failure { status, message } => {
                tracing::warn!(audience, ?status, %message, "agent call failed");
                Err(ProxyError::Upstream { status, message })
            }
        }
    }
}

#[derive(Clone)]
pub struct AgentClient {
    http: Client,
    identity: Arc<dyn IdentityProvider>,
    base_url: Option<String>,
}

impl AgentClient {
    /// `base_url` is the agent origin without a path; blank counts as unset.
    pub fn new(
        http: Client,
        identity: Arc<dyn IdentityProvider>,
        base_url: Option<String>,
    ) -> Self {
        let base_url = base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        Self {
            http,
            identity,
            base_url,
        }
    }

    pub fn base_url(&self) -> Result<&str, ProxyError> {
        self.base_url.as_deref().ok_or(ProxyError::Configuration)
    }

    /// Authenticates, then POSTs `body` as JSON to `{base_url}{path}`.
    ///
    /// Credentials are obtained before the request is built, fresh for every
    /// call.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ProxyError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let base_url = self.base_url()?;
        let headers = self.identity.auth_headers(base_url).await?;
        let url = format!("{base_url}{path}");

        tracing::debug!(%url, "calling agent");
        let reply = self.send(&url, headers, body).await;
        reply.into_result(base_url)
    }

    async fn send<B, T>(
        &self,
        url: &str,
        headers: reqwest::header::HeaderMap,
        body: &B,
    ) -> AgentReply<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = match self
            .http
            .post(url)
            .headers(headers)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                return AgentReply::Failure {
                    status: err.status().map(|s| s.as_u16()),
                    message: err.to_string(),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = if text.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("agent returned an error")
                    .to_string()
            } else {
                text
            };
            return AgentReply::Failure {
                status: Some(status.as_u16()),
                message,
            };
        }

        match response.json::<T>().await {
            Ok(body) => AgentReply::Success(body),
            Err(err) => AgentReply::Failure {
                status: None,
                message: format!("invalid agent response: {err}"),
            },
        }
    }
}
