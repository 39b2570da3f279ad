use std::{net::SocketAddr, sync::Arc};

use clap::Parser;

use crate::auth::{DEFAULT_METADATA_HOST, IdentityProvider, MetadataServerIdentity, StaticIdentity};

/// Name the agent address went by in the original web deployment.
const LEGACY_AGENT_BASE_URL_ENV: &str = "NUXT_AGENT_BASE_URL";

#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "Authenticated proxy between the walking-route client and the route agent"
)]
pub struct ProxyConfig {
    /// Agent origin, e.g. https://agent-xyz.a.run.app (no path). Also used as
    /// the identity token audience.
    #[arg(long, env = "AGENT_BASE_URL")]
    pub agent_base_url: Option<String>,

    /// Address the proxy listens on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Pre-issued identity token. When unset, tokens come from the metadata server.
    #[arg(long, env = "AGENT_ID_TOKEN", hide_env_values = true)]
    pub id_token: Option<String>,

    /// Metadata server host used to mint identity tokens
    #[arg(long, env = "GCE_METADATA_HOST", default_value = DEFAULT_METADATA_HOST)]
    pub metadata_host: String,
}

impl ProxyConfig {
    /// Parses flags and environment, falling back to the legacy variable name
    /// for the agent address.
    pub fn load() -> Self {
        Self::parse().with_legacy_env(std::env::var(LEGACY_AGENT_BASE_URL_ENV).ok())
    }

    fn with_legacy_env(mut self, legacy_base_url: Option<String>) -> Self {
        if self.agent_base_url.is_none() {
            self.agent_base_url = legacy_base_url;
        }
        self
    }

    pub fn identity_provider(&self, http: reqwest::Client) -> Arc<dyn IdentityProvider> {
        match self.id_token.as_deref().filter(|token| !token.trim().is_empty()) {
            Some(token) => {
                tracing::info!("using static identity token from configuration");
                Arc::new(StaticIdentity::new(token))
            }
            None => {
                tracing::info!(host = %self.metadata_host, "using metadata server identity tokens");
                Arc::new(MetadataServerIdentity::new(http, self.metadata_host.clone()))
            }
        }
    }
}
