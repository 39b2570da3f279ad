use route_proxy::{AppState, agent::AgentClient, config::ProxyConfig, create_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "route_proxy=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ProxyConfig::load();

    let http = reqwest::Client::new();
    let identity = config.identity_provider(http.clone());
    let agent = AgentClient::new(http, identity, config.agent_base_url.clone());
    if agent.base_url().is_err() {
        tracing::warn!(
            "agent base URL is not set (AGENT_BASE_URL / NUXT_AGENT_BASE_URL); proxy endpoints will answer 500"
        );
    }
    let app = create_router(AppState { agent });

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    tracing::info!("starting proxy on http://{}", config.listen);
    tracing::info!("  POST /api/fetch-ai - generate a route through the agent");
    tracing::info!("  POST /api/route-feedback - forward a route rating");
    tracing::info!("  GET /health - liveness");

    axum::serve(listener, app).await?;
    Ok(())
}
