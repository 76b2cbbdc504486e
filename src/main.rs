use std::sync::Arc;

use affinity_recs::{
    api::{create_router, AppState},
    config::Config,
    db::{create_redis_client, InMemoryResponseCache, RedisResponseCache, ResponseCache},
    services::{providers::anthropic::AnthropicBackend, ModelBackend},
};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("affinity_recs=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    // Live invocation is impossible without a credential
    let api_key = config.api_key()?;

    let backend: Arc<dyn ModelBackend> = Arc::new(AnthropicBackend::new(
        api_key,
        config.model_api_url.clone(),
    ));

    let cache: Arc<dyn ResponseCache> = match &config.redis_url {
        Some(url) => Arc::new(RedisResponseCache::new(create_redis_client(url)?)),
        None => Arc::new(InMemoryResponseCache::new()),
    };

    tracing::info!(
        backend = backend.name(),
        model = %config.model_id,
        timeout_secs = config.model_timeout_secs,
        cache = if config.redis_url.is_some() { "redis" } else { "memory" },
        "Recommendation pipeline configured"
    );

    let state = AppState::new(
        backend,
        cache,
        config.model_id.clone(),
        config.model_timeout(),
        config.response_cache_ttl(),
    );

    let app = create_router(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
