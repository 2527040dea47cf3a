use anyhow::{Context, Result};
use georelay::api::{create_router, AppState};
use georelay::config::Config;
use georelay::dispatch::Dispatcher;
use georelay::metrics::DispatchMetrics;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "georelay=info".into()),
        )
        .init();

    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        push_configured = config.push_url.is_some(),
        "georelay starting"
    );

    let metrics = Arc::new(DispatchMetrics::new());
    let dispatcher = Arc::new(Dispatcher::new(config.clone(), Arc::clone(&metrics)));
    let app = create_router(AppState {
        dispatcher,
        metrics,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    axum::serve(listener, app)
        .await
        .context("Server terminated")?;

    Ok(())
}
