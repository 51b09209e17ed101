//! WebSearch Proxy - HTTP Server Entry Point
//!
//! Starts the HTTP server that exposes the chat completions API.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use websearch_proxy::{api, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "websearch_proxy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: endpoint={} forced_search_mode={:?}",
        config.inference_base_url, config.forced_search_mode
    );

    api::serve(config).await?;

    Ok(())
}
