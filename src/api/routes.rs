//! HTTP route definitions and server startup.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tower_http::trace::TraceLayer;

use super::completions;
use super::types::HealthResponse;
use crate::agent::Agent;
use crate::config::{Config, ConfigError};
use crate::llm::OpenAiCompatClient;
use crate::search::{FallbackSearch, SearchBackend};
use crate::tools::ToolRegistry;

/// Shared application state.
pub struct AppState {
    /// `None` until an upstream credential is configured.
    pub agent: Option<Agent>,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/v1", completions::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let search: Arc<dyn SearchBackend> = Arc::new(FallbackSearch::from_config(&config.search)?);
    let tools = Arc::new(ToolRegistry::new());

    let agent = match OpenAiCompatClient::from_config(&config) {
        Ok(client) => {
            tracing::info!(url = %client.completions_url(), "Upstream model endpoint configured");
            Some(
                Agent::new(Arc::new(client), search, tools)
                    .with_forced_search_mode(config.forced_search_mode),
            )
        }
        Err(ConfigError::MissingApiKey) => {
            tracing::warn!(
                "{}; chat completions will fail until one is set",
                ConfigError::MissingApiKey
            );
            None
        }
        Err(e) => return Err(e.into()),
    };

    let app = router(Arc::new(AppState { agent }));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
