//! API Server Module
//!
//! Wires the injected `OracleClient`/`ToolClient` ports and a
//! `RunConfig` into a running axum server. Grounded in the teacher's
//! `api/src/server/mod.rs::ApiServer` — a config plus `Arc`-shared
//! state struct, a `Router` built in `start()`, bound via
//! `SocketAddr::from(([0, 0, 0, 0], port))` and
//! `tokio::net::TcpListener::bind` + `axum::serve`.

use std::sync::Arc;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use agent_core::{OracleClient, RunConfig, ToolClient};

use crate::handlers::{health_check, run_agent, stream_agent};
use crate::models::ApiConfig;

/// Shared state every handler reads from. The two client ports are
/// trait objects so the binary can wire either the HTTP-backed
/// implementations or fakes without this crate knowing which.
pub struct AppState {
    pub oracle: Arc<dyn OracleClient>,
    pub tool: Arc<dyn ToolClient>,
    pub config: RunConfig,
}

pub struct ApiServer {
    config: ApiConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(
        config: ApiConfig,
        oracle: Arc<dyn OracleClient>,
        tool: Arc<dyn ToolClient>,
        run_config: RunConfig,
    ) -> Self {
        let state = Arc::new(AppState {
            oracle,
            tool,
            config: run_config,
        });

        Self { config, state }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/agent/run", post(run_agent))
            .route("/agent/stream", post(stream_agent))
            .route("/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    pub async fn start(&self) -> Result<()> {
        info!("Starting agent API server on {}:{}", self.config.host, self.config.port);

        let app = self.router();
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.port));
        info!("agent API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .await
            .map_err(|e| anyhow::anyhow!("failed to start agent API server: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_tools::{FakeOracleClient, FakeToolClient};

    #[test]
    fn server_builds_router_without_panicking() {
        let oracle: Arc<dyn OracleClient> = Arc::new(FakeOracleClient::new(vec!["reply"]));
        let tool: Arc<dyn ToolClient> = Arc::new(FakeToolClient::empty());
        let server = ApiServer::new(ApiConfig::default(), oracle, tool, RunConfig::default());
        let _ = server.router();
    }
}
