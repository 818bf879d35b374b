use tokio::net::TcpListener;

use reef_engine::ServiceHandle;
use reef_proto::CodecOptions;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// HTTP front for a reef peer.
pub struct ReefServer {
    config: ServerConfig,
    state: AppState,
}

impl ReefServer {
    pub fn new(config: ServerConfig, handle: ServiceHandle, codec: CodecOptions) -> Self {
        Self {
            config,
            state: AppState { handle, codec },
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = build_router(self.state);
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("reef server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
