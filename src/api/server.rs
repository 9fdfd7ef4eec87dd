use std::net::SocketAddr;
use tracing::info;

use crate::api::{routes::create_router, state::AppState};
use crate::error::{FinAgentError, Result};

/// HTTP server hosting the strategy API
pub struct ApiServer {
    state: AppState,
    port: u16,
}

impl ApiServer {
    pub fn new(state: AppState, port: u16) -> Self {
        Self { state, port }
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let app = create_router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| FinAgentError::Internal(format!("API server error: {}", e)))?;

        info!("API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
