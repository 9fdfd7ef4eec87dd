use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{handlers, state::AppState, websocket::strategy_stream_handler};

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_handler))
        // Strategy endpoints
        .route("/api/strategies", get(handlers::list_strategies))
        .route("/api/strategies/:kind/run", post(handlers::run_strategy))
        .route("/api/strategies/:kind/status", get(handlers::strategy_status))
        .route("/api/strategies/:kind/cancel", post(handlers::cancel_strategy))
        // Lending passthrough
        .route("/api/lending", post(handlers::execute_action))
        .route("/api/lending/pools", get(handlers::list_pools))
        .route("/api/lending/lend", post(handlers::lend_to_pool))
        // Agent passthrough
        .route("/api/reputation", post(handlers::lookup_reputation))
        .route("/api/credentials", post(handlers::issue_credential))
        // Live run updates
        .route("/ws/strategies/:kind", get(strategy_stream_handler))
        .with_state(state)
        .layer(cors)
}
