use axum::routing::{get, post};
use axum::Router;

use crate::handler::{command_handler, health_handler, AppState};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/command", post(command_handler))
        .route("/api/health", get(health_handler))
        .with_state(state)
}
