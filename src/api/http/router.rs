// src/api/http/router.rs
// HTTP router composition for REST API endpoints

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{
    chat::chat_handler,
    handlers::{get_persona_handler, health_handler, root_handler, stats_handler},
};
use crate::state::AppState;

/// Main HTTP router. Browser front-ends call it cross-origin, so CORS is open.
pub fn http_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/personas/{persona_id}", get(get_persona_handler))
        .route("/chat", post(chat_handler))
        .route("/stats", get(stats_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
