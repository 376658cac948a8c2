use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{
    current_session, health_check, history, list_tickets, login, logout, scan, stats,
};
use crate::state::AppState;

pub fn create_routes(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/scan", post(scan))
        .route("/history", get(history))
        .route("/stats", get(stats))
        .route("/tickets", get(list_tickets))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(current_session))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer(allowed_origins))
}
