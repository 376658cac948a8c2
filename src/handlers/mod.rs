use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::utils::response::success;

pub mod auth;
pub mod history;
pub mod scan;
pub mod tickets;

pub use auth::{current_session, login, logout};
pub use history::{history, stats};
pub use scan::scan;
pub use tickets::list_tickets;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "checkin-api",
    };

    success(payload, "Health check successful").into_response()
}
