use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::extractors::SessionUser;
use crate::models::TicketListing;
use crate::state::AppState;
use crate::utils::error::AppError;

#[derive(Debug, Serialize)]
pub struct TicketsResponse {
    pub success: bool,
    pub tickets: Vec<TicketListing>,
}

/// `GET /tickets`: every ticket, most used first.
pub async fn list_tickets(
    _staff: SessionUser,
    State(state): State<AppState>,
) -> Result<Json<TicketsResponse>, AppError> {
    let tickets = state.tickets.list_tickets().await?;

    Ok(Json(TicketsResponse {
        success: true,
        tickets: tickets.into_iter().map(TicketListing::from).collect(),
    }))
}
