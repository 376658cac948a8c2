use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::ScannedTicket;
use crate::services::scanner;
use crate::state::AppState;
use crate::utils::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub success: bool,
    pub ticket: ScannedTicket,
    pub message: String,
    #[serde(rename = "remainingScans")]
    pub remaining_scans: i32,
}

/// `POST /scan`. Open to kiosks, no session required.
pub async fn scan(
    State(state): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanResponse>, AppError> {
    let code = match &payload {
        Ok(Json(request)) => request.code.as_deref(),
        Err(rejection) => {
            debug!(%rejection, "Unreadable scan payload");
            None
        }
    };

    let receipt = scanner::scan_ticket(state.tickets.as_ref(), state.scan_policy, code).await?;

    Ok(Json(ScanResponse {
        success: true,
        ticket: ScannedTicket::from(&receipt.ticket),
        message: receipt.message,
        remaining_scans: receipt.remaining,
    }))
}
