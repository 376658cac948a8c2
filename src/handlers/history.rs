use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;

use crate::extractors::SessionUser;
use crate::models::{CategoryTotal, HistoryEntry};
use crate::services::history::HistoryParams;
use crate::state::AppState;
use crate::utils::error::AppError;

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub scans: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub scans: Vec<CategoryTotal>,
}

/// `GET /history?start=YYYY-MM-DD&end=YYYY-MM-DD&q=numero`
pub async fn history(
    _staff: SessionUser,
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoryResponse>, AppError> {
    let Query(params) = params.map_err(|e| AppError::ValidationError(e.body_text()))?;
    let filter = params.into_filter()?;

    tracing::debug!(?filter, "History search");
    let scans = state.tickets.search_history(&filter).await?;

    Ok(Json(HistoryResponse { scans }))
}

/// `GET /stats`: admitted tickets per ticket type.
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let scans = state.tickets.category_totals().await?;
    Ok(Json(StatsResponse { scans }))
}
