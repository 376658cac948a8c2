use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extractors::SessionUser;
use crate::models::{iso8601, PublicUser};
use crate::services::auth::{self, AuthError};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "expiresAt", serialize_with = "iso8601::serialize")]
    pub expires_at: DateTime<Utc>,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct SessionPayload {
    pub user: PublicUser,
    #[serde(rename = "expiresAt", serialize_with = "iso8601::serialize")]
    pub expires_at: DateTime<Utc>,
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Ok(Json(LoginRequest {
        email: Some(email),
        password: Some(password),
    })) = payload
    else {
        return Err(AuthError::MissingCredentials.into());
    };

    let issued = auth::login(state.accounts.as_ref(), &email, &password, state.session_ttl).await?;

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user: issued.user,
    }))
}

/// `POST /auth/logout`
pub async fn logout(
    staff: SessionUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    auth::logout(state.accounts.as_ref(), &staff.session).await?;
    Ok(empty_success("Signed out").into_response())
}

/// `GET /auth/session`
pub async fn current_session(staff: SessionUser) -> Response {
    let payload = SessionPayload {
        user: staff.user,
        expires_at: staff.session.expires_at,
    };

    success(payload, "Session active").into_response()
}
