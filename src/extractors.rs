//! Request extractors for staff-only routes.

use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};

use crate::models::{PublicUser, Session};
use crate::services::auth;
use crate::state::AppState;
use crate::utils::error::AppError;

/// Bearer token from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::AuthError("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| {
                AppError::AuthError("Expected 'Bearer <token>' authorization".to_string())
            })?;

        if token.is_empty() {
            return Err(AppError::AuthError("Empty bearer token".to_string()));
        }

        Ok(Self(token.to_string()))
    }
}

/// A signed-in staff member. Handlers taking this reject anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: PublicUser,
    pub session: Session,
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let authed = auth::authenticate(state.accounts.as_ref(), &token).await?;

        Ok(Self {
            user: authed.user,
            session: authed.session,
        })
    }
}
