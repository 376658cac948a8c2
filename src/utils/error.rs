use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::models::TicketDetails;
use crate::services::auth::AuthError;
use crate::services::history::HistoryError;
use crate::services::scanner::ScanError;
use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Ticket limit reached")]
    LimitReached(Box<TicketDetails>),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Storage error")]
    StorageError(#[from] StoreError),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::LimitReached(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "UNAUTHORIZED",
            AppError::LimitReached(_) => "LIMIT_REACHED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::StorageError(_) => "STORAGE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Client-caused outcomes are routine and stay out of the error log.
    fn log(&self) {
        match self {
            AppError::ValidationError(msg) | AppError::AuthError(msg) | AppError::NotFound(msg) => {
                debug!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::LimitReached(details) => {
                info!(numero = %details.numero, scans_used = details.scans_used, "Scan limit reached");
            }
            AppError::StorageError(e) => {
                error!(error = ?e, "Storage error");
            }
            AppError::InternalServerError(msg) => {
                error!(message = %msg, "Internal server error");
            }
        }
    }
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::MissingCode => AppError::ValidationError(err.to_string()),
            ScanError::NotFound => AppError::NotFound(err.to_string()),
            ScanError::LimitReached(details) => AppError::LimitReached(details),
            ScanError::UpdateFailed => AppError::InternalServerError(err.to_string()),
            ScanError::Storage(e) => AppError::StorageError(e),
        }
    }
}

impl From<HistoryError> for AppError {
    fn from(err: HistoryError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => AppError::ValidationError(err.to_string()),
            AuthError::InvalidCredentials | AuthError::InvalidSession => {
                AppError::AuthError(err.to_string())
            }
            AuthError::Storage(e) => AppError::StorageError(e),
            AuthError::Hashing(_) | AuthError::Task(_) | AuthError::InvalidLifetime => {
                AppError::InternalServerError(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let (public_message, details) = match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::NotFound(msg) => (msg, None),
            AppError::LimitReached(details) => (
                ScanError::LimitReached(details.clone()).to_string(),
                serde_json::to_value(*details).ok(),
            ),
            AppError::StorageError(_) | AppError::InternalServerError(_) => {
                ("Internal server error".to_string(), None)
            }
        };

        error_response(code, public_message, details, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_storage_error_hides_detail() {
        let err = AppError::from(StoreError::Unavailable("disk on fire at 10.0.0.3".to_string()));
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["code"], "STORAGE_ERROR");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_limit_reached_carries_details() {
        let details = TicketDetails {
            ticket_type: "VIP".to_string(),
            numero: "A123".to_string(),
            scan_limit: 5,
            scans_used: 5,
            scans: vec![],
        };
        let response = AppError::from(ScanError::LimitReached(Box::new(details))).into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "This ticket has reached its maximum number of scans"
        );
        assert_eq!(body["details"]["type"], "VIP");
        assert_eq!(body["details"]["scans_used"], 5);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(ScanError::MissingCode).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(ScanError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(ScanError::UpdateFailed).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(HistoryError::InvalidRange).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AuthError::InvalidSession).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
