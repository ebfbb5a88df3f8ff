//! Error types for the Biblioteca server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Book unavailable")]
    BookUnavailable,

    #[error("Already returned")]
    AlreadyReturned,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body.
///
/// The `error` field carries the client-facing reason; `details` carries
/// field-level validation messages when present.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        // Unique violations slipping past explicit pre-checks (e.g. two
        // concurrent writers inserting the same ISBN) are still client
        // errors, not server faults.
        if let sqlx::Error::Database(ref db) = e {
            if db.is_unique_violation() {
                return AppError::Validation(format!(
                    "{}: value already exists",
                    db.constraint().unwrap_or("unique constraint")
                ));
            }
        }
        AppError::Database(e)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "invalid value".to_string());
                    format!("{}: {}", field, msg)
                })
            })
            .collect();
        AppError::Validation(details.join("; "))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::Authorization(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::BookUnavailable => {
                (StatusCode::BAD_REQUEST, "Book unavailable".to_string(), None)
            }
            AppError::AlreadyReturned => {
                (StatusCode::BAD_REQUEST, "Already returned".to_string(), None)
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "Validation error".to_string(),
                Some(serde_json::Value::String(msg)),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse { error, details });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lend_rejection_maps_to_client_error() {
        let resp = AppError::BookUnavailable.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn double_return_maps_to_client_error() {
        let resp = AppError::AlreadyReturned.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_record_maps_to_not_found() {
        let resp = AppError::NotFound("Book with id 42 not found".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn non_constraint_database_errors_stay_internal() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_errors_collect_field_messages() {
        use validator::Validate;

        #[derive(Validate)]
        struct Probe {
            #[validate(length(min = 10, message = "ISBN must be at least 10 characters"))]
            isbn: String,
        }

        let probe = Probe {
            isbn: "123".to_string(),
        };
        let err: AppError = probe.validate().unwrap_err().into();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("isbn")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
