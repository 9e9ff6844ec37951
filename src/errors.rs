use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error("validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Single-field validation error, for cases outside the intake pipeline.
    pub fn invalid(field: &str, message: &str) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), message.to_string());
        AppError::Validation(errors)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        // The bookings_no_overlap triggers abort with this message; that is a
        // storage-enforced conflict, not an internal failure.
        if let rusqlite::Error::SqliteFailure(_, Some(msg)) = &err {
            if msg.contains("booking overlap") {
                return AppError::Conflict("Time conflict with an existing booking".to_string());
            }
        }
        AppError::Database(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => {
                let body = serde_json::json!({ "errors": errors });
                (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
            }
            AppError::Conflict(msg) => {
                let body = serde_json::json!({ "error": msg });
                (StatusCode::CONFLICT, axum::Json(body)).into_response()
            }
            AppError::NotFound(msg) => {
                let body = serde_json::json!({ "error": msg });
                (StatusCode::NOT_FOUND, axum::Json(body)).into_response()
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "storage failure");
                let body = serde_json::json!({ "error": "internal error" });
                (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
            }
        }
    }
}
