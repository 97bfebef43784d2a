use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

use crate::models::status::EntityKind;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Request is already being processed by {holder}")]
    Busy { holder_id: i64, holder: String },
    #[error("Your claim on this request expired; restart the conversion")]
    ClaimLost,
    #[error("{0}")]
    InvalidState(String),
    #[error("Cannot move {kind} from '{from}' to '{to}'")]
    InvalidTransition { kind: EntityKind, from: String, to: String },
    #[error("{0}")]
    ArchiveForbidden(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn db(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        AppError::InvalidState(msg.into())
    }

    pub fn invalid_transition(kind: EntityKind, from: impl ToString, to: impl ToString) -> Self {
        AppError::InvalidTransition { kind, from: from.to_string(), to: to.to_string() }
    }

    pub fn archive_forbidden(msg: impl Into<String>) -> Self {
        AppError::ArchiveForbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Stable error kind surfaced to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "DatabaseError",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::NotFound(_) => "NotFound",
            AppError::ValidationError(_) => "ValidationError",
            AppError::Conflict(_) => "Conflict",
            AppError::Busy { .. } => "Busy",
            AppError::ClaimLost => "ClaimLost",
            AppError::InvalidState(_) => "InvalidState",
            AppError::InvalidTransition { .. } => "InvalidTransition",
            AppError::ArchiveForbidden(_) => "ArchiveForbidden",
            AppError::Internal(_) => "Internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) | AppError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict(_)
            | AppError::Busy { .. }
            | AppError::ClaimLost
            | AppError::InvalidState(_)
            | AppError::ArchiveForbidden(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();

        let body = match &self {
            AppError::DatabaseError(e) => {
                tracing::error!(error = %e, "database error");
                json!({ "error": "Database error occurred", "kind": kind })
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                json!({ "error": "Internal server error", "kind": kind })
            }
            AppError::Busy { holder_id, holder } => json!({
                "error": self.to_string(),
                "kind": kind,
                "holder_id": holder_id,
                "holder": holder,
            }),
            _ => json!({ "error": self.to_string(), "kind": kind }),
        };

        (status, Json(body)).into_response()
    }
}

/// Maps Postgres constraint violations onto client-facing errors.
pub fn map_constraint(err: sqlx::Error, unique_msg: &str, fk_msg: &str) -> AppError {
    if let Some(db) = err.as_database_error() {
        if db.code().as_deref() == Some("23505") { return AppError::conflict(unique_msg); }
        if db.code().as_deref() == Some("23503") { return AppError::validation(fk_msg); }
    }
    AppError::db(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_and_transition_errors_map_to_expected_codes() {
        let busy = AppError::Busy { holder_id: 7, holder: "ana".into() };
        assert_eq!(busy.status_code(), StatusCode::CONFLICT);
        assert_eq!(busy.kind(), "Busy");
        assert_eq!(busy.to_string(), "Request is already being processed by ana");

        let bad = AppError::invalid_transition(EntityKind::Request, "delivered", "pending");
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(bad.to_string(), "Cannot move request from 'delivered' to 'pending'");

        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::ClaimLost.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::archive_forbidden("x").kind(), "ArchiveForbidden");
    }
}
