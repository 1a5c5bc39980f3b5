use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::Error as SqlxError;

/// Application error type for unified error handling across the app.
///
/// `NotFound`, `Conflict` and `Expired` carry a stable reason code
/// (`no_matching_company`, `company_has_admin`, ...) that callers match on and
/// that is returned to HTTP clients verbatim.
#[derive(Debug)]
pub enum AppError {
    /// Malformed input (400).
    Validation(String),

    /// Wrong credentials (400). Message is safe to show.
    Auth(String),

    /// No resolvable principal (401).
    Unauthenticated,

    /// Authorization engine said deny (403).
    Forbidden,

    /// Company, membership, principal or token absent (404).
    NotFound(String),

    /// Uniqueness or invariant conflict that retrying will not resolve (409).
    Conflict(String),

    /// Token past its expiry (410).
    Expired(String),

    /// Store errors, including transient busy/locked faults (500).
    Database(SqlxError),

    /// Generic internal errors (500).
    Internal,
}

impl AppError {
    /// Stable machine-readable code for the JSON body.
    pub fn reason(&self) -> &str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Auth(_) => "auth",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden => "forbidden",
            AppError::NotFound(reason) | AppError::Conflict(reason) | AppError::Expired(reason) => reason,
            AppError::Database(_) | AppError::Internal => "internal",
        }
    }
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(msg) | AppError::Auth(msg) => f.write_str(msg),
            AppError::Unauthenticated => f.write_str("Unauthorized"),
            AppError::Forbidden => f.write_str("Forbidden"),
            AppError::NotFound(reason) => write!(f, "Not found: {reason}"),
            AppError::Conflict(reason) => write!(f, "Conflict: {reason}"),
            AppError::Expired(reason) => write!(f, "Expired: {reason}"),
            AppError::Database(err) => write!(f, "Database error: {err}"),
            AppError::Internal => f.write_str("Internal server error"),
        }
    }
}

impl std::error::Error for AppError {}

/// True when a store error is a UNIQUE / PRIMARY KEY violation.
pub fn is_unique_violation(err: &SqlxError) -> bool {
    matches!(err, SqlxError::Database(db) if db.is_unique_violation())
}

/// True when SQLite reported lock contention (SQLITE_BUSY = 5, SQLITE_LOCKED = 6).
/// Extended codes (e.g. 517 BUSY_SNAPSHOT) carry the primary code in the low byte.
pub fn is_busy(err: &SqlxError) -> bool {
    match err {
        SqlxError::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, 5 | 6)),
        _ => false,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let reason = self.reason().to_string();
        let (status, message) = match self {
            AppError::Validation(msg) | AppError::Auth(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "Conflict".to_string()),
            AppError::Expired(_) => (StatusCode::GONE, "Expired".to_string()),
            AppError::Database(err) => {
                tracing::error!(%err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
            "reason": reason,
        }));

        (status, body).into_response()
    }
}
