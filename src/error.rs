//! Error taxonomy for the cart subsystem.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CartError {
    /// An entity referenced by the caller does not exist (or is not theirs).
    #[error("{0} not found")]
    NotFound(String),

    /// The request is well-formed but violates a business rule.
    #[error("{0}")]
    BadRequest(String),

    /// Internal write conflict: duplicate cart insert or a compare-and-swap
    /// miss. Handled by bounded retry inside the services, never surfaced.
    #[error("write conflict")]
    Conflict,

    /// Unexpected persistence failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl CartError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl From<sqlx::Error> for CartError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl IntoResponse for CartError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match &self {
            // Conflicts that escape the retry loops and raw storage errors are
            // not for the caller's eyes.
            Self::Conflict | Self::Storage(_) => {
                tracing::error!(error = %self, "internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, CartError>;
