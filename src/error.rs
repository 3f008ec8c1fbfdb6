use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures coming out of the user/todo stores.
///
/// "Does not exist" is `Ok(None)` at the store interface, never an error;
/// this type covers the cases where the store itself misbehaved.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already in use")]
    Duplicate(&'static str),
    #[error(transparent)]
    Backend(#[from] sqlx::Error),
}

/// Failures of the credential / token core.
///
/// `InvalidCredentials` deliberately covers both "unknown identifier" and
/// "wrong password" so callers cannot tell the two apart; the distinguishing
/// detail only goes to the log.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token signing failed: {0}")]
    Sign(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Error type returned by HTTP handlers. Maps onto a status code and a
/// JSON `{"error": ...}` body; server-side detail stays in the log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("internal server error")]
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, (*msg).to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, (*msg).to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Internal(e) => {
                error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(field) => ApiError::Conflict(format!("{field} already in use")),
            StoreError::Backend(e) => ApiError::Internal(e.into()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => ApiError::Unauthorized("invalid credentials"),
            AuthError::InvalidToken => ApiError::Unauthorized("invalid or expired token"),
            AuthError::Hash(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
            AuthError::Sign(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
            AuthError::Storage(e) => e.into(),
        }
    }
}
