//! Error types for Hawkgate.
//!
//! Verification failures are classified internally but surfaced to
//! clients as a single generic denial.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Classified failures raised while authenticating a request or signing
/// a response.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Mandatory scheme absent from an otherwise-unauthenticated request.
    #[error("authorization header does not use the {0} scheme")]
    MissingScheme(String),

    #[error("no credentials found for id {0}")]
    CredentialsLookup(String),

    #[error("request MAC does not match")]
    MacMismatch,

    #[error("content hash does not match the payload")]
    MisComputedContentHash,

    #[error("malformed authorization header: {0}")]
    BadHeaderValue(String),

    #[error("message timestamp is outside the allowed skew")]
    TokenExpired,

    /// Replay: the (credential id, nonce, timestamp) triple was already
    /// processed within its validity window.
    #[error("nonce already processed")]
    AlreadyProcessed,

    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    /// Short machine-readable tag for the log stream.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingScheme(_) => "missing_scheme",
            AuthError::CredentialsLookup(_) => "credentials_lookup",
            AuthError::MacMismatch => "mac_mismatch",
            AuthError::MisComputedContentHash => "content_hash_mismatch",
            AuthError::BadHeaderValue(_) => "bad_header_value",
            AuthError::TokenExpired => "token_expired",
            AuthError::AlreadyProcessed => "already_processed",
            AuthError::Internal(_) => "internal",
        }
    }
}

/// Error response body for API clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    /// The generic denial body. The classified kind never reaches the
    /// client; it is preserved in the log stream only.
    pub fn authentication_failed() -> Self {
        Self {
            error: "authentication failed".to_string(),
            code: "AUTHENTICATION_FAILED".to_string(),
        }
    }

    pub fn internal() -> Self {
        Self {
            error: "An internal error occurred".to_string(),
            code: "INTERNAL_ERROR".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::internal()),
                )
                    .into_response()
            }
            _ => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::authentication_failed()),
            )
                .into_response(),
        }
    }
}

/// Result type alias for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
