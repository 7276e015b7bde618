//! Authentication errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use warden_common::RepositoryError;

use crate::cache::CacheError;

/// Authentication error
///
/// `Unauthorized`, `BadRequest` and `Forbidden` are the HTTP-classified
/// rejections: the entity middleware answers them directly with a bare
/// status and the message as plain text. Everything else propagates to the
/// generic JSON error response.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid token claims: {0}")]
    InvalidClaims(String),

    /// Verification failure outside the decode/signature/expiry stages
    #[error("Token verification failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Store(#[from] RepositoryError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl AuthError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AuthError::Unauthorized(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AuthError::BadRequest(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AuthError::Forbidden(message.into())
    }

    /// Whether this error carries an HTTP status meant for the client
    pub fn is_http(&self) -> bool {
        matches!(
            self,
            AuthError::Unauthorized(_) | AuthError::BadRequest(_) | AuthError::Forbidden(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::Store(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            AuthError::Configuration(_)
            | AuthError::InvalidClaims(_)
            | AuthError::Token(_)
            | AuthError::Store(_)
            | AuthError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Configuration(_) => "AUTH_CONFIGURATION",
            AuthError::Unauthorized(_) => "UNAUTHORIZED",
            AuthError::BadRequest(_) => "BAD_REQUEST",
            AuthError::Forbidden(_) => "FORBIDDEN",
            AuthError::InvalidClaims(_) => "INVALID_CLAIMS",
            AuthError::Token(_) => "TOKEN_ERROR",
            AuthError::Store(RepositoryError::NotFound) => "NOT_FOUND",
            AuthError::Store(_) => "ENTITY_LOAD_ERROR",
            AuthError::Cache(_) => "REQUEST_CACHE_ERROR",
        }
    }

    /// Plain-text rendering used by the entity middleware
    pub(crate) fn into_plain_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

impl From<AuthError> for warden_common::Error {
    fn from(err: AuthError) -> Self {
        use warden_common::Error;

        match err {
            AuthError::Unauthorized(msg) => Error::Authentication(msg),
            AuthError::BadRequest(msg) => Error::Validation(msg),
            AuthError::Forbidden(msg) => Error::Authorization(msg),
            AuthError::Configuration(msg) => Error::Configuration(msg),
            AuthError::Store(e) => e.into(),
            other => Error::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Authentication failed with internal error");
            "Authentication failed".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
