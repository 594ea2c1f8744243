//! Global application error types and handlers.
//!
//! `ApiError` is what handlers return. It renders as a JSON body
//! `{"error": {"code", "message"}}`; authentication failures additionally carry
//! a `WWW-Authenticate` challenge naming the configured realm.

use adapters::AdapterError;
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AuthError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{source}")]
    Auth { source: AuthError, realm: String },

    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("service unavailable: {message}")]
    Unavailable { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn auth(source: AuthError, realm: impl Into<String>) -> Self {
        Self::Auth {
            source,
            realm: realm.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<AdapterError> for ApiError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Duplicate { username } => Self::Conflict {
                message: format!("username {username} is already taken"),
            },
            AdapterError::Unavailable { reason } => Self::Unavailable { message: reason },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Auth { source, .. } => match source {
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    source.to_string(),
                ),
                AuthError::Unauthorized(rejection) => {
                    tracing::debug!(%rejection, "request unauthorized");
                    (
                        StatusCode::UNAUTHORIZED,
                        "UNAUTHORIZED",
                        "Not Authorized".to_string(),
                    )
                }
                AuthError::RefreshWindowExceeded => (
                    StatusCode::UNAUTHORIZED,
                    "REFRESH_WINDOW_EXCEEDED",
                    "session too old to refresh, log in again".to_string(),
                ),
                AuthError::Lookup(err) => {
                    tracing::error!("credential lookup failed: {}", err);
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "STORE_UNAVAILABLE",
                        "credential store unavailable".to_string(),
                    )
                }
                AuthError::Configuration(reason) => {
                    tracing::error!("token service misconfigured: {}", reason);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "internal error".to_string(),
                    )
                }
            },
            ApiError::BadRequest { message } => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", message.clone())
            }
            ApiError::Conflict { message } => (StatusCode::CONFLICT, "CONFLICT", message.clone()),
            ApiError::Unavailable { message } => {
                tracing::error!("store unavailable: {}", message);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    "credential store unavailable".to_string(),
                )
            }
            ApiError::Internal { message } => {
                tracing::error!("internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "internal error".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };
        let mut response = (status, Json(body)).into_response();

        if let ApiError::Auth { realm, .. } = &self {
            if status == StatusCode::UNAUTHORIZED {
                if let Ok(challenge) = HeaderValue::from_str(&format!("JWT realm=\"{realm}\"")) {
                    response.headers_mut().insert(WWW_AUTHENTICATE, challenge);
                }
            }
        }

        response
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
