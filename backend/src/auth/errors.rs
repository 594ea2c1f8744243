//! Custom error types specific to authentication failures.
//!
//! `AuthError` is the taxonomy callers see. `Rejection` keeps the precise reason a
//! request or token was turned away; the HTTP boundary collapses every rejection
//! into the same 401 but the reason stays available for logs and tests.

use adapters::AdapterError;
use thiserror::Error;

use super::token::TokenError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username or wrong password. The two cases are never told apart.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("unauthorized: {0}")]
    Unauthorized(#[from] Rejection),

    /// The token's original issue time is outside the refresh window; the
    /// client has to log in again.
    #[error("refresh window exceeded")]
    RefreshWindowExceeded,

    /// Startup-only. Signing failures also land here since they can only come
    /// from a bad key or algorithm.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("credential lookup failed: {0}")]
    Lookup(#[from] AdapterError),
}

impl AuthError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// The underlying rejection, if this is an `Unauthorized` error.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Unauthorized(rejection) => Some(rejection),
            _ => None,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(reason) => Self::Configuration(reason),
            other => Self::Unauthorized(Rejection::Token(other)),
        }
    }
}

/// Why a request or token was not accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("authorization header missing")]
    MissingHeader,

    #[error("authorization header malformed")]
    MalformedHeader,

    #[error("unsupported authorization scheme")]
    UnsupportedScheme,

    #[error(transparent)]
    Token(#[from] TokenError),

    /// Refresh is enabled but the token has no `orig_iat` claim.
    #[error("token carries no orig_iat claim")]
    MissingIssuedAt,

    #[error("request denied by authorizer")]
    Denied,
}

impl Rejection {
    /// True for failures in the header itself, before any token was looked at.
    pub fn is_header_error(&self) -> bool {
        matches!(
            self,
            Self::MissingHeader | Self::MalformedHeader | Self::UnsupportedScheme
        )
    }
}
