//! Middleware for protecting authenticated routes and handling authorization.
//!
//! `RequestGuard` turns a raw `Authorization` header into an
//! `AuthenticatedIdentity`. `require_auth` runs the guard and the configured
//! authorizer for axum routes and passes the identity on through request
//! extensions, so every request carries its own context.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use super::errors::{AuthError, Rejection};
use super::models::AuthenticatedIdentity;
use super::policy::RequestTarget;
use super::service::SessionTokenService;
use crate::errors::ApiError;
use crate::state::AppState;

pub const BEARER_SCHEME: &str = "Bearer";

/// Splits `Bearer <token>` and returns the token.
///
/// The scheme keyword is case-sensitive and separated by exactly one space.
pub fn parse_bearer(header: &str) -> Result<&str, Rejection> {
    if header.is_empty() {
        return Err(Rejection::MissingHeader);
    }
    let Some((scheme, token)) = header.split_once(' ') else {
        return Err(Rejection::MalformedHeader);
    };
    if scheme != BEARER_SCHEME {
        return Err(Rejection::UnsupportedScheme);
    }
    if token.is_empty() {
        return Err(Rejection::MalformedHeader);
    }
    Ok(token)
}

/// The raw `Authorization` header, or `""` when absent.
pub fn authorization_header(headers: &HeaderMap) -> Result<&str, Rejection> {
    match headers.get(AUTHORIZATION) {
        Some(value) => value.to_str().map_err(|_| Rejection::MalformedHeader),
        None => Ok(""),
    }
}

#[derive(Debug, Clone)]
pub struct RequestGuard {
    tokens: Arc<SessionTokenService>,
}

impl RequestGuard {
    pub fn new(tokens: Arc<SessionTokenService>) -> Self {
        Self { tokens }
    }

    /// Validates the bearer token in `header` and enforces the refresh window as
    /// an outer bound on the login's age.
    pub fn authorize(&self, header: &str) -> Result<AuthenticatedIdentity, AuthError> {
        let token = parse_bearer(header)?;
        let claims = self.tokens.validate(token)?;
        self.tokens.ensure_live(&claims)?;
        Ok(AuthenticatedIdentity::from(claims))
    }
}

/// Axum middleware for guarded routes. Handlers read the identity with
/// `Extension<AuthenticatedIdentity>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = authorization_header(request.headers()).map_err(|r| state.reject(r.into()))?;
    let identity = state
        .guard
        .authorize(header)
        .map_err(|err| state.reject(err))?;

    let target = RequestTarget {
        method: request.method().as_str(),
        path: request.uri().path(),
    };
    if !state.tokens.authorizer().authorize(&identity, &target) {
        tracing::warn!(user_id = %identity.id, path = target.path, "authorizer denied request");
        return Err(state.reject(Rejection::Denied.into()));
    }

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
