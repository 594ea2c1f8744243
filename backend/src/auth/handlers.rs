//! Handler functions for authentication-related API endpoints.
//!
//! These functions parse request data, validate input, and call into
//! `auth::service` for login, signup and token refresh.

use adapters::NewCredential;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use super::middleware::{authorization_header, parse_bearer};
use super::models::{
    AccountView, LoginRequest, LoginResponse, RefreshResponse, SignupRequest, SignupResponse,
    TokenMeta,
};
use crate::errors::{ApiError, Result};
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    // Usernames are stored trimmed by signup.
    let (token, _) = state
        .tokens
        .login(body.username.trim(), &body.password)
        .await
        .map_err(|err| state.reject(err))?;

    Ok(Json(LoginResponse {
        meta: TokenMeta { token },
    }))
}

pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>)> {
    let username = body.username.trim();
    if username.is_empty() {
        return Err(ApiError::bad_request("empty username"));
    }
    if body.password.is_empty() {
        return Err(ApiError::bad_request("empty password"));
    }

    let password_digest = state
        .hasher
        .derive(&body.password)
        .map_err(|err| ApiError::internal(err.to_string()))?;
    let record = state
        .store
        .insert(NewCredential {
            username: username.to_string(),
            password_digest,
        })
        .await?;
    tracing::info!(user_id = %record.id, username = %record.username, "account created");

    let token = state
        .tokens
        .issue_for(&record.id, &record.username)
        .map_err(|err| state.reject(err))?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            data: AccountView {
                id: record.id,
                username: record.username,
            },
            meta: TokenMeta { token },
        }),
    ))
}

/// Exchanges a bearer token, possibly already expired, for a fresh one.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>> {
    let token = authorization_header(&headers)
        .and_then(parse_bearer)
        .map_err(|rejection| state.reject(rejection.into()))?;
    let token = state
        .tokens
        .refresh(token)
        .map_err(|err| state.reject(err))?;

    Ok(Json(RefreshResponse { token }))
}
