//! Handler functions for user profile API endpoints.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::auth::AuthenticatedIdentity;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileView {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub privileged: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub data: ProfileView,
}

/// The caller's own identity as established by the guard.
pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> Json<ProfileResponse> {
    let privileged = state.tokens.privileges().is_privileged(&identity);
    Json(ProfileResponse {
        data: ProfileView {
            id: identity.id.to_string(),
            username: identity.username,
            privileged,
        },
    })
}
