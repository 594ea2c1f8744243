//! Defines the HTTP routes specifically for authentication.
//!
//! Login, signup and refresh are public; refresh authenticates through the
//! token it is given. Nest under `/api/auth`.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{login, refresh, signup};
use crate::state::AppState;

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/signup", post(signup))
        .route("/refresh", get(refresh))
}
