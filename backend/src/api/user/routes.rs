//! Defines the HTTP routes for user profile data. Nest under `/api/user`.

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;

use super::handlers::me;
use crate::auth::require_auth;
use crate::state::AppState;

pub fn user_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route_layer(from_fn_with_state(state, require_auth))
}
