//! restgate backend: bearer-token authentication for a generic REST store.
//!
//! The library holds the authentication core (`auth`), configuration, error
//! rendering and the axum router; `main.rs` wires it to a credential store
//! and serves it.

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod state;

use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the application router: auth endpoints under `/api/auth`, guarded
/// user endpoints under `/api/user`.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .nest("/api/auth", auth::auth_router())
        .nest("/api/user", api::user::routes::user_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(middleware::request_id))
        .with_state(state)
}

async fn root_handler() -> &'static str {
    "Welcome to restgate!"
}
