//! Module for user profile API endpoints.
//!
//! Every route here sits behind `auth::require_auth` and works from the
//! request-scoped `AuthenticatedIdentity`.

pub mod handlers;
pub mod routes;
