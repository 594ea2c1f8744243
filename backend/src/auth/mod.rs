//! Authentication module for managing credentials, sessions, and access control.
//!
//! This module provides the public interface for password digests, bearer token
//! issuance and validation, the request guard, and the auth HTTP endpoints.

pub mod clock;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod policy;
pub mod routes;
pub mod service;
pub mod token;

// Re-exports for convenience
pub use clock::*;
pub use errors::*;
pub use middleware::*;
pub use models::*;
pub use password::*;
pub use policy::*;
pub use routes::*;
pub use service::*;
pub use token::*;
