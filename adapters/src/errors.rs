//! Custom error types specific to the `adapters` crate.
//!
//! These errors cover failures reported by a credential store, independent of
//! which backing implementation produced them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// A credential with this username already exists.
    #[error("username already taken: {username}")]
    Duplicate { username: String },

    /// The backing store could not be reached or failed mid-operation.
    #[error("credential store unavailable: {reason}")]
    Unavailable { reason: String },
}
