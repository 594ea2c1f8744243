//! Core `adapters` crate for abstracting credential storage.
//!
//! This crate defines the `CredentialStore` trait, which outlines the lookups the
//! authentication core needs from whatever store holds user accounts, and provides
//! an in-memory implementation for the default binary and for tests.

pub mod errors;
pub mod memory;
pub mod models;

pub use errors::AdapterError;
pub use memory::MemoryCredentialStore;
pub use models::{CredentialRecord, NewCredential, UserId};

use async_trait::async_trait;

/// Read/insert access to stored credentials.
///
/// Implementations may block on I/O and are called concurrently; callers must not
/// hold locks of their own across these calls.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Resolves a username to its stored credential, `Ok(None)` when unknown.
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<CredentialRecord>, AdapterError>;

    /// Persists a new credential and returns it with its assigned identity.
    ///
    /// Fails with [`AdapterError::Duplicate`] when the username is taken.
    async fn insert(&self, credential: NewCredential) -> Result<CredentialRecord, AdapterError>;
}
