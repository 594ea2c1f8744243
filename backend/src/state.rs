//! Shared application state handed to every handler.

use std::sync::Arc;

use adapters::CredentialStore;

use crate::auth::{AuthError, PasswordHasher, RequestGuard, SessionTokenService};
use crate::errors::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<SessionTokenService>,
    pub guard: RequestGuard,
    pub store: Arc<dyn CredentialStore>,
    /// Derives digests for newly created credentials.
    pub hasher: PasswordHasher,
}

impl AppState {
    pub fn new(
        tokens: Arc<SessionTokenService>,
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            guard: RequestGuard::new(tokens.clone()),
            tokens,
            store,
            hasher,
        }
    }

    /// Wraps an auth failure with this deployment's realm for rendering.
    pub fn reject(&self, err: AuthError) -> ApiError {
        ApiError::auth(err, self.tokens.realm())
    }
}
