//! Pluggable capabilities of the session token service.
//!
//! Each is supplied at construction so tests and deployments can swap them
//! without touching the service or the guard.

use std::sync::Arc;

use adapters::{CredentialRecord, CredentialStore, UserId};
use async_trait::async_trait;
use serde_json::{Map, Value};

use super::errors::AuthError;
use super::models::AuthenticatedIdentity;
use super::password::verify_password;

/// Proves a username/password pair and resolves it to a stored credential.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Fails with [`AuthError::InvalidCredentials`] for both an unknown username
    /// and a wrong password.
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<CredentialRecord, AuthError>;
}

/// Authenticates against a [`CredentialStore`] and the password digest scheme.
pub struct StoreAuthenticator {
    store: Arc<dyn CredentialStore>,
}

impl StoreAuthenticator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Authenticator for StoreAuthenticator {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<CredentialRecord, AuthError> {
        let Some(record) = self.store.find_by_username(username).await? else {
            tracing::warn!(username, "login rejected: unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &record.password_digest) {
            tracing::warn!(username, "login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(record)
    }
}

/// The method and path of the request being authorized.
#[derive(Debug, Clone, Copy)]
pub struct RequestTarget<'a> {
    pub method: &'a str,
    pub path: &'a str,
}

/// Decides whether an authenticated identity may make a given request.
/// Consulted by the guard middleware after the token has been accepted.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, identity: &AuthenticatedIdentity, target: &RequestTarget<'_>) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _identity: &AuthenticatedIdentity, _target: &RequestTarget<'_>) -> bool {
        true
    }
}

pub trait PrivilegePolicy: Send + Sync {
    fn is_privileged(&self, identity: &AuthenticatedIdentity) -> bool;

    /// Privileged identities may touch any resource, everyone else only their own.
    fn may_access(&self, identity: &AuthenticatedIdentity, owner: &UserId) -> bool {
        self.is_privileged(identity) || &identity.id == owner
    }
}

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Privileged when the username is the admin username, or when the identity
/// holds `role` (if one is configured).
#[derive(Debug, Clone)]
pub struct AdminPolicy {
    username: String,
    role: Option<String>,
}

impl AdminPolicy {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

impl Default for AdminPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_USERNAME)
    }
}

impl PrivilegePolicy for AdminPolicy {
    fn is_privileged(&self, identity: &AuthenticatedIdentity) -> bool {
        identity.username == self.username
            || self
                .role
                .as_deref()
                .is_some_and(|role| identity.has_role(role))
    }
}

/// Contributes extra claims to every token minted at login or signup.
///
/// Keys listed in [`RESERVED_CLAIMS`](super::models::RESERVED_CLAIMS) are dropped.
/// Claims are signed, not encrypted.
pub trait PayloadExtension: Send + Sync {
    fn extra_claims(&self, id: &UserId, username: &str) -> Map<String, Value>;
}
