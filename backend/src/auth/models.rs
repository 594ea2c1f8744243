//! Data structures for authentication-related entities.
//!
//! This module defines the signed token claims, the request-scoped identity the
//! guard hands to handlers, and the request/response bodies of the auth endpoints.

use adapters::UserId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim names owned by the token format. Payload extensions cannot set them.
pub const RESERVED_CLAIMS: [&str; 4] = ["id", "username", "exp", "orig_iat"];

/// Claim read by role-based privilege checks.
pub const ROLES_CLAIM: &str = "roles";

/// The signed payload of a bearer token.
///
/// On the wire this is a flat object: `id`, `username`, `exp`, `orig_iat` when the
/// token is refreshable, plus whatever extra claims were merged in at issue time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub id: UserId,
    pub username: String,
    /// Seconds since the Unix epoch.
    #[serde(rename = "exp")]
    pub expires_at: i64,
    /// Seconds since the Unix epoch of the original login. Carried unchanged
    /// through refreshes.
    #[serde(rename = "orig_iat", default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    pub fn roles(&self) -> Vec<String> {
        match self.extra.get(ROLES_CLAIM) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|value| value.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(role)) => vec![role.clone()],
            _ => Vec::new(),
        }
    }
}

/// Who is making the current request. Lives for one request only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl AuthenticatedIdentity {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<TokenClaims> for AuthenticatedIdentity {
    fn from(claims: TokenClaims) -> Self {
        let roles = claims.roles();
        Self {
            id: claims.id,
            username: claims.username,
            roles,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenMeta {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub meta: TokenMeta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountView {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub data: AccountView,
    pub meta: TokenMeta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
}
