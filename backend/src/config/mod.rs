//! Central module for application-wide configuration settings.
//!
//! Settings come from the process environment (a `.env` file is loaded first by
//! the binary when present). The signing secret and realm have no defaults:
//! leaving either out is a startup failure.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::auth::{
    AdminPolicy, PasswordScheme, SessionTokenService, SessionTokenServiceBuilder,
    SigningAlgorithm, DEFAULT_ADMIN_USERNAME,
};

pub const BIND_ADDR: &str = "RESTGATE_BIND_ADDR";
pub const JWT_ALGORITHM: &str = "RESTGATE_JWT_ALGORITHM";
pub const JWT_SECRET: &str = "RESTGATE_JWT_SECRET";
pub const JWT_REALM: &str = "RESTGATE_JWT_REALM";
pub const JWT_TTL_SECS: &str = "RESTGATE_JWT_TTL_SECS";
pub const JWT_MAX_REFRESH_SECS: &str = "RESTGATE_JWT_MAX_REFRESH_SECS";
pub const PASSWORD_SCHEME: &str = "RESTGATE_PASSWORD_SCHEME";
pub const ADMIN_USERNAME: &str = "RESTGATE_ADMIN_USERNAME";
pub const ADMIN_ROLE: &str = "RESTGATE_ADMIN_ROLE";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_TTL_SECS: u64 = 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub signing_algorithm: SigningAlgorithm,
    pub signing_key: Vec<u8>,
    pub realm: String,
    pub token_ttl: Duration,
    pub max_refresh: Duration,
    pub password_scheme: PasswordScheme,
    pub admin_username: String,
    pub admin_role: Option<String>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("signing_algorithm", &self.signing_algorithm)
            .field("signing_key", &"<redacted>")
            .field("realm", &self.realm)
            .field("token_ttl", &self.token_ttl)
            .field("max_refresh", &self.max_refresh)
            .field("password_scheme", &self.password_scheme)
            .field("admin_username", &self.admin_username)
            .field("admin_role", &self.admin_role)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any key/value source. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let bind_addr: SocketAddr = get(BIND_ADDR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|err| invalid(BIND_ADDR, err))?;
        let signing_algorithm: SigningAlgorithm = match get(JWT_ALGORITHM) {
            Some(value) => value.parse().map_err(|err| invalid(JWT_ALGORITHM, err))?,
            None => SigningAlgorithm::default(),
        };
        let password_scheme: PasswordScheme = match get(PASSWORD_SCHEME) {
            Some(value) => value.parse().map_err(|err| invalid(PASSWORD_SCHEME, err))?,
            None => PasswordScheme::default(),
        };

        Ok(Self {
            bind_addr,
            signing_algorithm,
            signing_key: required(JWT_SECRET)?.into_bytes(),
            realm: required(JWT_REALM)?,
            token_ttl: seconds(get(JWT_TTL_SECS), JWT_TTL_SECS, DEFAULT_TTL_SECS)?,
            max_refresh: seconds(get(JWT_MAX_REFRESH_SECS), JWT_MAX_REFRESH_SECS, 0)?,
            password_scheme,
            admin_username: get(ADMIN_USERNAME)
                .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
            admin_role: get(ADMIN_ROLE),
        })
    }

    /// A token service builder with everything from this configuration applied.
    /// The caller still supplies the authenticator.
    pub fn session_builder(&self) -> SessionTokenServiceBuilder {
        let mut privileges = AdminPolicy::new(self.admin_username.clone());
        if let Some(role) = &self.admin_role {
            privileges = privileges.with_role(role.clone());
        }

        SessionTokenService::builder()
            .signing_algorithm(self.signing_algorithm)
            .signing_key(self.signing_key.clone())
            .realm(self.realm.clone())
            .token_ttl(self.token_ttl)
            .max_refresh(self.max_refresh)
            .privileges(privileges)
    }
}

fn invalid(name: &'static str, err: impl fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: err.to_string(),
    }
}

fn seconds(
    value: Option<String>,
    name: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|err| invalid(name, err)),
        None => Ok(Duration::from_secs(default)),
    }
}
