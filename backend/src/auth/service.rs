//! Core business logic for the authentication system.
//!
//! `SessionTokenService` handles login, token issuance for new accounts,
//! validation and refresh. It owns the immutable session configuration and the
//! token codec, and reaches the credential store only through its `Authenticator`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use adapters::UserId;
use serde_json::Map;

use super::clock::{Clock, SystemClock};
use super::errors::{AuthError, Rejection};
use super::models::{TokenClaims, RESERVED_CLAIMS};
use super::policy::{
    AdminPolicy, AllowAll, Authenticator, Authorizer, PayloadExtension, PrivilegePolicy,
};
use super::token::{SigningAlgorithm, TokenCodec};

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Process-wide session settings. Fixed once the service is built.
#[derive(Clone)]
pub struct SessionConfig {
    pub signing_algorithm: SigningAlgorithm,
    pub signing_key: Vec<u8>,
    pub realm: String,
    pub token_ttl: Duration,
    /// How long after the original login a token may still be refreshed.
    /// Zero disables refresh.
    pub max_refresh: Duration,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("signing_algorithm", &self.signing_algorithm)
            .field("signing_key", &"<redacted>")
            .field("realm", &self.realm)
            .field("token_ttl", &self.token_ttl)
            .field("max_refresh", &self.max_refresh)
            .finish()
    }
}

impl SessionConfig {
    pub fn is_refreshable(&self) -> bool {
        !self.max_refresh.is_zero()
    }
}

pub struct SessionTokenService {
    config: SessionConfig,
    codec: TokenCodec,
    ttl_secs: i64,
    max_refresh_secs: i64,
    authenticator: Arc<dyn Authenticator>,
    authorizer: Arc<dyn Authorizer>,
    privileges: Arc<dyn PrivilegePolicy>,
    payload: Option<Arc<dyn PayloadExtension>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SessionTokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokenService")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl SessionTokenService {
    pub fn builder() -> SessionTokenServiceBuilder {
        SessionTokenServiceBuilder::default()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn realm(&self) -> &str {
        &self.config.realm
    }

    pub fn authorizer(&self) -> &dyn Authorizer {
        self.authorizer.as_ref()
    }

    pub fn privileges(&self) -> &dyn PrivilegePolicy {
        self.privileges.as_ref()
    }

    /// Checks the credentials and returns a fresh token plus the account's identity.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(String, UserId), AuthError> {
        let record = self.authenticator.authenticate(username, password).await?;
        let token = self.issue_for(&record.id, &record.username)?;
        tracing::debug!(user_id = %record.id, username, "login succeeded");
        Ok((token, record.id))
    }

    /// Mints a token for an account without checking a password. Only for callers
    /// that just created the account.
    pub fn issue_for(&self, id: &UserId, username: &str) -> Result<String, AuthError> {
        let now = self.clock.unix_now();
        let mut extra = match &self.payload {
            Some(payload) => payload.extra_claims(id, username),
            None => Map::new(),
        };
        for key in RESERVED_CLAIMS {
            if extra.remove(key).is_some() {
                tracing::warn!(claim = key, "payload extension tried to set a reserved claim");
            }
        }

        let claims = TokenClaims {
            id: id.clone(),
            username: username.to_string(),
            expires_at: now.saturating_add(self.ttl_secs),
            issued_at: self.config.is_refreshable().then_some(now),
            extra,
        };
        Ok(self.codec.encode(&claims)?)
    }

    /// Verifies signature, algorithm and expiry.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = self.codec.decode(token, self.clock.unix_now())?;
        tracing::debug!(user_id = %claims.id, "token validated");
        Ok(claims)
    }

    /// Re-signs a token with a new expiry. The presented token may already be
    /// expired; only its original login time has to be inside the refresh window.
    /// `orig_iat` is carried over unchanged, so one login lives at most
    /// `max_refresh + token_ttl`.
    pub fn refresh(&self, token: &str) -> Result<String, AuthError> {
        let mut claims = self.codec.verify(token)?;
        let now = self.clock.unix_now();
        self.check_refresh_window(&claims, now)?;

        claims.expires_at = now.saturating_add(self.ttl_secs);
        let token = self.codec.encode(&claims)?;
        tracing::debug!(user_id = %claims.id, "token refreshed");
        Ok(token)
    }

    /// Liveness bound applied on every guarded request: when refresh is enabled,
    /// a token whose original login is outside the refresh window is dead even if
    /// its `exp` has not passed.
    pub fn ensure_live(&self, claims: &TokenClaims) -> Result<(), AuthError> {
        if !self.config.is_refreshable() {
            return Ok(());
        }
        self.check_refresh_window(claims, self.clock.unix_now())
    }

    fn check_refresh_window(&self, claims: &TokenClaims, now: i64) -> Result<(), AuthError> {
        if !self.config.is_refreshable() {
            return Err(AuthError::RefreshWindowExceeded);
        }
        let issued_at = claims.issued_at.ok_or(Rejection::MissingIssuedAt)?;
        if issued_at < now.saturating_sub(self.max_refresh_secs) {
            tracing::warn!(user_id = %claims.id, issued_at, "refresh window exceeded");
            return Err(AuthError::RefreshWindowExceeded);
        }
        Ok(())
    }
}

/// Collects configuration and capabilities; `build` validates them.
#[derive(Default)]
pub struct SessionTokenServiceBuilder {
    signing_algorithm: Option<SigningAlgorithm>,
    signing_key: Option<Vec<u8>>,
    realm: Option<String>,
    token_ttl: Option<Duration>,
    max_refresh: Duration,
    authenticator: Option<Arc<dyn Authenticator>>,
    authorizer: Option<Arc<dyn Authorizer>>,
    privileges: Option<Arc<dyn PrivilegePolicy>>,
    payload: Option<Arc<dyn PayloadExtension>>,
    clock: Option<Arc<dyn Clock>>,
}

impl SessionTokenServiceBuilder {
    pub fn signing_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.signing_algorithm = Some(algorithm);
        self
    }

    pub fn signing_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.signing_key = Some(key.into());
        self
    }

    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = Some(ttl);
        self
    }

    pub fn max_refresh(mut self, window: Duration) -> Self {
        self.max_refresh = window;
        self
    }

    pub fn authenticator<A: Authenticator + 'static>(mut self, authenticator: A) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    pub fn authorizer<A: Authorizer + 'static>(mut self, authorizer: A) -> Self {
        self.authorizer = Some(Arc::new(authorizer));
        self
    }

    pub fn privileges<P: PrivilegePolicy + 'static>(mut self, policy: P) -> Self {
        self.privileges = Some(Arc::new(policy));
        self
    }

    pub fn payload_extension<P: PayloadExtension + 'static>(mut self, payload: P) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Fails with [`AuthError::Configuration`] when the realm, signing key or
    /// authenticator is missing. Algorithm defaults to HS256, TTL to one hour.
    pub fn build(self) -> Result<SessionTokenService, AuthError> {
        let realm = self
            .realm
            .filter(|realm| !realm.trim().is_empty())
            .ok_or_else(|| AuthError::configuration("realm is required"))?;
        let signing_key = self
            .signing_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AuthError::configuration("signing key is required"))?;
        let authenticator = self
            .authenticator
            .ok_or_else(|| AuthError::configuration("authenticator is required"))?;

        let config = SessionConfig {
            signing_algorithm: self.signing_algorithm.unwrap_or_default(),
            signing_key,
            realm,
            token_ttl: self
                .token_ttl
                .filter(|ttl| !ttl.is_zero())
                .unwrap_or(DEFAULT_TOKEN_TTL),
            max_refresh: self.max_refresh,
        };
        let ttl_secs = whole_seconds("token TTL", config.token_ttl)?;
        let max_refresh_secs = whole_seconds("refresh window", config.max_refresh)?;
        let codec = TokenCodec::new(config.signing_algorithm, &config.signing_key);
        tracing::debug!(?config, "session token service configured");

        Ok(SessionTokenService {
            config,
            codec,
            ttl_secs,
            max_refresh_secs,
            authenticator,
            authorizer: self.authorizer.unwrap_or_else(|| Arc::new(AllowAll)),
            privileges: self
                .privileges
                .unwrap_or_else(|| Arc::new(AdminPolicy::default())),
            payload: self.payload,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        })
    }
}

// Token timestamps are signed Unix seconds; anything wider is a configuration error.
fn whole_seconds(name: &str, duration: Duration) -> Result<i64, AuthError> {
    i64::try_from(duration.as_secs())
        .map_err(|_| AuthError::configuration(format!("{name} of {duration:?} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapters::CredentialRecord;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::auth::clock::ManualClock;
    use crate::auth::token::TokenError;

    const T0: i64 = 1_700_000_000;

    struct SingleUser;

    #[async_trait]
    impl Authenticator for SingleUser {
        async fn authenticate(
            &self,
            username: &str,
            password: &str,
        ) -> Result<CredentialRecord, AuthError> {
            if username == "alice" && password == "wonderland" {
                Ok(CredentialRecord {
                    id: UserId::new("u-alice"),
                    username: "alice".to_string(),
                    password_digest: String::new(),
                })
            } else {
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    struct TenantPayload;

    impl PayloadExtension for TenantPayload {
        fn extra_claims(&self, _id: &UserId, _username: &str) -> Map<String, Value> {
            let mut extra = Map::new();
            extra.insert("tenant".to_string(), json!("acme"));
            extra.insert("exp".to_string(), json!(0));
            extra
        }
    }

    fn builder() -> SessionTokenServiceBuilder {
        SessionTokenService::builder()
            .realm("jwt auth")
            .signing_key("secret key")
            .authenticator(SingleUser)
    }

    fn service_at(clock: Arc<ManualClock>, max_refresh: Duration) -> SessionTokenService {
        builder()
            .max_refresh(max_refresh)
            .clock(clock)
            .build()
            .unwrap()
    }

    #[test]
    fn missing_realm_key_or_authenticator_is_fatal() {
        let no_realm = SessionTokenService::builder()
            .signing_key("k")
            .authenticator(SingleUser)
            .build();
        assert!(matches!(no_realm, Err(AuthError::Configuration(_))));

        let no_key = SessionTokenService::builder()
            .realm("r")
            .signing_key(Vec::new())
            .authenticator(SingleUser)
            .build();
        assert!(matches!(no_key, Err(AuthError::Configuration(_))));

        let no_authenticator = SessionTokenService::builder()
            .realm("r")
            .signing_key("k")
            .build();
        assert!(matches!(no_authenticator, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let service = builder().token_ttl(Duration::ZERO).build().unwrap();
        let config = service.config();
        assert_eq!(config.signing_algorithm, SigningAlgorithm::Hs256);
        assert_eq!(config.token_ttl, DEFAULT_TOKEN_TTL);
        assert!(!config.is_refreshable());
        assert!(!format!("{config:?}").contains("secret key"));
    }

    #[test]
    fn durations_beyond_signed_seconds_are_fatal() {
        let too_long = Duration::from_secs(u64::MAX);

        let ttl = builder().token_ttl(too_long).build();
        assert!(matches!(ttl, Err(AuthError::Configuration(_))));

        let window = builder().max_refresh(too_long).build();
        assert!(matches!(window, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn extreme_but_valid_durations_do_not_overflow() {
        let clock = Arc::new(ManualClock::at_unix(T0));
        let service = builder()
            .token_ttl(Duration::from_secs(i64::MAX as u64))
            .max_refresh(Duration::from_secs(i64::MAX as u64))
            .clock(clock)
            .build()
            .unwrap();

        let token = service.issue_for(&UserId::new("u1"), "bob").unwrap();
        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.expires_at, i64::MAX);

        let refreshed = service.refresh(&token).unwrap();
        assert_eq!(service.validate(&refreshed).unwrap().issued_at, Some(T0));
    }

    #[tokio::test]
    async fn login_claims_carry_identity_and_expiry() {
        let clock = Arc::new(ManualClock::at_unix(T0));
        let service = service_at(clock, Duration::from_secs(86_400));

        let (token, id) = service.login("alice", "wonderland").await.unwrap();
        assert_eq!(id, UserId::new("u-alice"));

        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.expires_at, T0 + 3600);
        assert_eq!(claims.issued_at, Some(T0));
    }

    #[tokio::test]
    async fn login_failure_is_invalid_credentials() {
        let service = builder().build().unwrap();
        let err = service.login("alice", "nope").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn orig_iat_only_when_refreshable() {
        let clock = Arc::new(ManualClock::at_unix(T0));
        let service = service_at(clock, Duration::ZERO);
        let token = service.issue_for(&UserId::new("u1"), "bob").unwrap();
        assert_eq!(service.validate(&token).unwrap().issued_at, None);
    }

    #[test]
    fn payload_extension_cannot_override_reserved_claims() {
        let clock = Arc::new(ManualClock::at_unix(T0));
        let service = builder()
            .clock(clock)
            .payload_extension(TenantPayload)
            .build()
            .unwrap();

        let token = service.issue_for(&UserId::new("u1"), "bob").unwrap();
        let claims = service.validate(&token).unwrap();
        assert_eq!(claims.extra.get("tenant"), Some(&json!("acme")));
        assert_eq!(claims.expires_at, T0 + 3600);
    }

    #[test]
    fn refresh_keeps_orig_iat_and_extra_claims() {
        let clock = Arc::new(ManualClock::at_unix(T0));
        let service = builder()
            .max_refresh(Duration::from_secs(86_400))
            .clock(clock.clone())
            .payload_extension(TenantPayload)
            .build()
            .unwrap();
        let token = service.issue_for(&UserId::new("u1"), "bob").unwrap();

        clock.advance(Duration::from_secs(7200));
        let refreshed = service.refresh(&token).unwrap();
        let claims = service.validate(&refreshed).unwrap();
        assert_eq!(claims.issued_at, Some(T0));
        assert_eq!(claims.expires_at, T0 + 7200 + 3600);
        assert_eq!(claims.extra.get("tenant"), Some(&json!("acme")));
    }

    #[test]
    fn refresh_disabled_when_window_is_zero() {
        let clock = Arc::new(ManualClock::at_unix(T0));
        let service = service_at(clock, Duration::ZERO);
        let token = service.issue_for(&UserId::new("u1"), "bob").unwrap();
        assert!(matches!(
            service.refresh(&token),
            Err(AuthError::RefreshWindowExceeded)
        ));
        // Without a refresh window the nominal expiry is the only bound.
        let claims = service.validate(&token).unwrap();
        assert!(service.ensure_live(&claims).is_ok());
    }

    #[test]
    fn refresh_requires_orig_iat() {
        let clock = Arc::new(ManualClock::at_unix(T0));
        let issuer = service_at(clock.clone(), Duration::ZERO);
        let refresher = service_at(clock, Duration::from_secs(86_400));
        let token = issuer.issue_for(&UserId::new("u1"), "bob").unwrap();

        let err = refresher.refresh(&token).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::MissingIssuedAt));
    }

    #[test]
    fn refresh_rejects_forged_tokens() {
        let clock = Arc::new(ManualClock::at_unix(T0));
        let service = service_at(clock.clone(), Duration::from_secs(86_400));
        let other = builder()
            .signing_key("other key")
            .max_refresh(Duration::from_secs(86_400))
            .clock(clock)
            .build()
            .unwrap();
        let token = other.issue_for(&UserId::new("u1"), "bob").unwrap();

        let err = service.refresh(&token).unwrap_err();
        assert_eq!(
            err.rejection(),
            Some(&Rejection::Token(TokenError::BadSignature))
        );
    }
}
