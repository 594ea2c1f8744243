//! Bearer token codec.
//!
//! Tokens are compact JWS strings (`header.payload.signature`, base64url) signed
//! with an HMAC key. Decoding only accepts the configured algorithm and reports
//! structural, signature and expiry failures as distinct errors.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use super::models::TokenClaims;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningAlgorithm {
    #[default]
    Hs256,
    Hs384,
    Hs512,
}

impl SigningAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }

    fn as_jwt(self) -> Algorithm {
        match self {
            Self::Hs256 => Algorithm::HS256,
            Self::Hs384 => Algorithm::HS384,
            Self::Hs512 => Algorithm::HS512,
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unsupported signing algorithm: {0}")]
pub struct UnsupportedAlgorithm(pub String);

impl FromStr for SigningAlgorithm {
    type Err = UnsupportedAlgorithm;

    // Identifiers are case-sensitive, as in the JOSE registry.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            other => Err(UnsupportedAlgorithm(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Wrong segment count, bad base64, or a payload that is not valid claims.
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token signed with {found}, expected {expected}")]
    AlgorithmMismatch { expected: String, found: String },

    #[error("token expired")]
    Expired,

    #[error("token signing failed: {0}")]
    Signing(String),
}

pub struct TokenCodec {
    algorithm: SigningAlgorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(algorithm: SigningAlgorithm, key: &[u8]) -> Self {
        // Expiry is checked against the injected clock in `decode`, not by the library.
        let mut validation = Validation::new(algorithm.as_jwt());
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Self {
            algorithm,
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
        }
    }

    pub fn encode(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(self.algorithm.as_jwt()), claims, &self.encoding)
            .map_err(|err| TokenError::Signing(err.to_string()))
    }

    /// Verifies structure, algorithm and signature. `exp` is not looked at, so
    /// an expired but authentic token decodes successfully.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let header = jsonwebtoken::decode_header(token).map_err(classify)?;
        if header.alg != self.algorithm.as_jwt() {
            return Err(TokenError::AlgorithmMismatch {
                expected: self.algorithm.as_str().to_string(),
                found: format!("{:?}", header.alg),
            });
        }

        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(classify)
    }

    /// Full decode: `verify` plus expiry against `now` (Unix seconds). A token
    /// is expired from the second named by its `exp` onwards.
    pub fn decode(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let claims = self.verify(token)?;
        if now >= claims.expires_at {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::BadSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapters::UserId;
    use serde_json::Map;

    const KEY: &[u8] = b"secret key";
    // base64url of {"alg":"none","typ":"JWT"}
    const NONE_HEADER: &str = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";

    fn claims(exp: i64) -> TokenClaims {
        TokenClaims {
            id: UserId::new("5571b3d1"),
            username: "alice".to_string(),
            expires_at: exp,
            issued_at: Some(exp - 3600),
            extra: Map::new(),
        }
    }

    #[test]
    fn encode_then_decode() {
        let codec = TokenCodec::new(SigningAlgorithm::Hs256, KEY);
        let token = codec.encode(&claims(2_000)).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let decoded = codec.decode(&token, 1_000).unwrap();
        assert_eq!(decoded, claims(2_000));
    }

    #[test]
    fn expired_token_is_rejected_by_decode_but_not_verify() {
        let codec = TokenCodec::new(SigningAlgorithm::Hs256, KEY);
        let token = codec.encode(&claims(2_000)).unwrap();

        assert_eq!(codec.decode(&token, 2_000), Err(TokenError::Expired));
        assert_eq!(codec.decode(&token, 5_000), Err(TokenError::Expired));
        assert!(codec.verify(&token).is_ok());
    }

    #[test]
    fn other_key_is_a_signature_mismatch() {
        let ours = TokenCodec::new(SigningAlgorithm::Hs256, KEY);
        let theirs = TokenCodec::new(SigningAlgorithm::Hs256, b"another key");
        let token = theirs.encode(&claims(2_000)).unwrap();

        assert_eq!(ours.decode(&token, 1_000), Err(TokenError::BadSignature));
    }

    #[test]
    fn spliced_payload_is_a_signature_mismatch() {
        let codec = TokenCodec::new(SigningAlgorithm::Hs256, KEY);
        let original = codec.encode(&claims(2_000)).unwrap();
        let mut forged_claims = claims(2_000);
        forged_claims.username = "admin".to_string();
        let forged = codec.encode(&forged_claims).unwrap();

        let parts: Vec<&str> = original.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        let spliced = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(codec.verify(&spliced), Err(TokenError::BadSignature));
    }

    #[test]
    fn algorithm_must_match_exactly() {
        let hs256 = TokenCodec::new(SigningAlgorithm::Hs256, KEY);
        let hs512 = TokenCodec::new(SigningAlgorithm::Hs512, KEY);
        let token = hs512.encode(&claims(2_000)).unwrap();

        match hs256.verify(&token) {
            Err(TokenError::AlgorithmMismatch { expected, found }) => {
                assert_eq!(expected, "HS256");
                assert_eq!(found, "HS512");
            }
            other => panic!("expected algorithm mismatch, got {other:?}"),
        }
    }

    #[test]
    fn unsigned_tokens_are_malformed() {
        let codec = TokenCodec::new(SigningAlgorithm::Hs256, KEY);
        let token = codec.encode(&claims(2_000)).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let unsigned = format!("{NONE_HEADER}.{payload}.");

        assert!(matches!(codec.verify(&unsigned), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn structural_garbage_is_malformed() {
        let codec = TokenCodec::new(SigningAlgorithm::Hs256, KEY);
        for token in ["", "abc", "a.b", "not.a.token", "a.b.c.d"] {
            assert!(
                matches!(codec.verify(token), Err(TokenError::Malformed(_))),
                "{token:?}"
            );
        }
    }

    #[test]
    fn algorithm_names_parse() {
        assert_eq!("HS384".parse::<SigningAlgorithm>().unwrap(), SigningAlgorithm::Hs384);
        assert!("hs256".parse::<SigningAlgorithm>().is_err());
        assert!("RS256".parse::<SigningAlgorithm>().is_err());
        assert_eq!(SigningAlgorithm::default().to_string(), "HS256");
    }
}
