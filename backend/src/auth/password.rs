//! Password digests for stored credentials.
//!
//! The legacy format is 80 lowercase hex characters: a 40-character nonce
//! followed by `sha1(SALT + password + nonce)`. The nonce itself is
//! `sha1(SALT + timestamp)`, so the salt travels inside the digest and two
//! derivations of the same password never match. Digests written with the
//! Argon2id scheme are PHC strings and carry their own `$argon2id$` tag; anything
//! without a `$` prefix is treated as legacy.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{SecondsFormat, Utc};
use sha1::{Digest, Sha1};
use thiserror::Error;

const LEGACY_SALT: &str = "fZJ9MYnzeaW7q3DY";
const NONCE_LEN: usize = 40;
const LEGACY_DIGEST_LEN: usize = 2 * NONCE_LEN;
const PHC_PREFIX: char = '$';

// Keeps nonces distinct when two derivations land on the same clock tick.
static NONCE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("unknown password scheme: {0}")]
    UnknownScheme(String),
}

/// Scheme used for newly derived digests. Verification accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordScheme {
    #[default]
    LegacySha1,
    Argon2id,
}

impl PasswordScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LegacySha1 => "legacy-sha1",
            Self::Argon2id => "argon2id",
        }
    }
}

impl fmt::Display for PasswordScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PasswordScheme {
    type Err = PasswordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy-sha1" | "legacy" | "sha1" => Ok(Self::LegacySha1),
            "argon2id" | "argon2" => Ok(Self::Argon2id),
            other => Err(PasswordError::UnknownScheme(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher {
    scheme: PasswordScheme,
}

impl PasswordHasher {
    pub fn new(scheme: PasswordScheme) -> Self {
        Self { scheme }
    }

    pub fn derive(&self, plaintext: &str) -> Result<String, PasswordError> {
        match self.scheme {
            PasswordScheme::LegacySha1 => Ok(derive_legacy(plaintext)),
            PasswordScheme::Argon2id => derive_argon2(plaintext),
        }
    }

    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        verify_password(plaintext, digest)
    }
}

/// Checks `plaintext` against a stored digest of either scheme.
///
/// Malformed digests, including ones shorter than 80 characters, return `false`.
pub fn verify_password(plaintext: &str, digest: &str) -> bool {
    if digest.starts_with(PHC_PREFIX) {
        verify_argon2(plaintext, digest)
    } else {
        verify_legacy(plaintext, digest)
    }
}

pub fn derive_legacy(plaintext: &str) -> String {
    let nonce = legacy_nonce();
    let hash = salted_sha1(&format!("{plaintext}{nonce}"));
    format!("{nonce}{hash}")
}

fn legacy_nonce() -> String {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
    let seq = NONCE_SEQ.fetch_add(1, Ordering::Relaxed);
    salted_sha1(&format!("{now} #{seq}"))
}

fn salted_sha1(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(LEGACY_SALT.as_bytes());
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

fn verify_legacy(plaintext: &str, digest: &str) -> bool {
    if digest.len() < LEGACY_DIGEST_LEN {
        return false;
    }
    // `get` rather than indexing: a non-ASCII digest must not panic on a char boundary.
    let (Some(nonce), Some(expected)) = (digest.get(..NONCE_LEN), digest.get(NONCE_LEN..)) else {
        return false;
    };

    salted_sha1(&format!("{plaintext}{nonce}")) == expected
}

fn derive_argon2(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| PasswordError::Hashing(err.to_string()))
}

fn verify_argon2(plaintext: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Digests produced by the system this scheme has to stay compatible with.
    const KNOWN_DIGESTS: &[(&str, &str, bool)] = &[
        ("qweww", "278924da841f2cd2c494a5f39b108836d75d6ef0aea0cec7aa90a9a85a90a7ace23386e0559b577f", true),
        ("thegoodsareinthesky", "ca5906835b8093baf5555b9f5a3d36227e0bc241b44dd646561d490fd7d3e2fcbd834ac3c96bfc6f", true),
        ("thegoodsareinthesky", "fb6c1037cbfba8a6c1bb86536b47b610a716effdb9a89c8d539bc0e24c298f90678fcf4b61738a0f", true),
        ("cup", "f448c50b601715bdd6ea82697eee179cbe868eae5d61bdca4f05307590045dbd6bfd00b4c5ac5a5a", true),
        ("cup", "a6b1a073df090c96f7f2bc6b378f5fbff733c06566a82eb66a495402dabdb20448d1bb8fbac3518c", true),
        ("lampara", "7695107cda051605aa7d4f24b63d70e444674d5c810fd5d2ed5e4dadd7219da4fe8f4bb12ccab582", true),
        ("lampara", "0739f17cefeaa5c98bc1b6f754b94f9a0e2e1360d572fa402fd6190b66d226a8e4fe628088b98f9a", true),
        ("lampara", "12359af317b844d87b7864f8cb1bd750773a7a163ca7027274c39595ace5e147c3242e499079c326", false),
        ("Santo Niño de Cebú", "2fba7e078a17f87c69df4288d0878cedf53baaee5b3295022f147afecf83b84376b5c28b54622767", true),
        ("Santo Niño de Cebú", "5e17359c5e55ce31dd663a5abf374a4edf63170090e387e6689ebe9076ed8ea73266c61d0111b2ad", true),
        ("Santo Niño de Cebú", "1234c492489b9663b1a5a5e8d8b3d5236686738ab4cfdf890e9f8b34bb65788e826edc5776fb2af8", false),
        ("большинства", "696fe0c215062b8c35ea150d7179bf518633ad9fd1808e6eb000ae7c819ada841b53325a15361d16", true),
        ("большинства", "d71ecdf956d61300ec56aa47ef1caaf2e628807203639e4931beb9f0f66103fbe9f976f427bea93c", true),
        ("большинства", "c6e9af267843bc01ccfa76b959d502da6c8e84698fc7c675bed6c528b2648b4b6e0a469dba79fa77", false),
    ];

    #[test]
    fn known_legacy_digests() {
        for (plaintext, digest, expected) in KNOWN_DIGESTS {
            assert_eq!(
                verify_password(plaintext, digest),
                *expected,
                "{plaintext} against {digest}"
            );
        }
    }

    #[test]
    fn legacy_derive_then_verify() {
        for plaintext in ["", "hunter2", "Santo Niño de Cebú", "большинства"] {
            let digest = derive_legacy(plaintext);
            assert_eq!(digest.len(), LEGACY_DIGEST_LEN);
            assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
            assert!(verify_password(plaintext, &digest));
        }
    }

    #[test]
    fn legacy_rejects_other_password() {
        let digest = derive_legacy("correct horse");
        assert!(!verify_password("correct horse ", &digest));
        assert!(!verify_password("Correct horse", &digest));
    }

    #[test]
    fn legacy_derivations_differ() {
        let first = derive_legacy("cup");
        let second = derive_legacy("cup");
        assert_ne!(first, second);
        assert!(verify_password("cup", &first));
        assert!(verify_password("cup", &second));
    }

    #[test]
    fn malformed_digests_fail_cleanly() {
        let full = derive_legacy("cup");
        assert!(!verify_password("cup", ""));
        assert!(!verify_password("cup", &full[..40]));
        assert!(!verify_password("cup", &full[..79]));
        assert!(!verify_password("cup", &format!("{full}00")));
        // 39 ASCII bytes then a 2-byte char straddling the nonce boundary.
        let straddling = format!("{}é{}", "a".repeat(39), "b".repeat(40));
        assert!(!verify_password("cup", &straddling));
        assert!(!verify_password("cup", "$argon2id$not-a-phc-string"));
    }

    #[test]
    fn argon2_derive_then_verify() {
        let hasher = PasswordHasher::new(PasswordScheme::Argon2id);
        let digest = hasher.derive("hunter2").unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify("hunter2", &digest));
        assert!(!hasher.verify("hunter3", &digest));
    }

    #[test]
    fn hasher_verifies_either_scheme() {
        let legacy = PasswordHasher::default();
        let modern = PasswordHasher::new(PasswordScheme::Argon2id);
        let legacy_digest = legacy.derive("cup").unwrap();
        let modern_digest = modern.derive("cup").unwrap();
        assert!(modern.verify("cup", &legacy_digest));
        assert!(legacy.verify("cup", &modern_digest));
    }

    #[test]
    fn scheme_names_parse() {
        assert_eq!("legacy-sha1".parse::<PasswordScheme>().unwrap(), PasswordScheme::LegacySha1);
        assert_eq!("Argon2id".parse::<PasswordScheme>().unwrap(), PasswordScheme::Argon2id);
        assert!("bcrypt".parse::<PasswordScheme>().is_err());
        assert_eq!(PasswordScheme::Argon2id.to_string(), "argon2id");
    }
}
