//! Strategies for turning plaintext passwords into stored `userPassword` values.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

const SSHA256_PREFIX: &str = "{SSHA256}";
const SALT_LEN: usize = 8;

/// One-way transformation applied to employee passwords before they are sent to the server.
pub trait CredentialHasher: Send + Sync {
    /// Short scheme name used in logs.
    fn scheme(&self) -> &'static str;

    /// Hashes `password` into the value stored in `userPassword`.
    fn hash(&self, password: &str) -> String;

    /// Returns true if `stored` was produced from `password` by this scheme.
    fn verify(&self, password: &str, stored: &str) -> bool;
}

/// Unsalted, single-round SHA-256 rendered as lowercase hex.
///
/// This is weak against precomputed-table attacks. It is the default only so entries stay
/// compatible with directories populated by earlier tooling; prefer [`SaltedSha256`] for new
/// deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hex;

impl CredentialHasher for Sha256Hex {
    fn scheme(&self) -> &'static str {
        "sha256-hex"
    }

    fn hash(&self, password: &str) -> String {
        hex::encode(Sha256::digest(password.as_bytes()))
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        self.hash(password).eq_ignore_ascii_case(stored)
    }
}

/// Salted SHA-256 in the `{SSHA256}` userPassword format understood by common directory
/// servers: `base64(sha256(password || salt) || salt)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaltedSha256;

impl SaltedSha256 {
    fn digest_with_salt(password: &str, salt: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        hasher.update(salt);
        let mut out = hasher.finalize().to_vec();
        out.extend_from_slice(salt);
        out
    }
}

impl CredentialHasher for SaltedSha256 {
    fn scheme(&self) -> &'static str {
        "ssha256"
    }

    fn hash(&self, password: &str) -> String {
        let salt = rand::random::<[u8; SALT_LEN]>();
        let encoded = STANDARD.encode(Self::digest_with_salt(password, &salt));
        format!("{SSHA256_PREFIX}{encoded}")
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        let Some(encoded) = stored.strip_prefix(SSHA256_PREFIX) else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded) else {
            return false;
        };
        // SHA-256 output is 32 bytes; whatever follows is the salt.
        if decoded.len() <= 32 {
            return false;
        }

        let salt = &decoded[32..];
        Self::digest_with_salt(password, salt) == decoded
    }
}
