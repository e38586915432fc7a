//! Handshake primitives (spec §4.3): cookie, salt, digest, constant-time
//! compare.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Size in bytes of the pool's long-lived shared secret.
pub const COOKIE_SIZE: usize = 32;
/// Size in bytes of a fresh per-connection salt.
pub const SALT_SIZE: usize = 16;

/// The pool's long-lived shared secret. Never leaves the parent process
/// except as a digest.
#[derive(Clone)]
pub struct Cookie(pub [u8; COOKIE_SIZE]);

impl Cookie {
    /// Generate a fresh cryptographically random cookie.
    pub fn generate() -> Self {
        let mut bytes = [0u8; COOKIE_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl AsRef<[u8]> for Cookie {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A fresh per-connection random salt, chosen by the child.
#[derive(Clone)]
pub struct Salt(pub Vec<u8>);

impl Salt {
    /// Generate a fresh cryptographically random salt.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

/// A per-spawn opaque token binding a child's socket connection back to its
/// process record: 128 bits of randomness, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(pub String);

impl Identity {
    /// Generate a fresh identity, unique with overwhelming probability
    /// across the pool's lifetime.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `H(salt ‖ cookie)`, the fixed project-wide hash function (spec §4.3).
pub fn digest(salt: &[u8], cookie: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(cookie);
    hasher.finalize().to_vec()
}

/// Constant-time byte-slice equality.
///
/// Written by hand rather than pulled in as a dependency: it is five lines,
/// and nothing else in this codebase's lineage reaches for a
/// constant-time-compare crate the way it reaches for one for logging,
/// serialization, or randomness. Unequal lengths short-circuit (length is
/// not secret here: both sides know the digest size up front).
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn ct_eq_matches_equal_slices() {
        assert!(ct_eq(b"abcd", b"abcd"));
    }

    #[test]
    fn ct_eq_rejects_different_slices() {
        assert!(!ct_eq(b"abcd", b"abce"));
        assert!(!ct_eq(b"abcd", b"abc"));
    }

    #[test]
    fn digest_is_deterministic_and_cookie_sensitive() {
        let salt = b"some-salt";
        let cookie_a = Cookie::generate();
        let cookie_b = Cookie::generate();

        assert_eq!(digest(salt, cookie_a.as_ref()), digest(salt, cookie_a.as_ref()));
        assert_ne!(digest(salt, cookie_a.as_ref()), digest(salt, cookie_b.as_ref()));
    }
}
