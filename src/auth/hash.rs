//! Salted one-way secret hashing with constant-time verification.
//!
//! Stored hashes are self-contained: `<salt-hex>$<digest-hex>`. The salt is
//! generated fresh per call, so two hashes of the same secret never match;
//! verification re-derives the digest from the embedded salt.
//!
//! Hashing uses iterated SHA-256 (100k rounds) rather than an external KDF
//! crate, consistent with the rest of the crypto stack here.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Salt byte length before hex encoding.
const SALT_BYTES: usize = 16;

/// Number of SHA-256 iterations for key stretching.
const HASH_ITERATIONS: u32 = 100_000;

/// A well-formed hash that matches no real secret. Verifying against it
/// keeps the unknown-identity path doing the same amount of work as a
/// wrong-secret verification.
pub const DUMMY_HASH: &str =
    "00000000000000000000000000000000$0000000000000000000000000000000000000000000000000000000000000000";

/// Hash a plaintext secret under a fresh random salt.
///
/// Output embeds the salt, so it is the only value that needs storing.
pub fn hash_secret(secret: &str) -> String {
    let salt = generate_salt();
    let digest = derive(secret, &salt);
    format!("{salt}${digest}")
}

/// Verify a plaintext secret against a stored `salt$digest` value.
///
/// Runs in constant time with respect to where a digest mismatch occurs.
/// A malformed stored value verifies false.
pub fn verify_secret(secret: &str, stored: &str) -> bool {
    let Some((salt, digest)) = stored.split_once('$') else {
        return false;
    };
    let attempt = derive(secret, salt);
    constant_time_eq(attempt.as_bytes(), digest.as_bytes())
}

/// Generate a random salt (hex-encoded).
fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Derive the hex digest for a secret under a given salt using iterated SHA-256.
fn derive(secret: &str, salt: &str) -> String {
    let mut hash = Sha256::new();
    hash.update(salt.as_bytes());
    hash.update(secret.as_bytes());
    let mut result = hash.finalize();

    // Iterated hashing for key stretching
    for _ in 1..HASH_ITERATIONS {
        let mut h = Sha256::new();
        h.update(result);
        h.update(salt.as_bytes());
        result = h.finalize();
    }

    hex::encode(result)
}

/// Constant-time byte comparison to prevent timing attacks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
