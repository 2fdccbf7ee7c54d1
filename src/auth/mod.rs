//! Identity registration and HTTP Basic Authentication.
//!
//! Provides:
//! - Registration of name/secret pairs (salted iterated SHA-256, 100k rounds)
//! - `Authorization: Basic` header decoding and verification
//! - Credential storage behind an injectable trait (SQLite or in-memory)
//!
//! ## Design Decisions
//! - No session or token issuance: every request re-authenticates from its
//!   own header, so there is nothing server-side to expire or revoke.
//! - Secret hashing uses iterated SHA-256 + per-record salt via the existing
//!   `sha2` crate; the salt is embedded in the stored hash string.
//! - An unknown name still pays for a hash verification (against a fixed
//!   dummy hash) so its timing matches a wrong-secret failure.

pub mod basic;
pub mod hash;
pub mod store;

use thiserror::Error;

pub use basic::{AuthError, Authenticator, BasicCredentials};
pub use store::{CredentialStore, Identity, StoreError};

/// Maximum accepted identity name length, in characters.
const MAX_NAME_LEN: usize = 64;

/// Registration failures, ordered by how the boundary reports them.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// Missing/empty/oversize input; safe to echo back to the caller.
    #[error("{0}")]
    BadInput(&'static str),
    /// The name is taken. The existing record is untouched.
    #[error("name '{0}' is already registered")]
    Conflict(String),
    /// Storage failure; callers report a generic internal error.
    #[error(transparent)]
    Store(StoreError),
}

/// Register a new identity: validate, hash the secret, insert.
///
/// The name is trimmed before validation and storage; the secret is taken
/// as-is. No authentication is required: this is the enrollment path.
pub fn register(
    store: &dyn CredentialStore,
    name: &str,
    secret: &str,
) -> Result<Identity, RegisterError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RegisterError::BadInput("'name' must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(RegisterError::BadInput("'name' too long (max 64 characters)"));
    }
    if secret.is_empty() {
        return Err(RegisterError::BadInput("'secret' must not be empty"));
    }

    let secret_hash = hash::hash_secret(secret);
    match store.insert(name, &secret_hash) {
        Ok(identity) => {
            tracing::info!(name = %identity.name, id = %identity.id, "identity registered");
            Ok(identity)
        }
        Err(StoreError::AlreadyExists) => Err(RegisterError::Conflict(name.to_string())),
        Err(e) => Err(RegisterError::Store(e)),
    }
}
