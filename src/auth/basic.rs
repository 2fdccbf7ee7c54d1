//! HTTP Basic Authentication header decoding and credential verification.
//!
//! Every decode or verification failure collapses into a single
//! [`AuthError::Unauthenticated`] so callers cannot tell a bad password from
//! an unknown name, a malformed header, or a missing one. Store failures are
//! the exception: those propagate and surface as internal errors.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use super::hash;
use super::store::{CredentialStore, Identity, StoreError};

/// Credentials extracted from an `Authorization` header. Never persisted;
/// consumed by the authenticator and dropped with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub name: String,
    pub secret: String,
}

/// Authentication outcome errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Any credential failure: missing/malformed header, unknown name, or
    /// secret mismatch. One message for all of them.
    #[error("invalid credentials")]
    Unauthenticated,
    /// The credential store itself failed; not an authentication verdict.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Parse an `Authorization: Basic <base64(name:secret)>` header value.
///
/// The payload is split at the *first* colon, since secrets may themselves
/// contain colons. Returns `None` on any malformation.
pub fn parse_basic_header(value: &str) -> Option<BasicCredentials> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (name, secret) = text.split_once(':')?;
    Some(BasicCredentials {
        name: name.to_string(),
        secret: secret.to_string(),
    })
}

/// Checks presented credentials against the store. Stateless: every call
/// re-authenticates from scratch.
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Authenticate a raw `Authorization` header value (or its absence).
    ///
    /// On success returns the stored [`Identity`]; the same header always
    /// yields the same identity.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        let credentials = header
            .and_then(parse_basic_header)
            .ok_or(AuthError::Unauthenticated)?;

        match self.store.lookup(credentials.name.trim())? {
            Some(record) => {
                if hash::verify_secret(&credentials.secret, &record.secret_hash) {
                    Ok(record.identity)
                } else {
                    Err(AuthError::Unauthenticated)
                }
            }
            None => {
                // Dummy verification so an unknown name costs the same as a
                // wrong secret.
                let _ = hash::verify_secret(&credentials.secret, hash::DUMMY_HASH);
                Err(AuthError::Unauthenticated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryCredentialStore;

    fn basic_header(name: &str, secret: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{name}:{secret}")))
    }

    fn authenticator_with(name: &str, secret: &str) -> Authenticator {
        let store = Arc::new(MemoryCredentialStore::new());
        store.insert(name, &hash::hash_secret(secret)).unwrap();
        Authenticator::new(store)
    }

    #[test]
    fn parse_valid_header() {
        let creds = parse_basic_header(&basic_header("ana", "s3cr3t")).unwrap();
        assert_eq!(creds.name, "ana");
        assert_eq!(creds.secret, "s3cr3t");
    }

    #[test]
    fn parse_splits_at_first_colon() {
        let creds = parse_basic_header(&basic_header("ana", "se:cr:et")).unwrap();
        assert_eq!(creds.name, "ana");
        assert_eq!(creds.secret, "se:cr:et");
    }

    #[test]
    fn parse_rejects_wrong_scheme() {
        assert!(parse_basic_header("Bearer abc123").is_none());
        let payload = STANDARD.encode("ana:s3cr3t");
        assert!(parse_basic_header(&format!("basic {payload}")).is_none());
    }

    #[test]
    fn parse_rejects_bad_base64() {
        assert!(parse_basic_header("Basic !!!not-base64!!!").is_none());
    }

    #[test]
    fn parse_rejects_non_utf8_payload() {
        let header = format!("Basic {}", STANDARD.encode([0xffu8, 0xfe, 0xfd]));
        assert!(parse_basic_header(&header).is_none());
    }

    #[test]
    fn parse_rejects_missing_colon() {
        let header = format!("Basic {}", STANDARD.encode("no-colon-here"));
        assert!(parse_basic_header(&header).is_none());
    }

    #[test]
    fn authenticate_success_is_idempotent() {
        let auth = authenticator_with("ana", "s3cr3t");
        let header = basic_header("ana", "s3cr3t");

        let first = auth.authenticate(Some(&header)).unwrap();
        let second = auth.authenticate(Some(&header)).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.name, "ana");
    }

    #[test]
    fn authenticate_wrong_secret_fails() {
        let auth = authenticator_with("ana", "s3cr3t");
        let err = auth.authenticate(Some(&basic_header("ana", "wrong"))).unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[test]
    fn authenticate_unknown_name_matches_wrong_secret_failure() {
        let auth = authenticator_with("ana", "s3cr3t");

        let unknown = auth.authenticate(Some(&basic_header("ghost", "s3cr3t")));
        let wrong = auth.authenticate(Some(&basic_header("ana", "wrong")));

        // Indistinguishable outcomes
        assert_eq!(
            unknown.unwrap_err().to_string(),
            wrong.unwrap_err().to_string()
        );
    }

    #[test]
    fn authenticate_missing_header_fails() {
        let auth = authenticator_with("ana", "s3cr3t");
        assert!(matches!(
            auth.authenticate(None).unwrap_err(),
            AuthError::Unauthenticated
        ));
    }

    #[test]
    fn authenticate_malformed_headers_fail_without_panic() {
        let auth = authenticator_with("ana", "s3cr3t");
        for header in ["", "Basic", "Basic ", "Basic %%%", "Digest abc", "Basic bm8tY29sb24="] {
            assert!(
                matches!(
                    auth.authenticate(Some(header)).unwrap_err(),
                    AuthError::Unauthenticated
                ),
                "header {header:?} should be rejected"
            );
        }
    }
}
