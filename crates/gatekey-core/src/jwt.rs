//! Session JWT issuance and verification.
//!
//! Claims are `{id, iat, exp}` with `exp` fixed at issuance to `iat + 7
//! days`. Tokens are HS256-signed compact JWTs produced and checked by the
//! `jsonwebtoken` codec, keyed by the JWT secret. Nothing is persisted
//! server-side: a token is handed to the client at login and re-verified on
//! every request from its signature and `exp` alone.
//!
//! There is no revocation — a signed token stays valid until its natural
//! expiry. That is an acknowledged limitation of the design, not a gap.

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::JwtError;
use crate::secret::SecretStore;
use crate::time::unix_now;

/// Token lifetime in seconds (7 days).
pub const TOKEN_TTL_SECS: u64 = 604_800;

/// Signed claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id (the authenticated user).
    pub id: String,
    /// Issued-at, UNIX seconds.
    pub iat: u64,
    /// Expiry, UNIX seconds. Always `iat + 604800`.
    pub exp: u64,
}

/// Issues and verifies session JWTs against the shared secret store.
#[derive(Debug)]
pub struct JwtEngine {
    store: Arc<SecretStore>,
}

impl JwtEngine {
    #[must_use]
    pub fn new(store: Arc<SecretStore>) -> Self {
        Self { store }
    }

    /// Issue a token for the given subject, expiring in 7 days.
    ///
    /// # Errors
    ///
    /// - [`JwtError::InvalidSubject`] for an empty subject id.
    /// - [`JwtError::Secret`] if the JWT secret is unavailable.
    /// - [`JwtError::Sign`] if the codec fails to sign.
    pub fn issue(&self, subject_id: &str) -> Result<String, JwtError> {
        self.issue_at(subject_id, unix_now())
    }

    /// Verify a token's signature and expiry, returning its claims.
    ///
    /// # Errors
    ///
    /// - [`JwtError::Expired`] when `exp` has passed (leeway zero).
    /// - [`JwtError::SignatureMismatch`] for a wrong-key or tampered token.
    /// - [`JwtError::Malformed`] for anything that does not parse as a
    ///   compact JWT.
    /// - [`JwtError::Secret`] if the JWT secret is unavailable.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        if token.is_empty() {
            return Err(JwtError::Malformed {
                reason: "empty token".to_owned(),
            });
        }
        let secret = self.store.jwt_secret()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        ) {
            Ok(data) => Ok(data.claims),
            Err(e) => {
                let err = match e.kind() {
                    ErrorKind::ExpiredSignature => JwtError::Expired,
                    ErrorKind::InvalidSignature => JwtError::SignatureMismatch,
                    _ => JwtError::Malformed {
                        reason: e.to_string(),
                    },
                };
                debug!(error = %err, "jwt rejected");
                Err(err)
            }
        }
    }

    fn issue_at(&self, subject_id: &str, now: u64) -> Result<String, JwtError> {
        if subject_id.is_empty() {
            return Err(JwtError::InvalidSubject);
        }
        let secret = self.store.jwt_secret()?;
        let claims = Claims {
            id: subject_id.to_owned(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| JwtError::Sign {
            reason: e.to_string(),
        })?;
        debug!(subject = subject_id, iat = now, "jwt issued");
        Ok(token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn engine_with_secret(secret: &[u8]) -> (tempfile::TempDir, JwtEngine) {
        let dir = tempfile::tempdir().unwrap();
        let jwt_path = dir.path().join("jwt.txt");
        std::fs::write(&jwt_path, secret).unwrap();
        let store = Arc::new(SecretStore::new(dir.path().join("csrf.txt"), jwt_path));
        (dir, JwtEngine::new(store))
    }

    fn engine() -> (tempfile::TempDir, JwtEngine) {
        engine_with_secret(b"jwt-test-secret-material")
    }

    #[test]
    fn issue_then_verify_returns_claims() {
        let (_dir, engine) = engine();
        let token = engine.issue("42").unwrap();
        let claims = engine.verify(&token).unwrap();
        assert_eq!(claims.id, "42");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
    }

    #[test]
    fn empty_subject_is_rejected() {
        let (_dir, engine) = engine();
        assert!(matches!(engine.issue(""), Err(JwtError::InvalidSubject)));
    }

    #[test]
    fn expired_token_fails_as_expired_not_malformed() {
        let (_dir, engine) = engine();
        // Issued far enough in the past that exp is already behind us.
        let past = unix_now() - TOKEN_TTL_SECS - 3_600;
        let token = engine.issue_at("42", past).unwrap();
        assert!(matches!(engine.verify(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn wrong_secret_fails_as_signature_mismatch() {
        let (_dir, issuer) = engine_with_secret(b"issuing-secret");
        let (_dir2, verifier) = engine_with_secret(b"different-secret");
        let token = issuer.issue("42").unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(JwtError::SignatureMismatch)
        ));
    }

    #[test]
    fn tampered_payload_fails_as_signature_mismatch() {
        let (_dir, engine) = engine();
        let token = engine.issue("42").unwrap();
        // Flip one character inside the payload segment, keeping it valid
        // base64url so the failure is the signature, not the parse.
        let dot = token.find('.').unwrap();
        let idx = dot + 2;
        let mut bytes = token.into_bytes();
        bytes[idx] = if bytes[idx] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert!(matches!(
            engine.verify(&tampered),
            Err(JwtError::SignatureMismatch)
        ));
    }

    #[test]
    fn garbage_and_empty_tokens_are_malformed() {
        let (_dir, engine) = engine();
        let err = engine.verify("not-a-jwt").unwrap_err();
        assert!(matches!(err, JwtError::Malformed { .. }));
        // Display stays terse; the codec diagnostic is only behind the
        // accessor.
        assert_eq!(err.to_string(), "malformed jwt");
        assert!(err.reason().is_some_and(|r| !r.is_empty()));
        assert!(matches!(
            engine.verify(""),
            Err(JwtError::Malformed { .. })
        ));
    }

    #[test]
    fn missing_secret_surfaces_as_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SecretStore::new(
            dir.path().join("absent"),
            dir.path().join("absent"),
        ));
        let engine = JwtEngine::new(store);
        assert!(matches!(engine.issue("42"), Err(JwtError::Secret(_))));
    }
}
