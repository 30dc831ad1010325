//! Stateless anti-forgery (CSRF) tokens.
//!
//! A token is `nonce (32 bytes) || issued_at (8 bytes, big-endian UNIX
//! seconds) || mac (32 bytes)`, hex-encoded to a 144-character lowercase
//! string. The MAC is HMAC-SHA256 over `nonce || issued_at` keyed by the
//! CSRF secret, so the token carries its own proof of authenticity and
//! freshness: the server stores nothing between generate and validate and
//! needs no cleanup or eviction logic.
//!
//! # Security model
//!
//! - Nonces come from the OS CSPRNG; an RNG failure is fatal.
//! - Tokens expire 24 hours after issuance; future-dated tokens are rejected.
//! - MAC comparison uses `subtle::ConstantTimeEq` so timing never leaks how
//!   many leading bytes matched.
//! - There is no revocation: validity is a pure function of the token bytes,
//!   the secret, and the clock.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::CsrfError;
use crate::secret::SecretStore;
use crate::time::unix_now;

type HmacSha256 = Hmac<Sha256>;

/// Random nonce length in bytes.
pub const NONCE_LEN: usize = 32;

/// Big-endian timestamp length in bytes.
pub const TIMESTAMP_LEN: usize = 8;

/// HMAC-SHA256 output length in bytes.
pub const MAC_LEN: usize = 32;

/// Raw token length: nonce || timestamp || mac.
pub const RAW_LEN: usize = NONCE_LEN + TIMESTAMP_LEN + MAC_LEN;

/// Hex-encoded token length.
pub const HEX_LEN: usize = RAW_LEN * 2;

/// Validity window in seconds (24 hours). A token aged exactly this many
/// seconds is still valid.
pub const EXPIRY_SECS: u64 = 86_400;

/// Generates and validates CSRF tokens against the shared secret store.
#[derive(Debug)]
pub struct CsrfEngine {
    store: Arc<SecretStore>,
}

impl CsrfEngine {
    #[must_use]
    pub fn new(store: Arc<SecretStore>) -> Self {
        Self { store }
    }

    /// Generate a fresh token for the current clock.
    ///
    /// # Errors
    ///
    /// - [`CsrfError::RandomSource`] if the OS CSPRNG cannot supply bytes.
    /// - [`CsrfError::Secret`] if the CSRF secret is unavailable.
    pub fn generate(&self) -> Result<String, CsrfError> {
        self.generate_at(unix_now())
    }

    /// Validate a token against the current clock.
    ///
    /// # Errors
    ///
    /// - [`CsrfError::InvalidToken`] for empty, wrong-length, or non-hex
    ///   input — rejected before any decoding.
    /// - [`CsrfError::FutureTimestamp`] / [`CsrfError::Expired`] for tokens
    ///   outside the validity window.
    /// - [`CsrfError::MacMismatch`] for tampered or wrong-key tokens.
    /// - [`CsrfError::Secret`] if the CSRF secret is unavailable.
    pub fn validate(&self, token: &str) -> Result<(), CsrfError> {
        self.validate_at(token, unix_now())
    }

    fn generate_at(&self, now: u64) -> Result<String, CsrfError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| CsrfError::RandomSource {
                reason: e.to_string(),
            })?;
        let issued_at = now.to_be_bytes();

        let secret = self.store.csrf_secret()?;
        let mac = compute_mac(secret.as_bytes(), &nonce, &issued_at)?;

        let mut raw = [0u8; RAW_LEN];
        raw[..NONCE_LEN].copy_from_slice(&nonce);
        raw[NONCE_LEN..NONCE_LEN + TIMESTAMP_LEN].copy_from_slice(&issued_at);
        raw[NONCE_LEN + TIMESTAMP_LEN..].copy_from_slice(&mac);

        debug!(issued_at = now, "csrf token generated");
        Ok(hex::encode(raw))
    }

    fn validate_at(&self, token: &str, now: u64) -> Result<(), CsrfError> {
        if token.is_empty() {
            return Err(CsrfError::InvalidToken {
                reason: "empty token",
            });
        }
        if token.len() != HEX_LEN {
            return Err(CsrfError::InvalidToken {
                reason: "wrong length",
            });
        }
        // Any non-hex character rejects the whole token. No sanitization
        // pass, no partial decode.
        if !token.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CsrfError::InvalidToken {
                reason: "non-hex character",
            });
        }
        let raw = hex::decode(token).map_err(|_| CsrfError::InvalidToken {
            reason: "hex decode failed",
        })?;

        let (nonce, rest) = raw.split_at(NONCE_LEN);
        let (ts_bytes, mac) = rest.split_at(TIMESTAMP_LEN);
        let mut ts = [0u8; TIMESTAMP_LEN];
        ts.copy_from_slice(ts_bytes);
        let issued_at = u64::from_be_bytes(ts);

        if issued_at > now {
            debug!(issued_at, now, "csrf token rejected: future timestamp");
            return Err(CsrfError::FutureTimestamp { issued_at, now });
        }
        if now - issued_at > EXPIRY_SECS {
            debug!(issued_at, now, "csrf token rejected: expired");
            return Err(CsrfError::Expired { issued_at, now });
        }

        let secret = self.store.csrf_secret()?;
        let expected = compute_mac(secret.as_bytes(), nonce, ts_bytes)?;

        if bool::from(mac.ct_eq(&expected)) {
            Ok(())
        } else {
            debug!("csrf token rejected: mac mismatch");
            Err(CsrfError::MacMismatch)
        }
    }
}

/// HMAC-SHA256 over `nonce || issued_at` with the given key.
fn compute_mac(key: &[u8], nonce: &[u8], issued_at: &[u8]) -> Result<[u8; MAC_LEN], CsrfError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| CsrfError::Mac {
        reason: e.to_string(),
    })?;
    mac.update(nonce);
    mac.update(issued_at);
    Ok(mac.finalize().into_bytes().into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const SECRET: &[u8] = b"csrf-test-secret-material";

    fn engine() -> (tempfile::TempDir, CsrfEngine) {
        let dir = tempfile::tempdir().unwrap();
        let csrf_path = dir.path().join("csrf.txt");
        std::fs::write(&csrf_path, SECRET).unwrap();
        let store = Arc::new(SecretStore::new(csrf_path, dir.path().join("jwt.txt")));
        (dir, CsrfEngine::new(store))
    }

    /// Build a well-formed token with a chosen timestamp, signed with the
    /// test secret.
    fn forge(issued_at: u64) -> String {
        let nonce = [0xabu8; NONCE_LEN];
        let ts = issued_at.to_be_bytes();
        let mac = compute_mac(SECRET, &nonce, &ts).unwrap();
        let mut raw = [0u8; RAW_LEN];
        raw[..NONCE_LEN].copy_from_slice(&nonce);
        raw[NONCE_LEN..NONCE_LEN + TIMESTAMP_LEN].copy_from_slice(&ts);
        raw[NONCE_LEN + TIMESTAMP_LEN..].copy_from_slice(&mac);
        hex::encode(raw)
    }

    #[test]
    fn generate_then_validate_succeeds() {
        let (_dir, engine) = engine();
        let token = engine.generate().unwrap();
        engine.validate(&token).unwrap();
    }

    #[test]
    fn token_is_144_lowercase_hex() {
        let (_dir, engine) = engine();
        let token = engine.generate().unwrap();
        assert_eq!(token.len(), HEX_LEN);
        assert!(token.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(token, token.to_lowercase());
    }

    #[test]
    fn tokens_are_unique() {
        let (_dir, engine) = engine();
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(engine.generate().unwrap()));
        }
    }

    #[test]
    fn uppercase_hex_input_is_accepted() {
        let (_dir, engine) = engine();
        let token = engine.generate().unwrap().to_uppercase();
        engine.validate(&token).unwrap();
    }

    #[test]
    fn empty_wrong_length_and_non_hex_are_invalid() {
        let (_dir, engine) = engine();
        assert!(matches!(
            engine.validate(""),
            Err(CsrfError::InvalidToken { .. })
        ));
        assert!(matches!(
            engine.validate(&"a".repeat(HEX_LEN - 1)),
            Err(CsrfError::InvalidToken { .. })
        ));
        assert!(matches!(
            engine.validate(&"a".repeat(HEX_LEN + 1)),
            Err(CsrfError::InvalidToken { .. })
        ));
        let mut bad = "a".repeat(HEX_LEN);
        bad.replace_range(10..11, "g");
        assert!(matches!(
            engine.validate(&bad),
            Err(CsrfError::InvalidToken { .. })
        ));
    }

    #[test]
    fn expiry_boundary_is_exactly_24_hours() {
        let (_dir, engine) = engine();
        let now = 2_000_000_000;
        assert!(matches!(
            engine.validate_at(&forge(now - EXPIRY_SECS - 1), now),
            Err(CsrfError::Expired { .. })
        ));
        // One second inside the window, and the exact boundary, both pass.
        engine.validate_at(&forge(now - EXPIRY_SECS + 1), now).unwrap();
        engine.validate_at(&forge(now - EXPIRY_SECS), now).unwrap();
    }

    #[test]
    fn future_timestamp_is_rejected() {
        let (_dir, engine) = engine();
        let now = 2_000_000_000;
        assert!(matches!(
            engine.validate_at(&forge(now + 1), now),
            Err(CsrfError::FutureTimestamp { .. })
        ));
    }

    #[test]
    fn expired_is_not_reported_as_mac_mismatch() {
        // Freshness is checked before the MAC, so an expired token with a
        // garbage MAC still reports Expired.
        let (_dir, engine) = engine();
        let now = 2_000_000_000;
        let mut token = forge(now - EXPIRY_SECS - 100);
        let flipped = flip_hex_char(token.as_bytes()[HEX_LEN - 1]);
        token.replace_range(HEX_LEN - 1..HEX_LEN, &flipped.to_string());
        assert!(matches!(
            engine.validate_at(&token, now),
            Err(CsrfError::Expired { .. })
        ));
    }

    fn flip_hex_char(c: u8) -> char {
        if c == b'0' { '1' } else { '0' }
    }

    #[test]
    fn tampered_mac_region_fails() {
        let (_dir, engine) = engine();
        let token = engine.generate().unwrap();
        // Flip each hex character in the MAC region in turn.
        let mac_start = (NONCE_LEN + TIMESTAMP_LEN) * 2;
        for i in [mac_start, mac_start + 31, HEX_LEN - 1] {
            let mut tampered = token.clone();
            let flipped = flip_hex_char(token.as_bytes()[i]);
            tampered.replace_range(i..=i, &flipped.to_string());
            assert!(
                matches!(engine.validate(&tampered), Err(CsrfError::MacMismatch)),
                "flip at {i} did not fail"
            );
        }
    }

    #[test]
    fn tampered_nonce_region_fails() {
        let (_dir, engine) = engine();
        let token = engine.generate().unwrap();
        let mut tampered = token.clone();
        let flipped = flip_hex_char(token.as_bytes()[0]);
        tampered.replace_range(0..1, &flipped.to_string());
        assert!(matches!(
            engine.validate(&tampered),
            Err(CsrfError::MacMismatch)
        ));
    }

    #[test]
    fn wrong_secret_fails_as_mac_mismatch() {
        let (_dir, engine) = engine();
        let token = engine.generate().unwrap();

        let dir2 = tempfile::tempdir().unwrap();
        let other_path = dir2.path().join("csrf.txt");
        std::fs::write(&other_path, b"a-different-secret").unwrap();
        let other = CsrfEngine::new(Arc::new(SecretStore::new(
            other_path,
            dir2.path().join("jwt.txt"),
        )));
        assert!(matches!(other.validate(&token), Err(CsrfError::MacMismatch)));
    }

    #[test]
    fn missing_secret_surfaces_as_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SecretStore::new(
            dir.path().join("absent"),
            dir.path().join("absent"),
        ));
        let engine = CsrfEngine::new(store);
        assert!(matches!(engine.generate(), Err(CsrfError::Secret(_))));
    }
}
