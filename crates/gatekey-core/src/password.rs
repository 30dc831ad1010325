//! Password credential hashing and verification.
//!
//! Two record encodings coexist behind one tagged type:
//!
//! - **PBKDF2-HMAC-SHA256 triple** — `hex(salt)$iterations$hex(key)` with a
//!   16-byte salt and a 32-byte derived key. The iteration count travels
//!   with the record, so raising the configured count never breaks
//!   verification of older records.
//! - **Argon2id PHC string** — the self-describing `$argon2id$...` format
//!   produced by the `argon2` crate.
//!
//! Verification dispatches on the leading character: PHC strings start with
//! `$`, the triple never does. A record is self-sufficient — verification
//! needs only the stored string and the candidate password.
//!
//! Derivation is deliberately expensive (tens of milliseconds at the default
//! iteration count) as a brute-force deterrent. `hash` and `verify` are
//! blocking, CPU-bound calls; keep them off latency-sensitive event-loop
//! threads.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng as SaltRng;
use argon2::password_hash::{
    Error as PhcError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use hmac::Hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::PasswordError;

/// Salt length for the PBKDF2 triple.
pub const SALT_LEN: usize = 16;

/// Derived key length for the PBKDF2 triple.
pub const KEY_LEN: usize = 32;

/// Default PBKDF2 iteration count. Tunable upward via configuration; the
/// count is embedded in each record so old records keep verifying.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;

/// Which encoding [`PasswordEngine::hash`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordScheme {
    /// `hex(salt)$iterations$hex(key)` PBKDF2-HMAC-SHA256 triple.
    #[default]
    Pbkdf2,
    /// Argon2id PHC string.
    Argon2id,
}

/// A parsed stored credential, tagged by algorithm.
#[derive(Debug, Clone)]
pub enum PasswordRecord {
    /// PBKDF2-HMAC-SHA256 triple.
    Pbkdf2 {
        salt: [u8; SALT_LEN],
        iterations: u32,
        hash: [u8; KEY_LEN],
    },
    /// Opaque Argon2id PHC string, parsed lazily at verification time.
    Argon2id(String),
}

impl PasswordRecord {
    /// Parse a stored record string into its tagged form.
    ///
    /// # Errors
    ///
    /// - [`PasswordError::InvalidFormat`] if the structure is not a
    ///   `salt$iterations$hash` triple or a PHC string.
    /// - [`PasswordError::InvalidIterationCount`] if the iteration field is
    ///   non-numeric or non-positive.
    /// - [`PasswordError::HexDecode`] if the salt or hash field does not
    ///   decode to its fixed length.
    pub fn parse(encoded: &str) -> Result<Self, PasswordError> {
        if encoded.is_empty() {
            return Err(PasswordError::InvalidFormat {
                reason: "empty record",
            });
        }
        if encoded.starts_with('$') {
            return Ok(Self::Argon2id(encoded.to_owned()));
        }

        let mut parts = encoded.split('$');
        let (salt_hex, iter_str, hash_hex) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(s), Some(i), Some(h), None) => (s, i, h),
                _ => {
                    return Err(PasswordError::InvalidFormat {
                        reason: "expected salt$iterations$hash",
                    });
                }
            };

        let iterations: u32 =
            iter_str
                .parse()
                .map_err(|_| PasswordError::InvalidIterationCount {
                    value: iter_str.to_owned(),
                })?;
        if iterations == 0 {
            return Err(PasswordError::InvalidIterationCount {
                value: iter_str.to_owned(),
            });
        }

        let salt = decode_fixed::<SALT_LEN>(salt_hex, "salt")?;
        let hash = decode_fixed::<KEY_LEN>(hash_hex, "hash")?;
        Ok(Self::Pbkdf2 {
            salt,
            iterations,
            hash,
        })
    }
}

/// Derives and checks password credentials.
///
/// Holds no secrets and no per-request state; safe to share across threads.
#[derive(Debug, Clone)]
pub struct PasswordEngine {
    scheme: PasswordScheme,
    pbkdf2_iterations: u32,
}

impl Default for PasswordEngine {
    fn default() -> Self {
        Self::new(PasswordScheme::Pbkdf2, DEFAULT_PBKDF2_ITERATIONS)
    }
}

impl PasswordEngine {
    /// Build an engine that hashes with the given scheme and PBKDF2
    /// iteration count.
    ///
    /// The count is used as given: the ≥ [`DEFAULT_PBKDF2_ITERATIONS`]
    /// production floor is enforced by
    /// [`GatekeyConfig`](crate::config::GatekeyConfig), not here, so test
    /// fixtures and legacy-count reproduction can use smaller values.
    /// Callers constructing an engine directly own that floor.
    #[must_use]
    pub fn new(scheme: PasswordScheme, pbkdf2_iterations: u32) -> Self {
        Self {
            scheme,
            pbkdf2_iterations,
        }
    }

    /// Hash a password into a self-sufficient stored record.
    ///
    /// # Errors
    ///
    /// - [`PasswordError::SaltGeneration`] if the OS CSPRNG cannot supply
    ///   salt bytes.
    /// - [`PasswordError::Derivation`] if the key derivation itself fails.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        match self.scheme {
            PasswordScheme::Pbkdf2 => self.hash_pbkdf2(password),
            PasswordScheme::Argon2id => hash_argon2id(password),
        }
    }

    /// Check a candidate password against a stored record.
    ///
    /// `Ok(false)` is the ordinary no-match outcome, distinct from the
    /// malformed-record errors. Dispatches on the record's algorithm tag, so
    /// either encoding verifies regardless of the engine's configured
    /// scheme — sufficient for an upgrade-on-next-login migration should a
    /// caller want one.
    ///
    /// # Errors
    ///
    /// Parse errors as documented on [`PasswordRecord::parse`], plus
    /// [`PasswordError::Derivation`] on KDF failure.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool, PasswordError> {
        match PasswordRecord::parse(stored)? {
            PasswordRecord::Pbkdf2 {
                salt,
                iterations,
                hash,
            } => {
                let derived = derive_pbkdf2(password, &salt, iterations)?;
                Ok(bool::from(derived.ct_eq(&hash)))
            }
            PasswordRecord::Argon2id(phc) => verify_argon2id(password, &phc),
        }
    }

    fn hash_pbkdf2(&self, password: &str) -> Result<String, PasswordError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| PasswordError::SaltGeneration {
                reason: e.to_string(),
            })?;
        let key = derive_pbkdf2(password, &salt, self.pbkdf2_iterations)?;
        Ok(format!(
            "{}${}${}",
            hex::encode(salt),
            self.pbkdf2_iterations,
            hex::encode(key)
        ))
    }
}

/// PBKDF2-HMAC-SHA256 with a 32-byte output.
fn derive_pbkdf2(
    password: &str,
    salt: &[u8],
    iterations: u32,
) -> Result<[u8; KEY_LEN], PasswordError> {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, iterations, &mut key).map_err(
        |e| PasswordError::Derivation {
            reason: e.to_string(),
        },
    )?;
    Ok(key)
}

fn hash_argon2id(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut SaltRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Derivation {
            reason: e.to_string(),
        })
}

fn verify_argon2id(password: &str, phc: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(phc).map_err(|_| PasswordError::InvalidFormat {
        reason: "invalid PHC string",
    })?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PhcError::Password) => Ok(false),
        Err(e) => Err(PasswordError::Derivation {
            reason: e.to_string(),
        }),
    }
}

fn decode_fixed<const N: usize>(
    hexstr: &str,
    field: &'static str,
) -> Result<[u8; N], PasswordError> {
    let bytes = hex::decode(hexstr).map_err(|_| PasswordError::HexDecode { field })?;
    bytes
        .try_into()
        .map_err(|_| PasswordError::HexDecode { field })
}
