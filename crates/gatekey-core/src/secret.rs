//! Secret loading and one-shot process caching.
//!
//! Two long-lived symmetric secrets exist: the CSRF MAC key and the JWT
//! signing key. Each is read from a protected file exactly once per process
//! and cached for the remainder of the process lifetime. Provisioning the
//! files is a deployment precondition — this module never writes or
//! regenerates a key.
//!
//! # Security model
//!
//! - Secret bytes are zeroized on drop and redacted in `Debug` output.
//! - Values are never logged; load events carry only the secret's name.
//! - A failed load is not cached: the next caller retries the read, so a
//!   fixed environment does not require a restart.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::SecretError;

/// Upper bound on the backing file size. Anything larger is a
/// misconfiguration, not a secret.
pub const MAX_SECRET_LEN: usize = 1024;

/// The two named secrets this library consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretName {
    /// Key for CSRF token MACs.
    Csrf,
    /// Key for JWT HS256 signatures.
    Jwt,
}

impl fmt::Display for SecretName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csrf => f.write_str("csrf_secret"),
            Self::Jwt => f.write_str("jwt_secret"),
        }
    }
}

/// An immutable secret value, zeroized on drop.
///
/// Always non-empty: construction goes through the store, which rejects
/// empty values so no dependent operation ever runs with a zero-length key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret(Vec<u8>);

impl Secret {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the raw secret bytes.
    ///
    /// Use with care — the caller must not log or persist these bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Loads and caches the process-lifetime secrets.
///
/// Safe to share across request-handling threads: each secret lives in a
/// [`OnceLock`], so exactly one successful load result is ever stored and
/// every caller observes the same fully initialized value.
#[derive(Debug)]
pub struct SecretStore {
    csrf_path: PathBuf,
    jwt_path: PathBuf,
    csrf: OnceLock<Secret>,
    jwt: OnceLock<Secret>,
}

impl SecretStore {
    /// Create a store backed by the given secret files. Nothing is read
    /// until a secret is first requested.
    #[must_use]
    pub fn new(csrf_path: impl Into<PathBuf>, jwt_path: impl Into<PathBuf>) -> Self {
        Self {
            csrf_path: csrf_path.into(),
            jwt_path: jwt_path.into(),
            csrf: OnceLock::new(),
            jwt: OnceLock::new(),
        }
    }

    /// Fetch a secret by name, reading the backing file on first use.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError`] if the file cannot be read, is larger than
    /// [`MAX_SECRET_LEN`], or is empty after trimming trailing newlines.
    pub fn get(&self, name: SecretName) -> Result<&Secret, SecretError> {
        let (cell, path) = match name {
            SecretName::Csrf => (&self.csrf, self.csrf_path.as_path()),
            SecretName::Jwt => (&self.jwt, self.jwt_path.as_path()),
        };
        if let Some(secret) = cell.get() {
            return Ok(secret);
        }
        let secret = read_secret_file(path, name)?;
        debug!(%name, "secret loaded");
        // If two threads raced past the fast path, one load wins and the
        // other's value is dropped (and zeroized). All callers see the winner.
        Ok(cell.get_or_init(|| secret))
    }

    /// Fetch the CSRF MAC key.
    ///
    /// # Errors
    ///
    /// See [`SecretStore::get`].
    pub fn csrf_secret(&self) -> Result<&Secret, SecretError> {
        self.get(SecretName::Csrf)
    }

    /// Fetch the JWT signing key.
    ///
    /// # Errors
    ///
    /// See [`SecretStore::get`].
    pub fn jwt_secret(&self) -> Result<&Secret, SecretError> {
        self.get(SecretName::Jwt)
    }
}

/// Read a secret file: bound the size, trim trailing line terminators,
/// reject empty results.
fn read_secret_file(path: &Path, name: SecretName) -> Result<Secret, SecretError> {
    let mut bytes = fs::read(path).map_err(|e| SecretError::io(name, path.to_path_buf(), e))?;
    if bytes.len() > MAX_SECRET_LEN {
        return Err(SecretError::too_large(name, bytes.len(), MAX_SECRET_LEN));
    }
    while matches!(bytes.last(), Some(b'\n' | b'\r')) {
        bytes.pop();
    }
    if bytes.is_empty() {
        return Err(SecretError::empty(name));
    }
    Ok(Secret::new(bytes))
}
