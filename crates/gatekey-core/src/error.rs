//! Error types for `gatekey-core`.
//!
//! One enum per component, each variant carrying enough context to diagnose
//! the problem without a debugger. Secret values, password material, and
//! token bytes never appear in error messages.
//!
//! Every error maps onto exactly one [`ErrorClass`] and the classes are never
//! coerced into one another: an expired token is `Rejected`, not
//! `MalformedInput`, and callers can rely on that distinction.

use std::panic::Location;
use std::path::PathBuf;

use crate::secret::SecretName;

/// Caller-facing failure category, mirroring HTTP status semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Misprovisioned environment (missing secret, dead RNG) — 5xx territory.
    Configuration,
    /// Client-supplied input that cannot be parsed — 4xx territory.
    MalformedInput,
    /// Well-formed input that failed verification — an ordinary negative
    /// outcome, not an exceptional condition.
    Rejected,
}

/// Errors from the secret store. All are configuration-class: a failed
/// secret load means the environment is misprovisioned.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    /// The backing file could not be opened or read.
    #[error("failed to read secret '{name}' from {path:?}")]
    Io {
        name: SecretName,
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: &'static Location<'static>,
    },

    /// The backing file is larger than any plausible secret.
    #[error("secret '{name}' is {size} bytes, expected at most {max}")]
    TooLarge {
        name: SecretName,
        size: usize,
        max: usize,
        location: &'static Location<'static>,
    },

    /// The secret is empty after trimming trailing line terminators.
    /// Operating with a zero-length key is never acceptable.
    #[error("secret '{name}' is empty")]
    Empty {
        name: SecretName,
        location: &'static Location<'static>,
    },
}

impl SecretError {
    #[track_caller]
    pub(crate) fn io(name: SecretName, path: PathBuf, source: std::io::Error) -> Self {
        Self::Io {
            name,
            path,
            source,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub(crate) fn too_large(name: SecretName, size: usize, max: usize) -> Self {
        Self::TooLarge {
            name,
            size,
            max,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub(crate) fn empty(name: SecretName) -> Self {
        Self::Empty {
            name,
            location: Location::caller(),
        }
    }

    /// Source location where the error was constructed. Diagnostic only —
    /// correct handling never depends on it.
    #[must_use]
    pub fn location(&self) -> &'static Location<'static> {
        match self {
            Self::Io { location, .. }
            | Self::TooLarge { location, .. }
            | Self::Empty { location, .. } => location,
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Configuration
    }
}

/// Errors from CSRF token generation and validation.
#[derive(Debug, thiserror::Error)]
pub enum CsrfError {
    /// The CSRF secret could not be loaded.
    #[error(transparent)]
    Secret(#[from] SecretError),

    /// The OS CSPRNG could not supply nonce bytes. Fatal — not retryable
    /// without a process restart.
    #[error("random source failure: {reason}")]
    RandomSource { reason: String },

    /// HMAC computation failed.
    #[error("mac computation failed: {reason}")]
    Mac { reason: String },

    /// The token is empty, has the wrong length, or contains a non-hex
    /// character. Rejected outright, never partially decoded.
    #[error("invalid csrf token: {reason}")]
    InvalidToken { reason: &'static str },

    /// The embedded timestamp is ahead of the server clock.
    #[error("csrf token timestamp {issued_at} is in the future (now {now})")]
    FutureTimestamp { issued_at: u64, now: u64 },

    /// The token is older than the 24-hour validity window.
    #[error("csrf token expired: issued at {issued_at}, now {now}")]
    Expired { issued_at: u64, now: u64 },

    /// The embedded MAC does not match the recomputed one — a tampered or
    /// wrong-key token.
    #[error("csrf token mac mismatch")]
    MacMismatch,
}

impl CsrfError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Secret(_) | Self::RandomSource { .. } | Self::Mac { .. } => {
                ErrorClass::Configuration
            }
            Self::InvalidToken { .. } => ErrorClass::MalformedInput,
            Self::FutureTimestamp { .. } | Self::Expired { .. } | Self::MacMismatch => {
                ErrorClass::Rejected
            }
        }
    }
}

/// Errors from password hashing and verification.
///
/// A non-matching password is NOT an error — `verify` returns `Ok(false)`.
/// These variants cover misprovisioning and malformed stored records only.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// The OS CSPRNG could not supply salt bytes.
    #[error("salt generation failed: {reason}")]
    SaltGeneration { reason: String },

    /// The key derivation function itself failed.
    #[error("key derivation failed: {reason}")]
    Derivation { reason: String },

    /// The stored record does not have the expected structure.
    #[error("invalid password record: {reason}")]
    InvalidFormat { reason: &'static str },

    /// The iteration field is non-numeric or non-positive.
    #[error("invalid iteration count '{value}' in password record")]
    InvalidIterationCount { value: String },

    /// The salt or hash field failed to hex-decode to its fixed length.
    #[error("hex decoding failed for password record field '{field}'")]
    HexDecode { field: &'static str },
}

impl PasswordError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::SaltGeneration { .. } | Self::Derivation { .. } => ErrorClass::Configuration,
            Self::InvalidFormat { .. }
            | Self::InvalidIterationCount { .. }
            | Self::HexDecode { .. } => ErrorClass::MalformedInput,
        }
    }
}

/// Errors from JWT issuance and verification.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// The JWT secret could not be loaded.
    #[error(transparent)]
    Secret(#[from] SecretError),

    /// The subject id is empty.
    #[error("jwt subject must be non-empty")]
    InvalidSubject,

    /// The codec failed to sign the claims.
    #[error("jwt signing failed: {reason}")]
    Sign { reason: String },

    /// The token's `exp` is in the past.
    #[error("jwt has expired")]
    Expired,

    /// The signature does not verify against the current secret.
    #[error("jwt signature mismatch")]
    SignatureMismatch,

    /// The token could not be parsed as a compact JWT. The codec's own
    /// diagnostic stays in the structured field and out of `Display` so it
    /// never reaches production error surfaces.
    #[error("malformed jwt")]
    Malformed { reason: String },
}

impl JwtError {
    /// Retained codec diagnostic, if this variant carries one. Never part
    /// of `Display` output — correct handling never depends on it.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Sign { reason } | Self::Malformed { reason } => Some(reason),
            Self::Secret(_) | Self::InvalidSubject | Self::Expired | Self::SignatureMismatch => {
                None
            }
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Secret(_) | Self::Sign { .. } => ErrorClass::Configuration,
            Self::InvalidSubject | Self::Malformed { .. } => ErrorClass::MalformedInput,
            Self::Expired | Self::SignatureMismatch => ErrorClass::Rejected,
        }
    }
}
