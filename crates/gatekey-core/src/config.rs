//! Library configuration.
//!
//! Loads settings from environment variables with sensible defaults. All
//! settings can be overridden via `GATEKEY_*` environment variables.

use std::path::PathBuf;

use crate::password::{DEFAULT_PBKDF2_ITERATIONS, PasswordScheme};

/// Configuration for a [`Gatekey`](crate::kit::Gatekey) instance.
#[derive(Debug, Clone)]
pub struct GatekeyConfig {
    /// Path to the CSRF MAC key file.
    pub csrf_secret_path: PathBuf,
    /// Path to the JWT signing key file.
    pub jwt_secret_path: PathBuf,
    /// PBKDF2 iteration count for newly hashed passwords. Never below
    /// [`DEFAULT_PBKDF2_ITERATIONS`]; existing records keep their own count.
    pub pbkdf2_iterations: u32,
    /// Encoding produced for newly hashed passwords.
    pub password_scheme: PasswordScheme,
}

impl Default for GatekeyConfig {
    fn default() -> Self {
        Self {
            csrf_secret_path: PathBuf::from(".secrets/csrf.txt"),
            jwt_secret_path: PathBuf::from(".secrets/jwt.txt"),
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
            password_scheme: PasswordScheme::Pbkdf2,
        }
    }
}

impl GatekeyConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GATEKEY_CSRF_SECRET` — path to the CSRF key file (default: `.secrets/csrf.txt`)
    /// - `GATEKEY_JWT_SECRET` — path to the JWT key file (default: `.secrets/jwt.txt`)
    /// - `GATEKEY_PBKDF2_ITERATIONS` — iteration count for new hashes
    ///   (default: `100000`; lower values are raised to the default)
    /// - `GATEKEY_PASSWORD_SCHEME` — `pbkdf2` or `argon2id` (default: `pbkdf2`)
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let csrf_secret_path = std::env::var("GATEKEY_CSRF_SECRET")
            .map_or(defaults.csrf_secret_path, PathBuf::from);
        let jwt_secret_path =
            std::env::var("GATEKEY_JWT_SECRET").map_or(defaults.jwt_secret_path, PathBuf::from);

        let pbkdf2_iterations = std::env::var("GATEKEY_PBKDF2_ITERATIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(DEFAULT_PBKDF2_ITERATIONS, clamp_iterations);

        let password_scheme = match std::env::var("GATEKEY_PASSWORD_SCHEME")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "argon2id" | "argon2" => PasswordScheme::Argon2id,
            _ => PasswordScheme::Pbkdf2,
        };

        Self {
            csrf_secret_path,
            jwt_secret_path,
            pbkdf2_iterations,
            password_scheme,
        }
    }
}

/// The iteration floor only ever moves up.
fn clamp_iterations(requested: u32) -> u32 {
    requested.max(DEFAULT_PBKDF2_ITERATIONS)
}
