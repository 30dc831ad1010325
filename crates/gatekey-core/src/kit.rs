//! The facade the orchestration layer talks to.
//!
//! [`Gatekey`] wires one shared [`SecretStore`] into the three engines and
//! exposes one operation per request-handling concern. Engines never call
//! each other; the secret store is their only shared dependency.

use std::sync::Arc;

use crate::config::GatekeyConfig;
use crate::csrf::CsrfEngine;
use crate::error::{CsrfError, JwtError, PasswordError};
use crate::jwt::{Claims, JwtEngine};
use crate::password::PasswordEngine;
use crate::secret::SecretStore;

/// Credential and token primitives behind a single handle.
///
/// Cheap to share (`Arc<Gatekey>`) across request handlers; all operations
/// take `&self` and hold no per-request state.
#[derive(Debug)]
pub struct Gatekey {
    csrf: CsrfEngine,
    password: PasswordEngine,
    jwt: JwtEngine,
}

impl Gatekey {
    /// Build a facade from explicit configuration. No secret is read until
    /// first use.
    #[must_use]
    pub fn new(config: &GatekeyConfig) -> Self {
        let store = Arc::new(SecretStore::new(
            config.csrf_secret_path.clone(),
            config.jwt_secret_path.clone(),
        ));
        Self {
            csrf: CsrfEngine::new(Arc::clone(&store)),
            password: PasswordEngine::new(config.password_scheme, config.pbkdf2_iterations),
            jwt: JwtEngine::new(store),
        }
    }

    /// Build a facade from `GATEKEY_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(&GatekeyConfig::from_env())
    }

    /// Generate a stateless anti-forgery token.
    ///
    /// # Errors
    ///
    /// See [`CsrfEngine::generate`].
    pub fn generate_csrf_token(&self) -> Result<String, CsrfError> {
        self.csrf.generate()
    }

    /// Validate an anti-forgery token handed back by the client.
    ///
    /// # Errors
    ///
    /// See [`CsrfEngine::validate`].
    pub fn validate_csrf_token(&self, token: &str) -> Result<(), CsrfError> {
        self.csrf.validate(token)
    }

    /// Hash a password into a self-sufficient stored record. CPU-bound.
    ///
    /// # Errors
    ///
    /// See [`PasswordEngine::hash`].
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password.hash(password)
    }

    /// Check a candidate password against a stored record. CPU-bound.
    /// `Ok(false)` is the ordinary no-match outcome.
    ///
    /// # Errors
    ///
    /// See [`PasswordEngine::verify`].
    pub fn verify_password(&self, password: &str, stored: &str) -> Result<bool, PasswordError> {
        self.password.verify(password, stored)
    }

    /// Issue a 7-day session JWT for an authenticated subject.
    ///
    /// # Errors
    ///
    /// See [`JwtEngine::issue`].
    pub fn issue_jwt(&self, subject_id: &str) -> Result<String, JwtError> {
        self.jwt.issue(subject_id)
    }

    /// Verify a session JWT and return its claims.
    ///
    /// # Errors
    ///
    /// See [`JwtEngine::verify`].
    pub fn verify_jwt(&self, token: &str) -> Result<Claims, JwtError> {
        self.jwt.verify(token)
    }
}
