//! Credential and token primitives for web backends.
//!
//! Contains the secret store (load-once process caching), the stateless CSRF
//! token engine, the password credential engine (PBKDF2 triple and Argon2id
//! records), and the session JWT issuer/verifier. This crate knows nothing
//! about HTTP, storage, or request parsing — tokens and records are opaque
//! strings passed in and out by the caller.

pub mod config;
pub mod csrf;
pub mod error;
pub mod jwt;
pub mod kit;
pub mod password;
pub mod secret;
mod time;

pub use config::GatekeyConfig;
pub use kit::Gatekey;
