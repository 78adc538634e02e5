//! # warden_core
//!
//! Credential authentication and device-bound session management: password
//! hashing, signed access tokens, rotating refresh secrets, user storage and
//! verification mail.

pub mod auth;
pub mod config;
pub mod mail;
pub mod migrate;
pub mod models;
pub mod refresh;
pub mod users;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
