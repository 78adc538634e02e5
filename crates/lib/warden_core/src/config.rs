//! Session configuration consumed by [`crate::auth::service::AuthService`].

use std::str::FromStr;

use chrono::Duration;
use tracing::warn;

use crate::auth::secrets::DEFAULT_SECRET_BYTES;

/// Access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 365 days, matching the session cookies.
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 365;

/// Email verification token lifetime: 24 hours.
pub const DEFAULT_VERIFICATION_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Upper bound on access token lifetime.
const MAX_ACCESS_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Upper bound on refresh token lifetime.
const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 365;

/// Upper bound on verification token lifetime: 30 days.
const MAX_VERIFICATION_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Bounds on the raw refresh secret length.
const MIN_REFRESH_TOKEN_BYTES: usize = 16;
const MAX_REFRESH_TOKEN_BYTES: usize = 256;

/// What to revoke when a rotated-out refresh secret is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReusePolicy {
    /// Revoke the device slot the secret was replayed against.
    #[default]
    RevokeDevice,
    /// Revoke every session of the user.
    RevokeAllSessions,
}

impl FromStr for ReusePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device" => Ok(ReusePolicy::RevokeDevice),
            "all" => Ok(ReusePolicy::RevokeAllSessions),
            other => Err(format!("unknown reuse policy '{other}' (expected 'device' or 'all')")),
        }
    }
}

/// Token lifetimes and session policy.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Raw refresh secret length in bytes.
    pub refresh_token_bytes: usize,
    pub verification_token_ttl: Duration,
    /// Public base URL used in verification links.
    pub app_uri: String,
    pub reuse_policy: ReusePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::seconds(DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl: Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS),
            refresh_token_bytes: DEFAULT_SECRET_BYTES,
            verification_token_ttl: Duration::seconds(DEFAULT_VERIFICATION_TOKEN_TTL_SECS),
            app_uri: "http://localhost:3000".to_string(),
            reuse_policy: ReusePolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                     | Default                 |
    /// |------------------------------|-------------------------|
    /// | `ACCESS_TOKEN_TTL_SECS`      | `900` (max 86400)       |
    /// | `REFRESH_TOKEN_TTL_DAYS`     | `365` (max 365)         |
    /// | `REFRESH_TOKEN_BYTES`        | `32` (16 to 256)        |
    /// | `VERIFICATION_TOKEN_TTL_SECS`| `86400` (max 2592000)   |
    /// | `APP_URI`                    | `http://localhost:3000` |
    /// | `REUSE_POLICY`               | `device` (or `all`)     |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SessionConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let access_secs = parse_or(&lookup, "ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)
            .clamp(1, MAX_ACCESS_TOKEN_TTL_SECS);
        let refresh_days = parse_or(&lookup, "REFRESH_TOKEN_TTL_DAYS", DEFAULT_REFRESH_TOKEN_TTL_DAYS)
            .clamp(1, MAX_REFRESH_TOKEN_TTL_DAYS);
        let verification_secs = parse_or(
            &lookup,
            "VERIFICATION_TOKEN_TTL_SECS",
            DEFAULT_VERIFICATION_TOKEN_TTL_SECS,
        )
        .clamp(1, MAX_VERIFICATION_TOKEN_TTL_SECS);
        let refresh_bytes = parse_or(&lookup, "REFRESH_TOKEN_BYTES", DEFAULT_SECRET_BYTES)
            .clamp(MIN_REFRESH_TOKEN_BYTES, MAX_REFRESH_TOKEN_BYTES);

        Self {
            access_token_ttl: Duration::seconds(access_secs),
            refresh_token_ttl: Duration::days(refresh_days),
            refresh_token_bytes: refresh_bytes,
            verification_token_ttl: Duration::seconds(verification_secs),
            app_uri: lookup("APP_URI")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.app_uri),
            reuse_policy: parse_or(&lookup, "REUSE_POLICY", defaults.reuse_policy),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!(key, value = %raw, "ignoring invalid config value: {e}");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = SessionConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.access_token_ttl, Duration::minutes(15));
        assert_eq!(config.refresh_token_ttl, Duration::days(365));
        assert_eq!(config.refresh_token_bytes, 32);
        assert_eq!(config.reuse_policy, ReusePolicy::RevokeDevice);
    }

    #[test]
    fn values_are_read_and_clamped() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            ("ACCESS_TOKEN_TTL_SECS", "999999"),
            ("REFRESH_TOKEN_TTL_DAYS", "7"),
            ("REFRESH_TOKEN_BYTES", "4"),
            ("APP_URI", "https://app.test"),
            ("REUSE_POLICY", "all"),
        ]));
        assert_eq!(config.access_token_ttl, Duration::hours(24));
        assert_eq!(config.refresh_token_ttl, Duration::days(7));
        assert_eq!(config.refresh_token_bytes, 16);
        assert_eq!(config.app_uri, "https://app.test");
        assert_eq!(config.reuse_policy, ReusePolicy::RevokeAllSessions);
    }

    #[test]
    fn oversized_values_are_capped() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            ("VERIFICATION_TOKEN_TTL_SECS", "9223372036854775807"),
            ("REFRESH_TOKEN_BYTES", "18446744073709551615"),
        ]));
        assert_eq!(config.verification_token_ttl, Duration::days(30));
        assert_eq!(config.refresh_token_bytes, 256);
        assert!(chrono::Utc::now().checked_add_signed(config.verification_token_ttl).is_some());
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            ("ACCESS_TOKEN_TTL_SECS", "soon"),
            ("REUSE_POLICY", "everything"),
        ]));
        assert_eq!(config.access_token_ttl, Duration::minutes(15));
        assert_eq!(config.reuse_policy, ReusePolicy::RevokeDevice);
    }
}
