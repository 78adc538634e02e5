//! API server configuration.

/// Configuration for the HTTP layer.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// Set the `Secure` attribute on session cookies.
    pub cookie_secure: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3100".into(),
            cookie_secure: false,
        }
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable        | Default          |
    /// |-----------------|------------------|
    /// | `BIND_ADDR`     | `127.0.0.1:3100` |
    /// | `COOKIE_SECURE` | `false`          |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            cookie_secure: std::env::var("COOKIE_SECURE")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.cookie_secure),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
