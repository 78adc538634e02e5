//! JWT token generation and verification.

use std::fmt;
use std::path::PathBuf;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::info;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{TokenClaims, TokenKind};

/// The only signing algorithm issued or accepted.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Signing configuration, fixed for the lifetime of the process.
///
/// Changing the secret invalidates every outstanding token.
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Signs and verifies stateless bearer tokens.
pub trait TokenCodec: Send + Sync {
    /// Sign a token for `subject` that expires `ttl` from now.
    ///
    /// A fresh `jti` is generated when none is supplied.
    fn issue(
        &self,
        subject: Uuid,
        kind: TokenKind,
        ttl: Duration,
        jti: Option<Uuid>,
    ) -> Result<String, AuthError>;

    /// Verify signature, expiry and kind, returning the claims.
    fn verify(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, AuthError>;
}

/// HS256 [`TokenCodec`].
#[derive(Clone)]
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtCodec {
    pub fn new(config: &TokenConfig) -> Result<Self, AuthError> {
        if config.secret.is_empty() {
            return Err(AuthError::Signing("signing secret must not be empty".into()));
        }
        let secret = config.secret.as_bytes();

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        })
    }
}

impl fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtCodec")
            .field("algorithm", &ALGORITHM)
            .finish_non_exhaustive()
    }
}

impl TokenCodec for JwtCodec {
    fn issue(
        &self,
        subject: Uuid,
        kind: TokenKind,
        ttl: Duration,
        jti: Option<Uuid>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: subject,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: jti.unwrap_or_else(Uuid::new_v4),
            typ: kind,
        };
        encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(format!("jwt encode: {e}")))
    }

    fn verify(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, AuthError> {
        let claims = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(map_decode_error)?
            .claims;

        // Checked again here so the rule does not depend on library leeway defaults.
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }
        if claims.typ != expected {
            return Err(AuthError::WrongTokenKind {
                expected,
                found: claims.typ,
            });
        }
        Ok(claims)
    }
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> AuthError {
    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName => AuthError::InvalidSignature,
        _ => AuthError::Malformed(e.to_string()),
    }
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("AUTH_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    // Generate and persist
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("warden")
        .join("jwt-secret")
}
