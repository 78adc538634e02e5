//! Outbound mail.
//!
//! [`GmailMailer`] sends through the Gmail API, authenticating with a Google
//! OAuth2 refresh token that is exchanged for an access token on every send.
//! [`LogMailer`] only logs and is used when no Google credentials are set.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::auth::AuthError;

/// Google OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Gmail "send message" endpoint for the authenticated account.
pub const GMAIL_SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

/// A plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub subject: String,
    pub body: String,
    pub to: String,
}

impl MailMessage {
    /// Account verification mail pointing at `{app_uri}/email-verification`.
    pub fn verification(app_uri: &str, name: &str, to: &str, token: &str) -> Self {
        let link = format!(
            "{}/email-verification?token={token}",
            app_uri.trim_end_matches('/')
        );
        Self {
            subject: "Email verification".to_string(),
            body: format!(
                "Hello {name}.\n\nPlease follow this link to verify your new account\n\n{link}"
            ),
            to: to.to_string(),
        }
    }

    /// RFC 822 rendering used as the Gmail `raw` payload.
    pub fn to_rfc822(&self, from: Option<&str>) -> String {
        let mut out = String::new();
        if let Some(from) = from {
            out.push_str(&format!("From: {from}\r\n"));
        }
        out.push_str(&format!("To: {}\r\n", self.to));
        out.push_str(&format!("Subject: {}\r\n", self.subject));
        out.push_str("Content-Type: text/plain; charset=\"UTF-8\"\r\n\r\n");
        out.push_str(&self.body);
        out
    }
}

/// Mail delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), AuthError>;
}

/// Mailer that writes messages to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), AuthError> {
        info!(to = %message.to, subject = %message.subject, "mail delivery disabled, logging message");
        debug!(body = %message.body, "mail body");
        Ok(())
    }
}

/// Google OAuth2 client credentials for the sending account.
#[derive(Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Optional `From` header; Gmail defaults to the authenticated account.
    pub sender: Option<String>,
}

impl std::fmt::Debug for GmailCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailCredentials")
            .field("client_id", &self.client_id)
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl GmailCredentials {
    /// Reads `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_REFRESH_TOKEN`
    /// and optional `MAIL_SENDER`. Returns `None` unless all three required
    /// variables are set.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Some(Self {
            client_id: var("GOOGLE_CLIENT_ID")?,
            client_secret: var("GOOGLE_CLIENT_SECRET")?,
            refresh_token: var("GOOGLE_REFRESH_TOKEN")?,
            sender: var("MAIL_SENDER"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

/// Gmail API mailer.
#[derive(Debug, Clone)]
pub struct GmailMailer {
    client: reqwest::Client,
    credentials: GmailCredentials,
    token_url: String,
    send_url: String,
}

impl GmailMailer {
    pub fn new(credentials: GmailCredentials) -> Self {
        Self::with_endpoints(credentials, GOOGLE_TOKEN_URL, GMAIL_SEND_URL)
    }

    /// Point the mailer at alternative endpoints.
    pub fn with_endpoints(credentials: GmailCredentials, token_url: &str, send_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            token_url: token_url.to_string(),
            send_url: send_url.to_string(),
        }
    }

    async fn access_token(&self) -> Result<String, AuthError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", self.credentials.refresh_token.as_str()),
        ];

        let resp = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Mail(format!("token refresh failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Mail(format!("token refresh HTTP {status}: {body}")));
        }

        resp.json::<AccessTokenResponse>()
            .await
            .map(|r| r.access_token)
            .map_err(|e| AuthError::Mail(format!("token refresh parse error: {e}")))
    }
}

#[async_trait]
impl Mailer for GmailMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), AuthError> {
        let access_token = self.access_token().await?;
        let raw = URL_SAFE.encode(message.to_rfc822(self.credentials.sender.as_deref()));

        let resp = self
            .client
            .post(&self.send_url)
            .bearer_auth(access_token)
            .json(&json!({ "raw": raw }))
            .send()
            .await
            .map_err(|e| AuthError::Mail(format!("send failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Mail(format!("send HTTP {status}: {body}")));
        }

        info!(to = %message.to, subject = %message.subject, "mail sent");
        Ok(())
    }
}
