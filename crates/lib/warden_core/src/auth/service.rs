//! Session state machine.
//!
//! Per (user, device) slot: no session → active (login) → rotated (each
//! successful refresh) → no session (logout, expiry, or detected reuse).
//! `AuthService` holds no mutable state of its own; every transition is a
//! single operation on the [`RefreshTokenStore`].

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AuthError;
use super::jwt::TokenCodec;
use super::password::CredentialHasher;
use super::secrets::{fingerprint, generate_secret};
use crate::config::{ReusePolicy, SessionConfig};
use crate::mail::{MailMessage, Mailer};
use crate::models::auth::{
    LoginOutcome, NewAccount, NewUser, ProfileUpdate, RefreshOutcome, TokenKind, User, UserPatch,
    UserWithPassword,
};
use crate::refresh::RefreshTokenStore;
use crate::users::UserDirectory;

/// Authentication orchestrator.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserDirectory>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    codec: Arc<dyn TokenCodec>,
    hasher: Arc<dyn CredentialHasher>,
    mailer: Arc<dyn Mailer>,
    config: SessionConfig,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        codec: Arc<dyn TokenCodec>,
        hasher: Arc<dyn CredentialHasher>,
        mailer: Arc<dyn Mailer>,
        config: SessionConfig,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            codec,
            hasher,
            mailer,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Create a credentials account and mail a verification link.
    ///
    /// Username is checked before email. The checks are read-then-decide; a
    /// concurrent duplicate is still refused by the directory's unique
    /// constraint. Mail is sent in the background and its failure does not
    /// undo the account.
    pub async fn register(&self, account: NewAccount) -> Result<User, AuthError> {
        if self.exists(self.users.find_by_username(&account.username).await)? {
            return Err(AuthError::UsernameTaken);
        }
        if self.exists(self.users.find_by_email(&account.email).await)? {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hash_password(account.password).await?;
        let user = self
            .users
            .create(NewUser {
                name: account.name,
                username: account.username,
                email: account.email,
                password_hash,
            })
            .await?;

        let token = self.codec.issue(
            user.id,
            TokenKind::Verification,
            self.config.verification_token_ttl,
            None,
        )?;
        self.send_in_background(MailMessage::verification(
            &self.config.app_uri,
            &user.name,
            &user.email,
            &token,
        ));

        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Check a verification token and return the user it was issued for.
    pub async fn confirm_email(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.codec.verify(token, TokenKind::Verification)?;
        Ok(self.users.find_by_id(claims.sub).await?.user)
    }

    // -----------------------------------------------------------------------
    // Login / logout
    // -----------------------------------------------------------------------

    /// Authenticate with email-or-username and password, opening a session
    /// on `device_id` (a new device when `None`).
    ///
    /// An existing slot for the same device is overwritten.
    pub async fn login(
        &self,
        identity: &str,
        password: &str,
        device_id: Option<Uuid>,
    ) -> Result<LoginOutcome, AuthError> {
        let account = self.users.find_by_identity(identity).await?;

        let Some(password_hash) = account.password_hash else {
            debug!(user_id = %account.user.id, "login refused: account has no password");
            return Err(AuthError::InvalidCredentials);
        };
        if !self.verify_password(password_hash, password.to_string()).await? {
            debug!(user_id = %account.user.id, "login refused: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let user = account.user;
        let device_id = device_id.unwrap_or_else(Uuid::new_v4);
        let access_token = self.issue_access_token(user.id)?;
        let (refresh_token, secret_hash) = self.new_refresh_secret()?;
        self.refresh_tokens
            .put(user.id, device_id, &secret_hash, self.config.refresh_token_ttl)
            .await?;

        info!(user_id = %user.id, device_id = %device_id, "session opened");
        Ok(LoginOutcome {
            user,
            access_token,
            refresh_token,
            device_id,
        })
    }

    /// Close the session on one device. Succeeds whether or not it existed.
    pub async fn logout(&self, user_id: Uuid, device_id: Uuid) -> Result<(), AuthError> {
        self.refresh_tokens.delete(user_id, device_id).await?;
        info!(user_id = %user_id, device_id = %device_id, "session closed");
        Ok(())
    }

    /// Revoke every session of a user.
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let revoked = self.refresh_tokens.revoke_all(user_id).await?;
        info!(user_id = %user_id, revoked, "all sessions revoked");
        Ok(revoked)
    }

    // -----------------------------------------------------------------------
    // Refresh rotation
    // -----------------------------------------------------------------------

    /// Exchange a refresh secret for a new access token and a new secret.
    ///
    /// The presented secret stops validating the moment this succeeds.
    pub async fn refresh_session(
        &self,
        presented: &str,
        user_id: Uuid,
        device_id: Uuid,
    ) -> Result<RefreshOutcome, AuthError> {
        let record = self.refresh_tokens.get(user_id, device_id).await?;

        if record.revoked {
            warn!(user_id = %user_id, device_id = %device_id, "refresh on revoked slot");
            return Err(AuthError::ReuseDetected);
        }
        if record.is_expired_at(chrono::Utc::now()) {
            return Err(AuthError::Expired);
        }

        let presented_hash = fingerprint(presented);
        if presented_hash != record.secret_hash {
            if record.was_rotated_out(&presented_hash) {
                warn!(
                    user_id = %user_id,
                    device_id = %device_id,
                    "rotated-out refresh token replayed"
                );
                self.apply_reuse_policy(user_id, device_id).await?;
                return Err(AuthError::ReuseDetected);
            }
            warn!(user_id = %user_id, device_id = %device_id, "refresh token mismatch");
            return Err(AuthError::TokenMismatch);
        }

        let (refresh_token, new_hash) = self.new_refresh_secret()?;
        let rotated = self
            .refresh_tokens
            .rotate(
                user_id,
                device_id,
                &presented_hash,
                &new_hash,
                self.config.refresh_token_ttl,
            )
            .await?;
        if !rotated {
            // Another refresh with the same secret won the swap.
            warn!(user_id = %user_id, device_id = %device_id, "concurrent refresh lost rotation");
            return Err(AuthError::ReuseDetected);
        }

        let access_token = self.issue_access_token(user_id)?;
        debug!(user_id = %user_id, device_id = %device_id, "refresh token rotated");
        Ok(RefreshOutcome {
            access_token,
            refresh_token,
        })
    }

    async fn apply_reuse_policy(&self, user_id: Uuid, device_id: Uuid) -> Result<(), AuthError> {
        match self.config.reuse_policy {
            ReusePolicy::RevokeDevice => self.refresh_tokens.revoke(user_id, device_id).await,
            ReusePolicy::RevokeAllSessions => {
                self.refresh_tokens.revoke_all(user_id).await.map(|_| ())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Access tokens and profile
    // -----------------------------------------------------------------------

    /// Resolve a bearer access token to its user id.
    ///
    /// Every failure collapses to [`AuthError::Unauthorized`].
    pub fn validate_access_token(&self, token: &str) -> Result<Uuid, AuthError> {
        self.codec
            .verify(token, TokenKind::Access)
            .map(|claims| claims.sub)
            .map_err(|e| {
                debug!("access token rejected: {e}");
                AuthError::Unauthorized
            })
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        Ok(self.users.find_by_id(user_id).await?.user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        self.users.list().await
    }

    /// Apply a profile change. New usernames and emails are checked for
    /// uniqueness first; a new password is hashed before storage.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<User, AuthError> {
        if let Some(username) = &update.username
            && self.taken_by_other(self.users.find_by_username(username).await, user_id)?
        {
            return Err(AuthError::UsernameTaken);
        }
        if let Some(email) = &update.email
            && self.taken_by_other(self.users.find_by_email(email).await, user_id)?
        {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = match update.password {
            Some(password) => Some(self.hash_password(password).await?),
            None => None,
        };
        let patch = UserPatch {
            name: update.name,
            username: update.username,
            email: update.email,
            password_hash,
            role: None,
        };
        if patch.is_empty() {
            return self.current_user(user_id).await;
        }

        let user = self.users.update(user_id, patch).await?;
        info!(user_id = %user.id, "profile updated");
        Ok(user)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn exists<T>(&self, lookup: Result<T, AuthError>) -> Result<bool, AuthError> {
        match lookup {
            Ok(_) => Ok(true),
            Err(AuthError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn taken_by_other(
        &self,
        lookup: Result<UserWithPassword, AuthError>,
        user_id: Uuid,
    ) -> Result<bool, AuthError> {
        match lookup {
            Ok(existing) => Ok(existing.user.id != user_id),
            Err(AuthError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn issue_access_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.codec
            .issue(user_id, TokenKind::Access, self.config.access_token_ttl, None)
    }

    /// Fresh raw secret and its fingerprint.
    fn new_refresh_secret(&self) -> Result<(String, String), AuthError> {
        let raw = generate_secret(self.config.refresh_token_bytes)?;
        let hash = fingerprint(&raw);
        Ok((raw, hash))
    }

    async fn hash_password(&self, plaintext: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task: {e}")))?
    }

    async fn verify_password(&self, hash: String, plaintext: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &plaintext))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task: {e}")))
    }

    fn send_in_background(&self, message: MailMessage) {
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&message).await {
                warn!(to = %message.to, "verification mail not delivered: {e}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use tokio::sync::mpsc;

    use super::*;
    use crate::auth::jwt::{JwtCodec, TokenConfig};
    use crate::auth::password::{BcryptHasher, MIN_BCRYPT_COST};
    use crate::models::auth::RefreshRecord;
    use crate::refresh::MemoryRefreshTokenStore;
    use crate::users::MemoryUserDirectory;

    /// Forwards every message to a channel.
    struct RecordingMailer(mpsc::UnboundedSender<MailMessage>);

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &MailMessage) -> Result<(), AuthError> {
            let _ = self.0.send(message.clone());
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _message: &MailMessage) -> Result<(), AuthError> {
            Err(AuthError::Mail("smtp down".into()))
        }
    }

    struct Harness {
        service: AuthService,
        store: Arc<MemoryRefreshTokenStore>,
        mail: mpsc::UnboundedReceiver<MailMessage>,
    }

    fn harness_with(config: SessionConfig) -> Harness {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = Arc::new(MemoryRefreshTokenStore::new());
        let codec = JwtCodec::new(&TokenConfig {
            secret: "service-test-secret".into(),
        })
        .unwrap();
        let service = AuthService::new(
            Arc::new(MemoryUserDirectory::new()),
            store.clone(),
            Arc::new(codec),
            Arc::new(BcryptHasher::with_cost(MIN_BCRYPT_COST)),
            Arc::new(RecordingMailer(tx)),
            config,
        );
        Harness {
            service,
            store,
            mail: rx,
        }
    }

    fn harness() -> Harness {
        harness_with(SessionConfig::default())
    }

    fn jane() -> NewAccount {
        NewAccount {
            name: "Jane Doe".into(),
            username: "janedoe".into(),
            email: "jane@x.com".into(),
            password: "Secret123".into(),
        }
    }

    #[tokio::test]
    async fn happy_path_register_login_refresh_replay() {
        let mut h = harness();
        let user = h.service.register(jane()).await.unwrap();
        assert_eq!(user.username, "janedoe");

        let login = h.service.login("jane@x.com", "Secret123", None).await.unwrap();
        assert_eq!(login.user.id, user.id);
        assert_eq!(
            h.service.validate_access_token(&login.access_token).unwrap(),
            user.id
        );

        let r1 = login.refresh_token.clone();
        let refreshed = h
            .service
            .refresh_session(&r1, user.id, login.device_id)
            .await
            .unwrap();
        assert_ne!(refreshed.refresh_token, r1);
        assert_eq!(
            h.service.validate_access_token(&refreshed.access_token).unwrap(),
            user.id
        );

        let replay = h.service.refresh_session(&r1, user.id, login.device_id).await;
        assert!(matches!(
            replay,
            Err(AuthError::ReuseDetected) | Err(AuthError::NotFound(_))
        ));

        let mail = tokio::time::timeout(StdDuration::from_secs(5), h.mail.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mail.to, "jane@x.com");
        assert!(mail.body.contains("/email-verification?token="));
    }

    #[tokio::test]
    async fn verification_link_carries_a_verification_token() {
        let mut h = harness();
        let user = h.service.register(jane()).await.unwrap();
        let mail = tokio::time::timeout(StdDuration::from_secs(5), h.mail.recv())
            .await
            .unwrap()
            .unwrap();
        let token = mail.body.rsplit("token=").next().unwrap().trim();

        assert_eq!(h.service.confirm_email(token).await.unwrap().id, user.id);
        // Not usable as an access token.
        assert!(matches!(
            h.service.validate_access_token(token),
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn registration_survives_mail_failure() {
        let codec = JwtCodec::new(&TokenConfig {
            secret: "s".into(),
        })
        .unwrap();
        let service = AuthService::new(
            Arc::new(MemoryUserDirectory::new()),
            Arc::new(MemoryRefreshTokenStore::new()),
            Arc::new(codec),
            Arc::new(BcryptHasher::with_cost(MIN_BCRYPT_COST)),
            Arc::new(FailingMailer),
            SessionConfig::default(),
        );
        let user = service.register(jane()).await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(service.current_user(user.id).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn duplicate_username_is_reported_before_email() {
        let h = harness();
        h.service.register(jane()).await.unwrap();

        let both = h.service.register(jane()).await;
        assert!(matches!(both, Err(AuthError::UsernameTaken)));

        let email_only = h
            .service
            .register(NewAccount {
                username: "janedoe2".into(),
                ..jane()
            })
            .await;
        assert!(matches!(email_only, Err(AuthError::EmailTaken)));
    }

    #[tokio::test]
    async fn login_by_username_works() {
        let h = harness();
        h.service.register(jane()).await.unwrap();
        assert!(h.service.login("janedoe", "Secret123", None).await.is_ok());
    }

    #[tokio::test]
    async fn wrong_password_creates_no_record() {
        let h = harness();
        h.service.register(jane()).await.unwrap();

        let result = h.service.login("jane@x.com", "wrong", None).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn unknown_identity_is_not_found() {
        let h = harness();
        assert!(matches!(
            h.service.login("ghost@x.com", "Secret123", None).await,
            Err(AuthError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn second_login_on_same_device_replaces_the_slot() {
        let h = harness();
        h.service.register(jane()).await.unwrap();

        let first = h.service.login("janedoe", "Secret123", None).await.unwrap();
        let second = h
            .service
            .login("janedoe", "Secret123", Some(first.device_id))
            .await
            .unwrap();
        assert_eq!(second.device_id, first.device_id);
        assert_eq!(h.store.len(), 1);

        let stale = h
            .service
            .refresh_session(&first.refresh_token, first.user.id, first.device_id)
            .await;
        assert!(stale.is_err());
        assert!(
            h.service
                .refresh_session(&second.refresh_token, second.user.id, second.device_id)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn devices_hold_independent_sessions() {
        let h = harness();
        h.service.register(jane()).await.unwrap();
        let laptop = h.service.login("janedoe", "Secret123", None).await.unwrap();
        let phone = h.service.login("janedoe", "Secret123", None).await.unwrap();
        assert_ne!(laptop.device_id, phone.device_id);

        h.service
            .logout(laptop.user.id, laptop.device_id)
            .await
            .unwrap();
        assert!(
            h.service
                .refresh_session(&phone.refresh_token, phone.user.id, phone.device_id)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn expired_record_is_rejected_even_with_correct_secret() {
        let h = harness();
        let user_id = Uuid::new_v4();
        let device_id = Uuid::new_v4();
        let secret = "correct-secret";
        h.store.insert_record(RefreshRecord {
            user_id,
            device_id,
            secret_hash: fingerprint(secret),
            retired_hashes: Vec::new(),
            revoked: false,
            created_at: Utc::now() - Duration::days(10),
            expires_at: Utc::now() - Duration::seconds(1),
        });

        assert!(matches!(
            h.service.refresh_session(secret, user_id, device_id).await,
            Err(AuthError::Expired)
        ));
    }

    #[tokio::test]
    async fn unknown_secret_is_a_mismatch() {
        let h = harness();
        h.service.register(jane()).await.unwrap();
        let login = h.service.login("janedoe", "Secret123", None).await.unwrap();

        assert!(matches!(
            h.service
                .refresh_session("made-up", login.user.id, login.device_id)
                .await,
            Err(AuthError::TokenMismatch)
        ));
        // A mismatch does not burn the real secret.
        assert!(
            h.service
                .refresh_session(&login.refresh_token, login.user.id, login.device_id)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn missing_slot_is_not_found() {
        let h = harness();
        assert!(matches!(
            h.service
                .refresh_session("x", Uuid::new_v4(), Uuid::new_v4())
                .await,
            Err(AuthError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn replay_revokes_the_device_slot() {
        let h = harness();
        h.service.register(jane()).await.unwrap();
        let login = h.service.login("janedoe", "Secret123", None).await.unwrap();
        let (user_id, device_id) = (login.user.id, login.device_id);

        let rotated = h
            .service
            .refresh_session(&login.refresh_token, user_id, device_id)
            .await
            .unwrap();
        assert!(matches!(
            h.service
                .refresh_session(&login.refresh_token, user_id, device_id)
                .await,
            Err(AuthError::ReuseDetected)
        ));
        // The thief's replay also kills the legitimate successor.
        assert!(matches!(
            h.service
                .refresh_session(&rotated.refresh_token, user_id, device_id)
                .await,
            Err(AuthError::ReuseDetected)
        ));
    }

    #[tokio::test]
    async fn replay_of_an_older_generation_is_reuse() {
        let h = harness();
        h.service.register(jane()).await.unwrap();
        let login = h.service.login("janedoe", "Secret123", None).await.unwrap();
        let (user_id, device_id) = (login.user.id, login.device_id);

        let r1 = login.refresh_token;
        let r2 = h
            .service
            .refresh_session(&r1, user_id, device_id)
            .await
            .unwrap()
            .refresh_token;
        let r3 = h
            .service
            .refresh_session(&r2, user_id, device_id)
            .await
            .unwrap()
            .refresh_token;

        assert!(matches!(
            h.service.refresh_session(&r1, user_id, device_id).await,
            Err(AuthError::ReuseDetected)
        ));
        assert!(h.store.get(user_id, device_id).await.unwrap().revoked);
        assert!(matches!(
            h.service.refresh_session(&r3, user_id, device_id).await,
            Err(AuthError::ReuseDetected)
        ));
    }

    #[tokio::test]
    async fn strict_policy_revokes_every_device() {
        let h = harness_with(SessionConfig {
            reuse_policy: ReusePolicy::RevokeAllSessions,
            ..SessionConfig::default()
        });
        h.service.register(jane()).await.unwrap();
        let laptop = h.service.login("janedoe", "Secret123", None).await.unwrap();
        let phone = h.service.login("janedoe", "Secret123", None).await.unwrap();

        h.service
            .refresh_session(&laptop.refresh_token, laptop.user.id, laptop.device_id)
            .await
            .unwrap();
        let _ = h
            .service
            .refresh_session(&laptop.refresh_token, laptop.user.id, laptop.device_id)
            .await;

        assert!(matches!(
            h.service
                .refresh_session(&phone.refresh_token, phone.user.id, phone.device_id)
                .await,
            Err(AuthError::ReuseDetected)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_refresh_has_a_single_winner() {
        let h = harness();
        h.service.register(jane()).await.unwrap();
        let login = h.service.login("janedoe", "Secret123", None).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = h.service.clone();
                let secret = login.refresh_token.clone();
                let (user_id, device_id) = (login.user.id, login.device_id);
                tokio::spawn(async move {
                    service.refresh_session(&secret, user_id, device_id).await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) => assert!(matches!(e, AuthError::ReuseDetected), "unexpected {e}"),
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let h = harness();
        h.service.register(jane()).await.unwrap();
        let login = h.service.login("janedoe", "Secret123", None).await.unwrap();

        h.service.logout(login.user.id, login.device_id).await.unwrap();
        h.service.logout(login.user.id, login.device_id).await.unwrap();
        assert!(matches!(
            h.service
                .refresh_session(&login.refresh_token, login.user.id, login.device_id)
                .await,
            Err(AuthError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn garbage_access_token_is_unauthorized() {
        let h = harness();
        assert!(matches!(
            h.service.validate_access_token("garbage"),
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn profile_update_rehashes_password_and_checks_uniqueness() {
        let h = harness();
        let jane_user = h.service.register(jane()).await.unwrap();
        h.service
            .register(NewAccount {
                name: "John Doe".into(),
                username: "johndoe".into(),
                email: "john@x.com".into(),
                password: "Secret123".into(),
            })
            .await
            .unwrap();

        let clash = h
            .service
            .update_profile(
                jane_user.id,
                ProfileUpdate {
                    username: Some("johndoe".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(clash, Err(AuthError::UsernameTaken)));

        let updated = h
            .service
            .update_profile(
                jane_user.id,
                ProfileUpdate {
                    name: Some("Jane Roe".into()),
                    password: Some("NewSecret456".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Jane Roe");
        assert!(matches!(
            h.service.login("janedoe", "Secret123", None).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(h.service.login("janedoe", "NewSecret456", None).await.is_ok());
    }
}
