//! In-memory user directory for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::UserDirectory;
use crate::auth::AuthError;
use crate::models::auth::{NewUser, Provider, Role, User, UserPatch, UserWithPassword};

/// Users behind a single lock so uniqueness checks and inserts are atomic,
/// mirroring the unique indexes of the SQL backing.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<Uuid, UserWithPassword>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    async fn find_by<F>(&self, pred: F) -> Result<UserWithPassword, AuthError>
    where
        F: Fn(&User) -> bool,
    {
        self.users
            .read()
            .await
            .values()
            .find(|u| pred(&u.user))
            .cloned()
            .ok_or(AuthError::NotFound("user"))
    }
}

/// Username is checked across every user before email, so a request that
/// clashes on both always reports the username.
fn check_unique(
    users: &HashMap<Uuid, UserWithPassword>,
    skip: Option<Uuid>,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<(), AuthError> {
    let others = move || users.values().filter(move |u| Some(u.user.id) != skip);
    if let Some(name) = username
        && others().any(|u| u.user.username == name)
    {
        return Err(AuthError::UsernameTaken);
    }
    if let Some(email) = email
        && others().any(|u| u.user.email == email)
    {
        return Err(AuthError::EmailTaken);
    }
    Ok(())
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<UserWithPassword, AuthError> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AuthError::NotFound("user"))
    }

    async fn find_by_username(&self, username: &str) -> Result<UserWithPassword, AuthError> {
        self.find_by(|u| u.username == username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<UserWithPassword, AuthError> {
        self.find_by(|u| u.email == email).await
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AuthError> {
        let mut users = self.users.write().await;
        check_unique(
            &users,
            None,
            Some(&new_user.username),
            Some(&new_user.email),
        )?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            username: new_user.username,
            email: new_user.email,
            role: Role::User,
            provider: Provider::Credentials,
            created_at: now,
            updated_at: now,
        };
        users.insert(
            user.id,
            UserWithPassword {
                user: user.clone(),
                password_hash: Some(new_user.password_hash),
            },
        );
        Ok(user)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User, AuthError> {
        let mut users = self.users.write().await;
        check_unique(
            &users,
            Some(id),
            patch.username.as_deref(),
            patch.email.as_deref(),
        )?;

        let entry = users.get_mut(&id).ok_or(AuthError::NotFound("user"))?;
        let UserPatch {
            name,
            username,
            email,
            password_hash,
            role,
        } = patch;
        if let Some(name) = name {
            entry.user.name = name;
        }
        if let Some(username) = username {
            entry.user.username = username;
        }
        if let Some(email) = email {
            entry.user.email = email;
        }
        if let Some(hash) = password_hash {
            entry.password_hash = Some(hash);
        }
        if let Some(role) = role {
            entry.user.role = role;
        }
        entry.user.updated_at = Utc::now();
        Ok(entry.user.clone())
    }

    async fn list(&self) -> Result<Vec<User>, AuthError> {
        let mut users: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .map(|u| u.user.clone())
            .collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> NewUser {
        NewUser {
            name: "Jane Doe".into(),
            username: "janedoe".into(),
            email: "jane@x.com".into(),
            password_hash: "$2b$04$hash".into(),
        }
    }

    #[tokio::test]
    async fn create_then_find_by_identity() {
        let dir = MemoryUserDirectory::new();
        let user = dir.create(jane()).await.unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.provider, Provider::Credentials);

        let by_email = dir.find_by_identity("jane@x.com").await.unwrap();
        let by_username = dir.find_by_identity("janedoe").await.unwrap();
        assert_eq!(by_email.user.id, user.id);
        assert_eq!(by_username.user.id, user.id);
        assert_eq!(by_email.password_hash.as_deref(), Some("$2b$04$hash"));
    }

    #[tokio::test]
    async fn unknown_identity_is_not_found() {
        let dir = MemoryUserDirectory::new();
        assert!(matches!(
            dir.find_by_identity("ghost").await,
            Err(AuthError::NotFound(_))
        ));
        assert!(matches!(
            dir.find_by_id(Uuid::new_v4()).await,
            Err(AuthError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicates_are_rejected() {
        let dir = MemoryUserDirectory::new();
        dir.create(jane()).await.unwrap();

        let same_username = NewUser {
            email: "other@x.com".into(),
            ..jane()
        };
        assert!(matches!(
            dir.create(same_username).await,
            Err(AuthError::UsernameTaken)
        ));

        let same_email = NewUser {
            username: "someone".into(),
            ..jane()
        };
        assert!(matches!(
            dir.create(same_email).await,
            Err(AuthError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn username_clash_wins_when_both_fields_clash_with_different_users() {
        let dir = MemoryUserDirectory::new();
        for i in 0..8 {
            dir.create(NewUser {
                name: format!("Filler {i}"),
                username: format!("filler{i}"),
                email: format!("filler{i}@x.com"),
                password_hash: "h".into(),
            })
            .await
            .unwrap();
        }
        dir.create(jane()).await.unwrap();
        dir.create(NewUser {
            name: "John Doe".into(),
            username: "johndoe".into(),
            email: "john@x.com".into(),
            password_hash: "h".into(),
        })
        .await
        .unwrap();

        let crossed = NewUser {
            username: "johndoe".into(),
            ..jane()
        };
        assert!(matches!(
            dir.create(crossed).await,
            Err(AuthError::UsernameTaken)
        ));
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let dir = MemoryUserDirectory::new();
        let user = dir.create(jane()).await.unwrap();

        let updated = dir
            .update(
                user.id,
                UserPatch {
                    name: Some("Jane Roe".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Jane Roe");
        assert_eq!(updated.username, "janedoe");
        assert!(updated.updated_at >= user.updated_at);
    }

    #[tokio::test]
    async fn update_keeps_uniqueness_and_allows_own_values() {
        let dir = MemoryUserDirectory::new();
        let jane_user = dir.create(jane()).await.unwrap();
        let john = dir
            .create(NewUser {
                name: "John Doe".into(),
                username: "johndoe".into(),
                email: "john@x.com".into(),
                password_hash: "h".into(),
            })
            .await
            .unwrap();

        let clash = UserPatch {
            email: Some("jane@x.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            dir.update(john.id, clash).await,
            Err(AuthError::EmailTaken)
        ));

        let own = UserPatch {
            email: Some("jane@x.com".into()),
            ..Default::default()
        };
        assert!(dir.update(jane_user.id, own).await.is_ok());
    }

    #[tokio::test]
    async fn update_unknown_user_is_not_found() {
        let dir = MemoryUserDirectory::new();
        assert!(matches!(
            dir.update(Uuid::new_v4(), UserPatch::default()).await,
            Err(AuthError::NotFound(_))
        ));
    }
}
