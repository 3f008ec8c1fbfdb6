use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, ProfileUpdate, User};
use crate::error::StoreError;

/// Narrow user-lookup interface consumed by the credential/token core.
///
/// "Does not exist" is `Ok(None)`; only genuine storage faults come back as
/// `Err`, so callers can tell an unknown user apart from an unreachable store.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    /// Single query matching either the email or the username field, used by
    /// login so the client-supplied identifier can be either. Emails are
    /// stored lowercased, so the email comparison is case-insensitive;
    /// usernames match exactly.
    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, StoreError>;
    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;
}

const USER_COLUMNS: &str = "id, email, username, password_hash, full_name, created_at, updated_at";

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Maps a Postgres unique violation onto the offending field.
fn duplicate_field(e: &sqlx::Error) -> Option<&'static str> {
    if let sqlx::Error::Database(db) = e {
        if db.code().as_deref() == Some("23505") {
            let constraint = db.constraint().unwrap_or_default();
            if constraint.contains("username") {
                return Some("username");
            }
            return Some("email");
        }
    }
    None
}

fn map_insert_err(e: sqlx::Error) -> StoreError {
    match duplicate_field(&e) {
        Some(field) => StoreError::Duplicate(field),
        None => StoreError::Backend(e),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, username, password_hash, full_name)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .fetch_one(&self.db)
        .await
        .map_err(map_insert_err)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1",
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1",
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = lower($1) OR username = $1",
        ))
        .bind(identifier)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                username = COALESCE($3, username),
                full_name = COALESCE($4, full_name),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(&update.email)
        .bind(&update.username)
        .bind(&update.full_name)
        .fetch_optional(&self.db)
        .await
        .map_err(map_insert_err)
    }
}

/// In-memory store backing `AppState::fake()`; enforces the same email and
/// username uniqueness the Postgres schema does.
pub struct InMemoryUserStore {
    users: std::sync::Mutex<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: std::sync::Mutex::new(Vec::new()),
        }
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("username"));
        }
        let now = time::OffsetDateTime::now_utc();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            full_name: user.full_name,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let email = identifier.to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email || u.username == identifier)
            .cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        if let Some(email) = &update.email {
            if users.iter().any(|u| u.id != id && u.email == *email) {
                return Err(StoreError::Duplicate("email"));
            }
        }
        if let Some(username) = &update.username {
            if users.iter().any(|u| u.id != id && u.username == *username) {
                return Err(StoreError::Duplicate("username"));
            }
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(full_name) = update.full_name {
            user.full_name = Some(full_name);
        }
        user.updated_at = time::OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, username: &str) -> NewUser {
        NewUser {
            email: email.into(),
            username: username.into(),
            password_hash: "$argon2id$fake".into(),
            full_name: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_and_no_second_record_exists() {
        let store = InMemoryUserStore::new();
        store.create(new_user("a@b.com", "ab")).await.unwrap();

        let err = store.create(new_user("a@b.com", "other")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("email")));

        // The failed insert must not have left a second record behind.
        assert!(store.find_by_username("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_login_matches_email_or_username() {
        let store = InMemoryUserStore::new();
        let created = store.create(new_user("a@b.com", "ab")).await.unwrap();

        let by_email = store.find_by_login("a@b.com").await.unwrap().unwrap();
        let by_username = store.find_by_login("ab").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_username.id, created.id);
        assert!(store.find_by_login("nobody").await.unwrap().is_none());

        // Emails are stored lowercased; the lookup must not be thrown off by
        // the casing the client happens to type.
        let mixed_case = store.find_by_login("A@B.com").await.unwrap().unwrap();
        assert_eq!(mixed_case.id, created.id);
    }

    #[tokio::test]
    async fn update_profile_rechecks_uniqueness_against_other_records() {
        let store = InMemoryUserStore::new();
        store.create(new_user("a@b.com", "ab")).await.unwrap();
        let second = store.create(new_user("c@d.com", "cd")).await.unwrap();

        let err = store
            .update_profile(
                second.id,
                ProfileUpdate {
                    email: Some("a@b.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("email")));

        // Updating to its own current value is not a conflict.
        let updated = store
            .update_profile(
                second.id,
                ProfileUpdate {
                    full_name: Some("C. D.".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("C. D."));
    }
}
