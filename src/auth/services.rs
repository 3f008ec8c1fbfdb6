use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::auth::dto::PublicUser;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::UserStore;
use crate::auth::repo_types::User;
use crate::error::AuthError;
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{3,50}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// Argon2 is CPU-bound, so hashing runs on the blocking pool rather than
/// stalling the async executor.
pub async fn hash_password_blocking(plain: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?
}

/// Turns an (identifier, password) pair into a verified user record.
///
/// The identifier matches either the email or the username field in a single
/// lookup. Unknown identifier and wrong password are the same
/// `InvalidCredentials` outcome to the caller; only the log distinguishes
/// them.
pub async fn authenticate(
    users: &dyn UserStore,
    identifier: &str,
    password: &str,
) -> Result<User, AuthError> {
    let user = match users.find_by_login(identifier).await? {
        Some(user) => user,
        None => {
            warn!(identifier, "login attempt for unknown identifier");
            return Err(AuthError::InvalidCredentials);
        }
    };

    let password = password.to_owned();
    let hash = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?;

    if !ok {
        warn!(user_id = %user.id, "login attempt with wrong password");
        return Err(AuthError::InvalidCredentials);
    }
    Ok(user)
}

/// Resolves an inbound bearer token to a verified identity: verify the token,
/// then re-resolve the subject against the user store. Both steps are
/// read-only and run independently on every request.
pub async fn resolve_identity(state: &AppState, bearer: &str) -> Result<PublicUser, AuthError> {
    let claims = state.jwt.verify(bearer)?;
    match state.users.find_by_id(claims.sub).await? {
        Some(user) => Ok(PublicUser::from(user)),
        None => {
            warn!(user_id = %claims.sub, "token subject no longer resolves to a user");
            Err(AuthError::InvalidToken)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::NewUser;
    use crate::error::StoreError;

    fn assert_is_invalid_credentials(err: AuthError) {
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.to_string(), "invalid credentials");
    }

    async fn register(state: &AppState, email: &str, username: &str, password: &str) -> User {
        let password_hash = hash_password_blocking(password.to_owned()).await.unwrap();
        state
            .users
            .create(NewUser {
                email: email.into(),
                username: username.into(),
                password_hash,
                full_name: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn authenticate_accepts_email_or_username() {
        let state = AppState::fake();
        let created = register(&state, "alice@example.com", "alice", "correctpw").await;

        let by_email = authenticate(state.users.as_ref(), "alice@example.com", "correctpw")
            .await
            .unwrap();
        let by_username = authenticate(state.users.as_ref(), "alice", "correctpw")
            .await
            .unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_username.id, created.id);
    }

    #[tokio::test]
    async fn authenticate_accepts_email_in_any_case() {
        let state = AppState::fake();
        // Registration lowercases the email before storing it.
        let created = register(&state, "alice@example.com", "alice", "correctpw").await;

        let user = authenticate(state.users.as_ref(), "Alice@Example.com", "correctpw")
            .await
            .unwrap();
        assert_eq!(user.id, created.id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_identifier_are_indistinguishable() {
        let state = AppState::fake();
        register(&state, "alice@example.com", "alice", "correctpw").await;

        let wrong_pw = authenticate(state.users.as_ref(), "alice@example.com", "wrongpw")
            .await
            .unwrap_err();
        let unknown = authenticate(state.users.as_ref(), "nobody@example.com", "anything")
            .await
            .unwrap_err();
        assert_is_invalid_credentials(wrong_pw);
        assert_is_invalid_credentials(unknown);
    }

    #[tokio::test]
    async fn register_login_issue_resolve_end_to_end() {
        let state = AppState::fake();
        register(&state, "a@b.com", "ab", "longpassword1").await;

        let user = authenticate(state.users.as_ref(), "a@b.com", "longpassword1")
            .await
            .unwrap();
        let token = state.jwt.sign(user.id).unwrap();

        let identity = resolve_identity(&state, &token).await.unwrap();
        assert_eq!(identity.id, user.id);
        assert_eq!(identity.email, "a@b.com");
        assert_eq!(identity.username, "ab");

        let json = serde_json::to_string(&identity).unwrap();
        assert!(!json.contains("password"));
    }

    #[tokio::test]
    async fn resolve_rejects_token_for_deleted_or_unknown_subject() {
        let state = AppState::fake();
        // Valid signature, but the subject was never registered.
        let token = state.jwt.sign(uuid::Uuid::new_v4()).unwrap();
        let err = resolve_identity(&state, &token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn duplicate_registration_fails_distinctly_from_success() {
        let state = AppState::fake();
        register(&state, "a@b.com", "ab", "longpassword1").await;

        let password_hash = hash_password_blocking("otherpassword".into()).await.unwrap();
        let err = state
            .users
            .create(NewUser {
                email: "a@b.com".into(),
                username: "someone-else".into(),
                password_hash,
                full_name: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("email")));
    }

    #[test]
    fn email_and_username_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(!is_valid_email("aliceexample.com"));
        assert!(!is_valid_email("alice@example"));

        assert!(is_valid_username("alice_01"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("has spaces"));
    }
}
