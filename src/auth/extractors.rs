use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::auth::dto::PublicUser;
use crate::auth::services::resolve_identity;
use crate::error::ApiError;
use crate::state::AppState;

/// Extracts the bearer token from the Authorization header and resolves it to
/// a verified identity. Rejected requests never learn whether the token or
/// its subject was the problem.
pub struct CurrentUser(pub PublicUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::Unauthorized("missing Authorization header"))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(ApiError::Unauthorized("invalid auth scheme"))?;

        let identity = resolve_identity(state, token).await?;
        Ok(CurrentUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::NewUser;
    use axum::http::{header::AUTHORIZATION, Request};

    async fn registered_state() -> (AppState, uuid::Uuid) {
        let state = AppState::fake();
        let user = state
            .users
            .create(NewUser {
                email: "a@b.com".into(),
                username: "ab".into(),
                password_hash: crate::auth::password::hash_password("longpassword1").unwrap(),
                full_name: None,
            })
            .await
            .unwrap();
        (state, user.id)
    }

    fn parts_with_header(value: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/me");
        if let Some(value) = value {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn extracts_identity_from_valid_bearer_token() {
        let (state, user_id) = registered_state().await;
        let token = state.jwt.sign(user_id).unwrap();

        let mut parts = parts_with_header(Some(format!("Bearer {token}")));
        let CurrentUser(identity) = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(identity.id, user_id);
        assert_eq!(identity.username, "ab");
    }

    #[tokio::test]
    async fn rejects_missing_header_wrong_scheme_and_bad_token() {
        let (state, _) = registered_state().await;

        let mut missing = parts_with_header(None);
        assert!(CurrentUser::from_request_parts(&mut missing, &state)
            .await
            .is_err());

        let mut wrong_scheme = parts_with_header(Some("Basic abc".into()));
        assert!(CurrentUser::from_request_parts(&mut wrong_scheme, &state)
            .await
            .is_err());

        let mut garbage = parts_with_header(Some("Bearer not-a-jwt".into()));
        assert!(CurrentUser::from_request_parts(&mut garbage, &state)
            .await
            .is_err());
    }
}
