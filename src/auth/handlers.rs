use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::auth::dto::{
    LoginRequest, PublicUser, RegisterRequest, TokenResponse, UpdateProfileRequest,
};
use crate::auth::extractors::CurrentUser;
use crate::auth::repo_types::{NewUser, ProfileUpdate};
use crate::auth::services::{authenticate, hash_password_blocking, is_valid_email, is_valid_username};
use crate::error::ApiError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).patch(update_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "register: invalid email");
        return Err(ApiError::Validation("invalid email".into()));
    }
    if !is_valid_username(&payload.username) {
        warn!(username = %payload.username, "register: invalid username");
        return Err(ApiError::Validation(
            "username must be 3-50 characters (letters, digits, _ or -)".into(),
        ));
    }
    if payload.password.len() < 8 {
        warn!("register: password too short");
        return Err(ApiError::Validation("password too short".into()));
    }

    // Friendlier conflict responses up front; the unique index still backs
    // this up against races.
    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "register: email already registered");
        return Err(ApiError::Conflict("email already in use".into()));
    }
    if state
        .users
        .find_by_username(&payload.username)
        .await?
        .is_some()
    {
        warn!(username = %payload.username, "register: username already registered");
        return Err(ApiError::Conflict("username already in use".into()));
    }

    let password_hash = hash_password_blocking(payload.password).await?;
    let user = state
        .users
        .create(NewUser {
            email: payload.email,
            username: payload.username,
            password_hash,
            full_name: payload.full_name,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let identifier = payload.email_or_username.trim();
    if identifier.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation("missing credentials".into()));
    }

    let user = authenticate(state.users.as_ref(), identifier, &payload.password).await?;
    let access_token = state.jwt.sign(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in: state.jwt.default_ttl.whole_seconds(),
    }))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(identity): CurrentUser) -> Json<PublicUser> {
    Json(identity)
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Json(mut payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    if let Some(email) = payload.email.as_mut() {
        *email = email.trim().to_lowercase();
        if !is_valid_email(email) {
            return Err(ApiError::Validation("invalid email".into()));
        }
    }
    if let Some(username) = &payload.username {
        if !is_valid_username(username) {
            return Err(ApiError::Validation(
                "username must be 3-50 characters (letters, digits, _ or -)".into(),
            ));
        }
    }

    let updated = state
        .users
        .update_profile(
            identity.id,
            ProfileUpdate {
                email: payload.email,
                username: payload.username,
                full_name: payload.full_name,
            },
        )
        .await?
        .ok_or(ApiError::NotFound("user not found"))?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(PublicUser::from(updated)))
}
