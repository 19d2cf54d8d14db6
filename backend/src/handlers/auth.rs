// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    extract::AppJson,
    handlers::Data,
    models::user::{LoginRequest, UserResponse, normalize},
    state::AppState,
    store::require_user,
    utils::{
        hash::verify_password,
        jwt::{AuthUser, sign_jwt},
    },
};

/// Authenticates a user by nick or email and returns a JWT token.
///
/// Unverified users may log in; the response tells the client whether the
/// email address has been confirmed yet.
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let invalid = || AppError::AuthError("Invalid credentials".to_string());

    let user = state
        .store
        .find_by_login(&normalize(&payload.login))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(invalid());
    }

    if !user.enabled {
        return Err(AppError::Forbidden("This account is disabled.".to_string()));
    }

    let profile = state
        .store
        .profile(user.profile_id)
        .await?
        .map(|p| p.profile)
        .unwrap_or_default();

    let token = sign_jwt(
        user.id,
        &profile,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    tracing::info!(user_id = user.id, "user logged in");

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "verified": user.verified
    })))
}

/// Returns the authenticated user.
pub async fn me(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(state.store.as_ref(), caller.id).await?;
    Ok(Json(Data::new(UserResponse::from(user))))
}
