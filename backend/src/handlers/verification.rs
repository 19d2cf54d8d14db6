// src/handlers/verification.rs

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Redirect},
};

use crate::{
    error::AppError,
    events::{UserEmail, UserEvent},
    extract::AppPath,
    handlers::Data,
    state::AppState,
    store::require_user,
    utils::token::generate_email_token,
};

/// Consumes a verification token and redirects the browser to the login page.
///
/// The token is cleared on success, so a second visit with it is a 404.
pub async fn verify(
    State(state): State<AppState>,
    AppPath(token): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut user = state
        .store
        .find_by_verification_token(&token)
        .await?
        .ok_or(AppError::NotFound(
            "Invalid verification token".to_string(),
        ))?;

    user.mark_verified();
    let user = state.store.save_user(&user).await?;

    tracing::info!(user_id = user.id, "email verified");

    Ok(Redirect::to(state.config.verify_redirect_url.as_str()))
}

/// Fires the registration event again for a user who has not verified yet.
pub async fn resend(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut user = require_user(state.store.as_ref(), id).await?;

    if user.verified {
        return Err(AppError::Conflict("The user is already verified.".to_string()));
    }

    // Unverified rows always carry a token; reissue one if it was lost.
    if user.verification_email_token.is_none() {
        user.verification_email_token = Some(generate_email_token());
        user = state.store.save_user(&user).await?;
    }

    state
        .notifier
        .notify(UserEvent::Registered(UserEmail::from(&user)))
        .await;

    tracing::info!(user_id = user.id, "verification email resent");

    Ok(Json(Data::new("The verification email has been resent.")))
}
