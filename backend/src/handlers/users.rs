// src/handlers/users.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    config::DEFAULT_PROFILE,
    error::AppError,
    events::{UserEmail, UserEvent},
    extract::{AppJson, AppPath},
    handlers::Data,
    models::{
        post::Page,
        user::{
            ChangePasswordRequest, CreateUserRequest, NewUser, UpdateUserRequest,
            UserDetailResponse, UserResponse, normalize,
        },
    },
    state::AppState,
    store::require_user,
    utils::{
        hash::{hash_password, verify_password},
        html::clean_description,
        image::decode_data_uri,
        jwt::AuthUser,
        token::generate_email_token,
    },
};

fn add_taken(errors: &mut ValidationErrors, field: &'static str) {
    errors.add(
        field,
        ValidationError::new("unique")
            .with_message(format!("The {} has already been taken.", field).into()),
    );
}

/// Writes `value` into `slot` and reports whether anything changed.
fn assign<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Registers a new user.
///
/// The account starts enabled but unverified, holding a fresh verification
/// token, and a `Registered` event is fired for the mailer.
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut errors = payload.check();

    let nick = normalize(&payload.nick);
    let email = normalize(&payload.email);

    if state.store.nick_taken(&nick, None).await? {
        add_taken(&mut errors, "nick");
    }
    if state.store.email_taken(&email, None).await? {
        add_taken(&mut errors, "email");
    }
    if !errors.errors().is_empty() {
        return Err(errors.into());
    }

    let profile = state
        .store
        .profile_by_name(DEFAULT_PROFILE)
        .await?
        .ok_or_else(|| {
            AppError::InternalServerError(format!("profile '{}' is not seeded", DEFAULT_PROFILE))
        })?;

    let user = state
        .store
        .create_user(NewUser {
            profile_id: profile.id,
            nick,
            name: payload.name.trim().to_string(),
            email,
            password: hash_password(&payload.password)?,
            description: payload.description.as_deref().and_then(clean_description),
            enabled: true,
            verified: false,
            verification_email_token: Some(generate_email_token()),
        })
        .await?;

    tracing::info!(user_id = user.id, nick = %user.nick, "user registered");

    state
        .notifier
        .notify(UserEvent::Registered(UserEmail::from(&user)))
        .await;

    Ok((StatusCode::CREATED, Json(Data::new(UserResponse::from(user)))))
}

/// Lists every live user.
/// Admin only.
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users: Vec<UserResponse> = state
        .store
        .list_users()
        .await?
        .iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(users))
}

/// Shows a user together with their posts, followed users and followers.
pub async fn show_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(state.store.as_ref(), id).await?;

    let post = state.store.posts_by_user(id, None).await?;
    let following = state.store.following(id).await?;
    let follower = state.store.followers(id).await?;

    Ok(Json(Data::new(UserDetailResponse {
        user: UserResponse::from(user),
        post,
        following: following.iter().map(UserResponse::from).collect(),
        follower: follower.iter().map(UserResponse::from).collect(),
    })))
}

/// Partially updates a user.
///
/// Only the user themselves or an admin may update; changing `profile_id` or
/// `enabled` is reserved to admins. The request must change at least one
/// stored value, otherwise it is rejected with 422. A new email does not
/// reset the verification state.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    caller.authorize(id)?;
    let mut user = require_user(state.store.as_ref(), id).await?;

    let admin_only_change = payload.profile_id.is_some_and(|p| p != user.profile_id)
        || payload.enabled.is_some_and(|e| e != user.enabled);
    if admin_only_change && !caller.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins may change the profile or enabled flag.".to_string(),
        ));
    }

    let mut errors = payload.check();

    let nick = payload.nick.as_deref().map(normalize);
    let email = payload.email.as_deref().map(normalize);

    if let Some(nick) = &nick {
        if state.store.nick_taken(nick, Some(id)).await? {
            add_taken(&mut errors, "nick");
        }
    }
    if let Some(email) = &email {
        if state.store.email_taken(email, Some(id)).await? {
            add_taken(&mut errors, "email");
        }
    }
    if let Some(profile_id) = payload.profile_id {
        if state.store.profile(profile_id).await?.is_none() {
            errors.add(
                "profile_id",
                ValidationError::new("exists")
                    .with_message("The selected profile is invalid.".into()),
            );
        }
    }
    if !errors.errors().is_empty() {
        return Err(errors.into());
    }

    let image = match &payload.image {
        Some(Some(uri)) => Some(Some(decode_data_uri(uri)?)),
        Some(None) => Some(None),
        None => None,
    };

    let mut dirty = false;
    if let Some(nick) = nick {
        dirty |= assign(&mut user.nick, nick);
    }
    if let Some(email) = email {
        dirty |= assign(&mut user.email, email);
    }
    if let Some(name) = &payload.name {
        dirty |= assign(&mut user.name, name.trim().to_string());
    }
    if let Some(profile_id) = payload.profile_id {
        dirty |= assign(&mut user.profile_id, profile_id);
    }
    if let Some(enabled) = payload.enabled {
        dirty |= assign(&mut user.enabled, enabled);
    }
    if let Some(description) = &payload.description {
        let cleaned = description.as_deref().and_then(clean_description);
        dirty |= assign(&mut user.description, cleaned);
    }
    if let Some(image) = image {
        let before = (user.image.clone(), user.mime.clone());
        user.set_image(image);
        dirty |= before != (user.image.clone(), user.mime.clone());
    }
    if let Some(password) = &payload.password {
        user.password = hash_password(password)?;
        dirty = true;
    }

    if !dirty {
        return Err(AppError::Unprocessable(
            "At least one different value must be specified to update.".to_string(),
        ));
    }

    let user = state.store.save_user(&user).await?;
    tracing::info!(user_id = user.id, by = caller.id, "user updated");

    Ok(Json(Data::new(UserResponse::from(user))))
}

/// Soft-deletes a user. Self or admin.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    caller.authorize(id)?;

    let user = state
        .store
        .soft_delete_user(id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = user.id, by = caller.id, "user soft-deleted");

    Ok(Json(Data::new(UserResponse::from(user))))
}

/// Replaces the password after checking the old one. Self or admin.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    caller.authorize(id)?;
    payload.validate()?;

    let mut user = require_user(state.store.as_ref(), id).await?;

    if !verify_password(&payload.password_old, &user.password)? {
        return Err(AppError::BadRequest(
            "The old password does not match.".to_string(),
        ));
    }

    user.password = hash_password(&payload.password_new)?;
    state.store.save_user(&user).await?;

    tracing::info!(user_id = id, by = caller.id, "password changed");

    Ok(Json(Data::new("OK")))
}

/// All posts of a user, newest first.
pub async fn user_posts(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_user(state.store.as_ref(), id).await?;
    let posts = state.store.posts_by_user(id, None).await?;
    Ok(Json(posts))
}

/// A window of a user's posts, newest first.
pub async fn user_posts_page(
    State(state): State<AppState>,
    AppPath((id, offset, limit)): AppPath<(i64, i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    require_user(state.store.as_ref(), id).await?;
    let posts = state
        .store
        .posts_by_user(id, Some(Page::new(offset, limit)))
        .await?;
    Ok(Json(posts))
}

/// Users following `{id}`.
pub async fn followers(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_user(state.store.as_ref(), id).await?;
    let users: Vec<UserResponse> = state
        .store
        .followers(id)
        .await?
        .iter()
        .map(UserResponse::from)
        .collect();
    Ok(Json(users))
}

/// Users that `{id}` follows.
pub async fn following(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_user(state.store.as_ref(), id).await?;
    let users: Vec<UserResponse> = state
        .store
        .following(id)
        .await?
        .iter()
        .map(UserResponse::from)
        .collect();
    Ok(Json(users))
}

pub async fn user_likes(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_user(state.store.as_ref(), id).await?;
    Ok(Json(state.store.likes_by_user(id).await?))
}

pub async fn user_comments(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_user(state.store.as_ref(), id).await?;
    Ok(Json(state.store.comments_by_user(id).await?))
}
