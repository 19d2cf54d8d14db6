// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::ADMIN_PROFILE, error::AppError, state::AppState};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// Profile name at signing time (e.g., 'user', 'admin').
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// The caller, as resolved by [`auth_middleware`] from a live user row.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub profile: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.profile == ADMIN_PROFILE
    }

    /// Users may act on themselves; admins on anyone.
    pub fn authorize(&self, target_id: i64) -> Result<(), AppError> {
        if self.id == target_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "This action is unauthorized.".to_string(),
            ))
        }
    }
}

/// Signs a new JWT for the user.
pub fn sign_jwt(
    id: i64,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(),
        role: role.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header, then reloads the
/// subject so that soft-deleted users are rejected (401) and disabled users
/// are refused (403). The current profile is read from the database and must
/// still match the `role` claim, otherwise the token is rejected (401).
/// Injects an [`AuthUser`] on success.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::AuthError("Unauthenticated.".to_string()))?;

    let claims = verify_jwt(token, &state.config.jwt_secret)?;
    let user_id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or(AppError::AuthError("Unauthenticated.".to_string()))?;

    if !user.enabled {
        return Err(AppError::Forbidden("This account is disabled.".to_string()));
    }

    let profile = state
        .store
        .profile(user.profile_id)
        .await?
        .map(|p| p.profile)
        .unwrap_or_default();

    // A token signed before a profile change must be reissued.
    if claims.role != profile {
        return Err(AppError::AuthError("Token is stale.".to_string()));
    }

    req.extensions_mut().insert(AuthUser {
        id: user.id,
        profile,
    });
    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. Refuses non-admin callers with 403.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let caller = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(AppError::AuthError("Unauthenticated.".to_string()))?;

    if !caller.is_admin() {
        return Err(AppError::Forbidden(
            "This action is unauthorized.".to_string(),
        ));
    }

    Ok(next.run(req).await)
}
