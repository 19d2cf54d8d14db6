// src/models/user.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::utils::image::{StoredImage, encode_data_uri};

/// Letters (including Spanish accented vowels and ñ) and whitespace only.
static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-zÁÉÍÓÚñáéíóúÑ\s]+$").expect("name regex is valid"));

/// Represents the 'users' table in the database.
///
/// Never serialized directly: responses go through [`UserResponse`], which
/// drops the password hash and the verification token.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub profile_id: i64,

    /// Unique among non-deleted users, always lowercase.
    pub nick: String,
    pub name: String,

    /// Unique among non-deleted users, always lowercase.
    pub email: String,

    /// Argon2 password hash.
    pub password: String,

    pub description: Option<String>,

    /// Raw avatar bytes; `mime` holds the data-URI prefix they were sent with.
    pub image: Option<Vec<u8>>,
    pub mime: Option<String>,

    pub enabled: bool,
    pub verified: bool,

    /// Present while the email address is unverified.
    pub verification_email_token: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl User {
    /// Avatar as a `<mime>,<base64>` data-URI, if one is stored.
    pub fn image_data_uri(&self) -> Option<String> {
        match (&self.image, &self.mime) {
            (Some(bytes), Some(mime)) => Some(encode_data_uri(mime, bytes)),
            _ => None,
        }
    }

    pub fn set_image(&mut self, image: Option<StoredImage>) {
        match image {
            Some(StoredImage { mime, bytes }) => {
                self.mime = Some(mime);
                self.image = Some(bytes);
            }
            None => {
                self.mime = None;
                self.image = None;
            }
        }
    }

    /// Consumes the verification token and marks the email as verified.
    pub fn mark_verified(&mut self) {
        self.verified = true;
        self.verification_email_token = None;
    }
}

/// Public representation of a user.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub profile_id: i64,
    pub nick: String,
    pub name: String,
    pub email: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub enabled: bool,
    pub verified: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            profile_id: user.profile_id,
            nick: user.nick.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            description: user.description.clone(),
            image: user.image_data_uri(),
            enabled: user.enabled,
            verified: user.verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
            deleted_at: user.deleted_at,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse::from(&user)
    }
}

/// A user together with their posts and follow graph, as served by `GET /users/{id}`.
#[derive(Debug, Serialize)]
pub struct UserDetailResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub post: Vec<super::post::Post>,
    pub following: Vec<UserResponse>,
    pub follower: Vec<UserResponse>,
}

/// Row to insert when a user registers (or is seeded).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub profile_id: i64,
    pub nick: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub verified: bool,
    pub verification_email_token: Option<String>,
}

/// DTO for registering a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        length(
            min = 1,
            max = 255,
            message = "The nick must be between 1 and 255 characters."
        ),
        custom(function = validate_not_blank)
    )]
    pub nick: String,

    #[validate(
        length(
            min = 1,
            max = 255,
            message = "The name must be between 1 and 255 characters."
        ),
        custom(function = validate_not_blank),
        custom(function = validate_name)
    )]
    pub name: String,

    #[validate(
        email(message = "The email must be a valid email address."),
        length(max = 255, message = "The email may not be greater than 255 characters.")
    )]
    pub email: String,

    #[validate(length(min = 4, message = "The password must be at least 4 characters."))]
    pub password: String,

    pub password_confirmation: Option<String>,

    pub description: Option<String>,
}

impl CreateUserRequest {
    /// Runs the derived rules plus the password confirmation check.
    pub fn check(&self) -> ValidationErrors {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);
        check_confirmed(
            &mut errors,
            &self.password,
            self.password_confirmation.as_deref(),
        );
        errors
    }
}

/// DTO for a partial profile update. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(
        length(
            min = 1,
            max = 255,
            message = "The nick must be between 1 and 255 characters."
        ),
        custom(function = validate_not_blank)
    )]
    pub nick: Option<String>,

    pub profile_id: Option<i64>,

    #[validate(
        length(
            min = 1,
            max = 255,
            message = "The name must be between 1 and 255 characters."
        ),
        custom(function = validate_not_blank),
        custom(function = validate_name)
    )]
    pub name: Option<String>,

    #[validate(
        email(message = "The email must be a valid email address."),
        length(max = 255, message = "The email may not be greater than 255 characters.")
    )]
    pub email: Option<String>,

    #[validate(length(min = 4, message = "The password must be at least 4 characters."))]
    pub password: Option<String>,

    pub password_confirmation: Option<String>,

    /// `null` clears the description.
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    /// Data-URI; `null` removes the avatar.
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,

    pub enabled: Option<bool>,
}

impl UpdateUserRequest {
    pub fn check(&self) -> ValidationErrors {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);
        if let Some(password) = &self.password {
            check_confirmed(&mut errors, password, self.password_confirmation.as_deref());
        }
        errors
    }
}

/// DTO for `PUT /users/{id}/password`.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 4, message = "The old password must be at least 4 characters."))]
    pub password_old: String,

    #[validate(length(min = 4, message = "The new password must be at least 4 characters."))]
    pub password_new: String,
}

/// DTO for user login. `login` accepts either the nick or the email.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255))]
    pub login: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Rejects values that are empty once surrounding whitespace is trimmed.
fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required")
            .with_message("This field may not be blank.".into()));
    }
    Ok(())
}

/// Validates a display name against [`NAME_REGEX`].
fn validate_name(name: &str) -> Result<(), ValidationError> {
    if !NAME_REGEX.is_match(name) {
        return Err(ValidationError::new("regex")
            .with_message("The name may only contain letters and spaces.".into()));
    }
    Ok(())
}

/// Adds a `password` error unless `confirmation` matches.
fn check_confirmed(errors: &mut ValidationErrors, password: &str, confirmation: Option<&str>) {
    if confirmation != Some(password) {
        errors.add(
            "password",
            ValidationError::new("confirmed")
                .with_message("The password confirmation does not match.".into()),
        );
    }
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Lowercases a nick or email before it is compared or stored.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
