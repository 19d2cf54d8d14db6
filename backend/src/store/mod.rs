// src/store/mod.rs

//! Identity store: persistence of users, their profile and the rows that
//! hang off a user (posts, likes, comments, follows).

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        comment::Comment,
        like::Like,
        post::{Page, Post},
        profile::Profile,
        user::{NewUser, User},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

/// Repository over the users table and its relationships.
///
/// Every lookup ignores soft-deleted users unless stated otherwise.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn profile(&self, id: i64) -> Result<Option<Profile>, AppError>;

    async fn profile_by_name(&self, name: &str) -> Result<Option<Profile>, AppError>;

    /// Inserts a user. A nick or email clash is reported as a 422 field error.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Looks a user up by nick or email (already lowercased). A nick match
    /// wins over an email match; ties go to the lowest id.
    async fn find_by_login(&self, login: &str) -> Result<Option<User>, AppError>;

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<User>, AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    /// Whether another live user (other than `except`) already uses `nick`.
    async fn nick_taken(&self, nick: &str, except: Option<i64>) -> Result<bool, AppError>;

    async fn email_taken(&self, email: &str, except: Option<i64>) -> Result<bool, AppError>;

    /// Writes every mutable column of `user` and bumps `updated_at`.
    async fn save_user(&self, user: &User) -> Result<User, AppError>;

    /// Stamps `deleted_at`; returns the row as it was deleted.
    async fn soft_delete_user(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Newest first, optionally windowed.
    async fn posts_by_user(&self, user_id: i64, page: Option<Page>) -> Result<Vec<Post>, AppError>;

    /// Users that follow `user_id`.
    async fn followers(&self, user_id: i64) -> Result<Vec<User>, AppError>;

    /// Users that `user_id` follows.
    async fn following(&self, user_id: i64) -> Result<Vec<User>, AppError>;

    async fn likes_by_user(&self, user_id: i64) -> Result<Vec<Like>, AppError>;

    async fn comments_by_user(&self, user_id: i64) -> Result<Vec<Comment>, AppError>;
}

/// Fetches a live user or fails with 404.
pub async fn require_user(store: &dyn UserStore, id: i64) -> Result<User, AppError> {
    store
        .find_user(id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

pub(crate) fn taken(field: &'static str) -> AppError {
    AppError::field(field, "unique", format!("The {} has already been taken.", field))
}
