// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::PgPool;

use super::{UserStore, taken};
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

const USER_COLUMNS: &str = "id, profile_id, nick, name, email, password, description, image, mime, \
     enabled, verified, verification_email_token, created_at, updated_at, deleted_at";

/// Postgres-backed [`UserStore`].
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps a unique-index violation onto the matching field error.
fn map_write_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some(name) if name.contains("email") => taken("email"),
                _ => taken("nick"),
            };
        }
    }
    tracing::error!("Failed to write user: {:?}", err);
    AppError::from(err)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn profile(&self, id: i64) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT id, profile FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn profile_by_name(&self, name: &str) -> Result<Option<Profile>, AppError> {
        let profile =
            sqlx::query_as::<_, Profile>("SELECT id, profile FROM profiles WHERE profile = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(profile)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            r#"
            INSERT INTO users
                (profile_id, nick, name, email, password, description,
                 enabled, verified, verification_email_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(user.profile_id)
            .bind(&user.nick)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password)
            .bind(&user.description)
            .bind(user.enabled)
            .bind(user.verified)
            .bind(&user.verification_email_token)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE (nick = $1 OR email = $1) AND deleted_at IS NULL \
             ORDER BY (nick = $1) DESC, id \
             LIMIT 1"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<User>, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE verification_email_token = $1 AND deleted_at IS NULL"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY id");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list users: {:?}", e);
                AppError::from(e)
            })?;
        Ok(users)
    }

    async fn nick_taken(&self, nick: &str, except: Option<i64>) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE nick = $1 AND deleted_at IS NULL
                  AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(nick)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn email_taken(&self, email: &str, except: Option<i64>) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE email = $1 AND deleted_at IS NULL
                  AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn save_user(&self, user: &User) -> Result<User, AppError> {
        let sql = format!(
            r#"
            UPDATE users SET
                profile_id = $2, nick = $3, name = $4, email = $5, password = $6,
                description = $7, image = $8, mime = $9, enabled = $10, verified = $11,
                verification_email_token = $12, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(user.profile_id)
            .bind(&user.nick)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password)
            .bind(&user.description)
            .bind(&user.image)
            .bind(&user.mime)
            .bind(user.enabled)
            .bind(user.verified)
            .bind(&user.verification_email_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?
            .ok_or(AppError::NotFound("User not found".to_string()))
    }

    async fn soft_delete_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!(
            "UPDATE users SET deleted_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete user: {:?}", e);
                AppError::from(e)
            })?;
        Ok(user)
    }

    async fn posts_by_user(&self, user_id: i64, page: Option<Page>) -> Result<Vec<Post>, AppError> {
        let (offset, limit) = match page {
            Some(page) => (page.offset, Some(page.limit)),
            None => (0, None),
        };

        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, user_id, content, created_at, updated_at, deleted_at
            FROM posts
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn followers(&self, user_id: i64) -> Result<Vec<User>, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE deleted_at IS NULL \
               AND id IN (SELECT user_id FROM follows WHERE following = $1) \
             ORDER BY id"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn following(&self, user_id: i64) -> Result<Vec<User>, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE deleted_at IS NULL \
               AND id IN (SELECT following FROM follows WHERE user_id = $1) \
             ORDER BY id"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn likes_by_user(&self, user_id: i64) -> Result<Vec<Like>, AppError> {
        let likes = sqlx::query_as::<_, Like>(
            r#"
            SELECT l.id, l.user_id, l.post_id, l.created_at
            FROM likes l
            JOIN posts p ON p.id = l.post_id
            WHERE l.user_id = $1 AND p.deleted_at IS NULL
            ORDER BY l.created_at DESC, l.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(likes)
    }

    async fn comments_by_user(&self, user_id: i64) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, user_id, content, created_at, updated_at, deleted_at
            FROM comments
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }
}
