// src/models/like.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'likes' table: one row per (user, post) pair.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
