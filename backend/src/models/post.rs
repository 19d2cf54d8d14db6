// src/models/post.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub content: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Offset/limit window over a user's posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

/// Largest page a client may ask for in one request.
pub const MAX_PAGE_SIZE: i64 = 100;

impl Page {
    /// Clamps negative values to zero and caps the limit.
    pub fn new(offset: i64, limit: i64) -> Self {
        Self {
            offset: offset.max(0),
            limit: limit.clamp(0, MAX_PAGE_SIZE),
        }
    }
}
