// src/models/profile.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::config::ADMIN_PROFILE;

/// Represents the 'profiles' table: the role a user is assigned.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,

    /// Role name, e.g. 'admin' or 'user'.
    pub profile: String,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.profile == ADMIN_PROFILE
    }
}
