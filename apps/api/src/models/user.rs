use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::Role;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub role: String,
    pub notify_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    /// Rows are constrained by a CHECK, so anything unknown is treated as the lesser role.
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::Client)
    }
}

/// Public profile returned by login and `/api/auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub notify_email: Option<String>,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        UserProfile {
            id: row.id,
            username: row.username,
            email: row.email,
            role: row.role,
            notify_email: row.notify_email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub notify_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Minimal entry for owner and backup pickers.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserOption {
    pub id: i64,
    pub username: String,
    pub role: String,
}
