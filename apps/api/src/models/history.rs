use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One append-only audit entry. `activity_name` is only populated by the
/// cross-activity audit query.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EditHistoryRow {
    pub id: i64,
    pub activity_id: i64,
    pub edited_by: i64,
    pub edited_at: DateTime<Utc>,
    pub field_changed: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub change_description: Option<String>,
    #[sqlx(default)]
    pub edited_by_name: Option<String>,
    #[sqlx(default)]
    pub activity_name: Option<String>,
}
