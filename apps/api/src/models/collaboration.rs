use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub activity_id: i64,
    pub user_id: i64,
    pub comment_text: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttachmentRow {
    pub id: i64,
    pub activity_id: i64,
    /// Generated on-disk name; never the client-supplied one.
    pub filename: String,
    pub original_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded_by: i64,
    pub uploaded_at: DateTime<Utc>,
    #[sqlx(default)]
    pub uploaded_by_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    pub activity_id: Option<i64>,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TemplateRow {
    pub id: i64,
    pub template_name: String,
    pub description: Option<String>,
    pub gxp_scope: Option<String>,
    pub priority: Option<String>,
    pub risk_level: Option<String>,
    pub department: Option<String>,
    pub it_type: Option<String>,
    pub gxp_impact: Option<String>,
    pub business_benefit: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub created_by_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DependencyRow {
    pub id: i64,
    pub activity_id: i64,
    pub depends_on_activity_id: i64,
    pub dependency_type: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub depends_on_name: Option<String>,
    #[sqlx(default)]
    pub depends_on_status: Option<String>,
}
