use sqlx::{PgConnection, PgPool};

use crate::models::history::EditHistoryRow;

const AUDIT_LIMIT: i64 = 500;

/// A row about to be appended to `edit_history`.
pub struct NewHistoryEntry<'a> {
    pub activity_id: i64,
    pub edited_by: i64,
    pub field_changed: &'a str,
    pub old_value: Option<&'a str>,
    pub new_value: Option<&'a str>,
    pub change_description: &'a str,
}

/// Appends one audit row. Runs on the caller's connection so it can share a
/// transaction with the activity write.
pub async fn record(conn: &mut PgConnection, entry: NewHistoryEntry<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO edit_history
            (activity_id, edited_by, field_changed, old_value, new_value, change_description)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(entry.activity_id)
    .bind(entry.edited_by)
    .bind(entry.field_changed)
    .bind(entry.old_value)
    .bind(entry.new_value)
    .bind(entry.change_description)
    .execute(conn)
    .await?;
    Ok(())
}

/// Newest-first history of one activity.
pub async fn list_for_activity(
    pool: &PgPool,
    activity_id: i64,
) -> Result<Vec<EditHistoryRow>, sqlx::Error> {
    sqlx::query_as::<_, EditHistoryRow>(
        r#"
        SELECT eh.*, u.username AS edited_by_name
        FROM edit_history eh
        LEFT JOIN users u ON eh.edited_by = u.id
        WHERE eh.activity_id = $1
        ORDER BY eh.edited_at DESC, eh.id DESC
        "#,
    )
    .bind(activity_id)
    .fetch_all(pool)
    .await
}

/// Cross-activity audit trail for admins, capped at the newest 500 rows.
pub async fn list_recent(pool: &PgPool) -> Result<Vec<EditHistoryRow>, sqlx::Error> {
    sqlx::query_as::<_, EditHistoryRow>(
        r#"
        SELECT eh.*, u.username AS edited_by_name, a.activity_name
        FROM edit_history eh
        LEFT JOIN users u ON eh.edited_by = u.id
        LEFT JOIN activities a ON eh.activity_id = a.id
        ORDER BY eh.edited_at DESC, eh.id DESC
        LIMIT $1
        "#,
    )
    .bind(AUDIT_LIMIT)
    .fetch_all(pool)
    .await
}
