use sqlx::PgPool;
use tracing::info;

use crate::activities::service::require_activity;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::collaboration::CommentRow;

const COMMENT_SELECT: &str = r#"
    SELECT c.*, u.username
    FROM comments c
    LEFT JOIN users u ON c.user_id = u.id
"#;

/// Newest first.
pub async fn list_comments(pool: &PgPool, activity_id: i64) -> Result<Vec<CommentRow>, sqlx::Error> {
    sqlx::query_as::<_, CommentRow>(&format!(
        "{COMMENT_SELECT} WHERE c.activity_id = $1 ORDER BY c.created_at DESC, c.id DESC"
    ))
    .bind(activity_id)
    .fetch_all(pool)
    .await
}

pub fn normalize_comment(text: &str) -> Result<&str, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Comment text is required".to_string()));
    }
    Ok(trimmed)
}

pub async fn add_comment(
    pool: &PgPool,
    user: &AuthUser,
    activity_id: i64,
    text: &str,
) -> Result<CommentRow, AppError> {
    let text = normalize_comment(text)?;
    require_activity(pool, activity_id).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO comments (activity_id, user_id, comment_text) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(activity_id)
    .bind(user.id)
    .bind(text)
    .fetch_one(pool)
    .await?;

    let comment = sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(comment)
}

/// Author or admin only.
pub async fn delete_comment(pool: &PgPool, user: &AuthUser, id: i64) -> Result<(), AppError> {
    let author: i64 = sqlx::query_scalar("SELECT user_id FROM comments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    user.require_manage(author, "comment")?;

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    info!("Comment {id} deleted by {}", user.username);
    Ok(())
}
