use sqlx::PgPool;
use tracing::warn;

use crate::errors::AppError;
use crate::models::collaboration::NotificationRow;

const FEED_LIMIT: i64 = 50;

/// A feed entry about to be stored.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub activity_id: Option<i64>,
    pub notification_type: &'static str,
    pub title: String,
    pub message: String,
}

pub async fn create_notification(
    pool: &PgPool,
    notification: &NewNotification,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO notifications (user_id, activity_id, notification_type, title, message)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(notification.user_id)
    .bind(notification.activity_id)
    .bind(notification.notification_type)
    .bind(&notification.title)
    .bind(&notification.message)
    .fetch_one(pool)
    .await
}

/// Stores a notification, logging instead of failing.
pub async fn notify_best_effort(pool: &PgPool, notification: NewNotification) {
    if let Err(e) = create_notification(pool, &notification).await {
        warn!(
            "Failed to create {} notification for user {}: {e}",
            notification.notification_type, notification.user_id
        );
    }
}

pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<NotificationRow>, sqlx::Error> {
    sqlx::query_as::<_, NotificationRow>(
        "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(FEED_LIMIT)
    .fetch_all(pool)
    .await
}

pub async fn unread_count(pool: &PgPool, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// Marks one of the user's own notifications read. Other users' ids look missing.
pub async fn mark_read(pool: &PgPool, user_id: i64, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Notification {id} not found")));
    }
    Ok(())
}

pub async fn mark_all_read(pool: &PgPool, user_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn clear_all(pool: &PgPool, user_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
