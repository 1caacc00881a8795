use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use crate::activities::service::require_activity;
use crate::auth::AuthUser;
use crate::collaboration::notifications::{notify_best_effort, NewNotification};
use crate::errors::AppError;
use crate::models::collaboration::DependencyRow;

const DEFAULT_DEPENDENCY_TYPE: &str = "blocks";

#[derive(Debug, Deserialize)]
pub struct NewDependency {
    pub depends_on_activity_id: i64,
    pub dependency_type: Option<String>,
}

impl NewDependency {
    fn kind(&self) -> &str {
        self.dependency_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_DEPENDENCY_TYPE)
    }
}

/// Edges out of `activity_id`, with the blocking activity's name and status.
pub async fn list_dependencies(
    pool: &PgPool,
    activity_id: i64,
) -> Result<Vec<DependencyRow>, sqlx::Error> {
    sqlx::query_as::<_, DependencyRow>(
        r#"
        SELECT d.*, a.activity_name AS depends_on_name, a.status AS depends_on_status
        FROM activity_dependencies d
        LEFT JOIN activities a ON d.depends_on_activity_id = a.id
        WHERE d.activity_id = $1
        ORDER BY d.created_at DESC, d.id DESC
        "#,
    )
    .bind(activity_id)
    .fetch_all(pool)
    .await
}

/// Both ends must exist. Cycles are not checked.
pub async fn add_dependency(
    pool: &PgPool,
    user: &AuthUser,
    activity_id: i64,
    req: &NewDependency,
) -> Result<i64, AppError> {
    if req.depends_on_activity_id == activity_id {
        return Err(AppError::Validation(
            "An activity cannot depend on itself".to_string(),
        ));
    }
    let dependent = require_activity(pool, activity_id).await?;
    let blocker = require_activity(pool, req.depends_on_activity_id).await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO activity_dependencies (activity_id, depends_on_activity_id, dependency_type)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(activity_id)
    .bind(blocker.id)
    .bind(req.kind())
    .fetch_one(pool)
    .await?;

    info!(
        "Dependency {id}: activity {activity_id} {} on {} (by {})",
        req.kind(),
        blocker.id,
        user.username
    );

    notify_best_effort(
        pool,
        NewNotification {
            user_id: dependent.effective_owner(),
            activity_id: Some(activity_id),
            notification_type: "dependency",
            title: "New Dependency Added".to_string(),
            message: format!(
                "A dependency was added to your activity: {} (blocked by {})",
                dependent.activity_name, blocker.activity_name
            ),
        },
    )
    .await;

    Ok(id)
}

pub async fn delete_dependency(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM activity_dependencies WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Dependency not found".to_string()));
    }
    Ok(())
}
