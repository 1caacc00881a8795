use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::activity::{Department, GxpImpact, GxpScope, ItType, Priority, RiskLevel};
use crate::models::collaboration::TemplateRow;

/// Default field values offered when starting a new activity.
#[derive(Debug, Deserialize)]
pub struct NewTemplate {
    pub template_name: String,
    pub description: Option<String>,
    pub gxp_scope: Option<GxpScope>,
    pub priority: Option<Priority>,
    pub risk_level: Option<RiskLevel>,
    pub department: Option<Department>,
    pub it_type: Option<ItType>,
    pub gxp_impact: Option<GxpImpact>,
    pub business_benefit: Option<String>,
}

pub async fn list_templates(pool: &PgPool) -> Result<Vec<TemplateRow>, sqlx::Error> {
    sqlx::query_as::<_, TemplateRow>(
        r#"
        SELECT t.*, u.username AS created_by_name
        FROM activity_templates t
        LEFT JOIN users u ON t.created_by = u.id
        ORDER BY t.created_at DESC, t.id DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn create_template(
    pool: &PgPool,
    user: &AuthUser,
    template: &NewTemplate,
) -> Result<i64, AppError> {
    let name = template.template_name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Template name is required".to_string()));
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO activity_templates (
            template_name, description, gxp_scope, priority, risk_level,
            department, it_type, gxp_impact, business_benefit, created_by
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(&template.description)
    .bind(template.gxp_scope.map(GxpScope::as_str))
    .bind(template.priority.map(Priority::as_str))
    .bind(template.risk_level.map(RiskLevel::as_str))
    .bind(template.department.map(Department::as_str))
    .bind(template.it_type.map(ItType::as_str))
    .bind(template.gxp_impact.map(GxpImpact::as_str))
    .bind(&template.business_benefit)
    .bind(user.id)
    .fetch_one(pool)
    .await?;

    info!("Template {id} '{name}' created by {}", user.username);
    Ok(id)
}

/// Creator or admin only.
pub async fn delete_template(pool: &PgPool, user: &AuthUser, id: i64) -> Result<(), AppError> {
    let creator: i64 = sqlx::query_scalar("SELECT created_by FROM activity_templates WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Template not found".to_string()))?;
    user.require_manage(creator, "template")?;

    sqlx::query("DELETE FROM activity_templates WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
