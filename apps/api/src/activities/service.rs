use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::activities::derived::{sprint_for_date, unique_identifier, year_for_date};
use crate::activities::history::{self, NewHistoryEntry};
use crate::auth::AuthUser;
use crate::errors::{is_unique_violation, AppError};
use crate::models::activity::{
    ActivityRow, Department, GxpImpact, GxpScope, ItType, Priority, RiskLevel, Status,
};

const ACTIVITY_SELECT: &str = r#"
    SELECT a.*,
           u1.username AS created_by_name,
           u2.username AS last_edited_by_name,
           u3.username AS backup_person_name,
           u4.username AS owner_name_display
    FROM activities a
    LEFT JOIN users u1 ON a.created_by = u1.id
    LEFT JOIN users u2 ON a.last_edited_by = u2.id
    LEFT JOIN users u3 ON a.backup_person = u3.id
    LEFT JOIN users u4 ON a.owner_id = u4.id
"#;

/// Full activity record as submitted on create and on PUT.
/// `sprint` and `activity_year` are derived and never read from the body.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityInput {
    pub activity_name: String,
    pub description: Option<String>,
    pub gxp_scope: GxpScope,
    pub priority: Priority,
    pub risk_level: RiskLevel,
    pub activity_date: NaiveDate,
    #[serde(default)]
    pub status: Status,
    pub assigned_to: Option<i64>,
    pub backup_person: Option<i64>,
    pub department: Option<Department>,
    pub it_type: Option<ItType>,
    pub gxp_impact: Option<GxpImpact>,
    pub business_benefit: Option<String>,
    pub tco_value: Option<f64>,
    /// Absent on update keeps the current visibility.
    pub is_shared: Option<bool>,
    pub owner_name: Option<String>,
    pub progress_percentage: Option<i32>,
}

impl ActivityInput {
    /// Trims free text and rejects values the schema would refuse.
    pub fn validated(mut self) -> Result<Self, AppError> {
        self.activity_name = self.activity_name.trim().to_string();
        if self.activity_name.is_empty() {
            return Err(AppError::Validation(
                "activity_name is required".to_string(),
            ));
        }
        if let Some(p) = self.progress_percentage {
            if !(0..=100).contains(&p) {
                return Err(AppError::Validation(
                    "progress_percentage must be between 0 and 100".to_string(),
                ));
            }
        }
        if let Some(tco) = self.tco_value {
            if !tco.is_finite() || tco < 0.0 {
                return Err(AppError::Validation(
                    "tco_value must be a non-negative amount".to_string(),
                ));
            }
        }
        self.description = non_blank(self.description);
        self.business_benefit = non_blank(self.business_benefit);
        self.owner_name = non_blank(self.owner_name);
        Ok(self)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Optional filters shared by the list views and the exports.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sprint: Option<i32>,
    pub status: Option<Status>,
    #[serde(default)]
    pub include_archived: bool,
}

/// Which rows a list query may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityScope {
    All,
    /// Personal rows the user created or backs up.
    Mine(i64),
    Shared,
    CreatedBy(i64),
}

pub async fn list_activities(
    pool: &PgPool,
    scope: ActivityScope,
    filter: &ActivityFilter,
) -> Result<Vec<ActivityRow>, sqlx::Error> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(ACTIVITY_SELECT);
    qb.push(" WHERE 1=1");

    match scope {
        ActivityScope::All => {}
        ActivityScope::Mine(user_id) => {
            qb.push(" AND (a.created_by = ")
                .push_bind(user_id)
                .push(" OR a.backup_person = ")
                .push_bind(user_id)
                .push(") AND a.is_shared = FALSE");
        }
        ActivityScope::Shared => {
            qb.push(" AND a.is_shared = TRUE");
        }
        ActivityScope::CreatedBy(user_id) => {
            qb.push(" AND a.created_by = ").push_bind(user_id);
        }
    }

    if !filter.include_archived {
        qb.push(" AND a.is_archived = FALSE");
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND a.activity_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND a.activity_date <= ").push_bind(end);
    }
    if let Some(sprint) = filter.sprint {
        qb.push(" AND a.sprint = ").push_bind(sprint);
    }
    if let Some(status) = filter.status {
        qb.push(" AND a.status = ").push_bind(status.as_str());
    }

    qb.push(" ORDER BY a.activity_date ASC, a.id DESC");

    qb.build_query_as::<ActivityRow>().fetch_all(pool).await
}

pub async fn fetch_activity(pool: &PgPool, id: i64) -> Result<Option<ActivityRow>, sqlx::Error> {
    sqlx::query_as::<_, ActivityRow>(&format!("{ACTIVITY_SELECT} WHERE a.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn require_activity(pool: &PgPool, id: i64) -> Result<ActivityRow, AppError> {
    fetch_activity(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Activity {id} not found")))
}

/// Admins see everything; others see shared rows and rows they take part in.
pub fn can_view(user: &AuthUser, activity: &ActivityRow) -> bool {
    user.is_admin() || activity.is_shared || activity.is_participant(user.id)
}

/// The fields whose changes are spelled out in the audit trail.
#[derive(Debug, Clone, Copy)]
pub struct WatchedFields<'a> {
    pub name: &'a str,
    pub status: &'a str,
    pub priority: &'a str,
    pub date: NaiveDate,
}

impl<'a> WatchedFields<'a> {
    pub fn of_row(row: &'a ActivityRow) -> Self {
        WatchedFields {
            name: &row.activity_name,
            status: &row.status,
            priority: &row.priority,
            date: row.activity_date,
        }
    }

    pub fn of_input(input: &'a ActivityInput) -> Self {
        WatchedFields {
            name: &input.activity_name,
            status: input.status.as_str(),
            priority: input.priority.as_str(),
            date: input.activity_date,
        }
    }
}

/// Human-readable summary of one update, e.g. `Status: "Planned" → "Completed"`.
pub fn describe_changes(before: WatchedFields<'_>, after: WatchedFields<'_>) -> String {
    let mut changes = Vec::new();
    if before.name != after.name {
        changes.push(format!("Name: \"{}\" → \"{}\"", before.name, after.name));
    }
    if before.status != after.status {
        changes.push(format!("Status: \"{}\" → \"{}\"", before.status, after.status));
    }
    if before.priority != after.priority {
        changes.push(format!(
            "Priority: \"{}\" → \"{}\"",
            before.priority, after.priority
        ));
    }
    if before.date != after.date {
        changes.push(format!("Target Date: \"{}\" → \"{}\"", before.date, after.date));
    }

    if changes.is_empty() {
        "Activity updated".to_string()
    } else {
        changes.join("; ")
    }
}

/// Creator for a new activity: admins may assign it to someone else.
pub fn resolve_creator(user: &AuthUser, assigned_to: Option<i64>) -> i64 {
    match assigned_to {
        Some(id) if user.is_admin() => id,
        _ => user.id,
    }
}

async fn identifier_taken(
    pool: &PgPool,
    identifier: &str,
    except_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM activities WHERE unique_identifier = $1 AND id IS DISTINCT FROM $2)",
    )
    .bind(identifier)
    .bind(except_id)
    .fetch_one(pool)
    .await
}

fn duplicate_or_database(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::DuplicateActivity
    } else {
        AppError::Database(err)
    }
}

/// Inserts the activity and its "created" history row in one transaction.
pub async fn create_activity(
    pool: &PgPool,
    user: &AuthUser,
    input: ActivityInput,
) -> Result<ActivityRow, AppError> {
    let input = input.validated()?;
    let creator = resolve_creator(user, input.assigned_to);
    let sprint = sprint_for_date(input.activity_date);
    let year = year_for_date(input.activity_date);
    let identifier = unique_identifier(&input.activity_name, input.activity_date, creator);

    if identifier_taken(pool, &identifier, None).await? {
        return Err(AppError::DuplicateActivity);
    }

    let owner_name = input.owner_name.clone().or_else(|| {
        (creator == user.id).then(|| user.username.clone())
    });

    let mut tx = pool.begin().await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO activities (
            activity_name, description, gxp_scope, priority, risk_level,
            activity_date, sprint, status, created_by, backup_person,
            department, it_type, gxp_impact, business_benefit, tco_value, activity_year,
            owner_id, owner_name, is_shared, unique_identifier, progress_percentage
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                  $17, $18, $19, $20, $21)
        RETURNING id
        "#,
    )
    .bind(&input.activity_name)
    .bind(&input.description)
    .bind(input.gxp_scope.as_str())
    .bind(input.priority.as_str())
    .bind(input.risk_level.as_str())
    .bind(input.activity_date)
    .bind(sprint)
    .bind(input.status.as_str())
    .bind(creator)
    .bind(input.backup_person)
    .bind(input.department.map(Department::as_str))
    .bind(input.it_type.map(ItType::as_str))
    .bind(input.gxp_impact.map(GxpImpact::as_str))
    .bind(&input.business_benefit)
    .bind(input.tco_value)
    .bind(year)
    .bind(creator)
    .bind(owner_name)
    .bind(input.is_shared.unwrap_or(false))
    .bind(&identifier)
    .bind(input.progress_percentage.unwrap_or(0))
    .fetch_one(&mut *tx)
    .await
    .map_err(duplicate_or_database)?;

    history::record(
        &mut *tx,
        NewHistoryEntry {
            activity_id: id,
            edited_by: user.id,
            field_changed: "created",
            old_value: None,
            new_value: Some("Activity created"),
            change_description: "Activity created",
        },
    )
    .await?;

    tx.commit().await?;
    info!("Activity {id} created by {} (sprint {sprint})", user.username);

    require_activity(pool, id).await
}

/// Full replacement of an activity. Only the creator or an admin may update.
pub async fn update_activity(
    pool: &PgPool,
    user: &AuthUser,
    id: i64,
    input: ActivityInput,
) -> Result<ActivityRow, AppError> {
    let existing = require_activity(pool, id).await?;
    if !user.can_manage(existing.created_by) {
        return Err(AppError::Forbidden(
            "You can only edit your own activities".to_string(),
        ));
    }
    let input = input.validated()?;

    let reassigned = input.assigned_to.filter(|_| user.is_admin());
    let creator = reassigned.unwrap_or(existing.created_by);
    let owner = reassigned.unwrap_or_else(|| existing.effective_owner());
    let sprint = sprint_for_date(input.activity_date);
    let year = year_for_date(input.activity_date);
    let identifier = unique_identifier(&input.activity_name, input.activity_date, creator);

    if identifier_taken(pool, &identifier, Some(id)).await? {
        return Err(AppError::DuplicateActivity);
    }

    let description = describe_changes(
        WatchedFields::of_row(&existing),
        WatchedFields::of_input(&input),
    );
    let owner_name = input.owner_name.clone().or(existing.owner_name.clone());

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE activities SET
            activity_name = $1,
            description = $2,
            gxp_scope = $3,
            priority = $4,
            risk_level = $5,
            activity_date = $6,
            sprint = $7,
            status = $8,
            created_by = $9,
            backup_person = $10,
            department = $11,
            it_type = $12,
            gxp_impact = $13,
            business_benefit = $14,
            tco_value = $15,
            activity_year = $16,
            owner_id = $17,
            owner_name = $18,
            is_shared = $19,
            unique_identifier = $20,
            progress_percentage = $21,
            last_edited_by = $22,
            last_edited_at = now()
        WHERE id = $23
        "#,
    )
    .bind(&input.activity_name)
    .bind(&input.description)
    .bind(input.gxp_scope.as_str())
    .bind(input.priority.as_str())
    .bind(input.risk_level.as_str())
    .bind(input.activity_date)
    .bind(sprint)
    .bind(input.status.as_str())
    .bind(creator)
    .bind(input.backup_person)
    .bind(input.department.map(Department::as_str))
    .bind(input.it_type.map(ItType::as_str))
    .bind(input.gxp_impact.map(GxpImpact::as_str))
    .bind(&input.business_benefit)
    .bind(input.tco_value)
    .bind(year)
    .bind(owner)
    .bind(owner_name)
    .bind(input.is_shared.unwrap_or(existing.is_shared))
    .bind(&identifier)
    .bind(input.progress_percentage.unwrap_or(existing.progress_percentage))
    .bind(user.id)
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(duplicate_or_database)?;

    history::record(
        &mut *tx,
        NewHistoryEntry {
            activity_id: id,
            edited_by: user.id,
            field_changed: "updated",
            old_value: None,
            new_value: Some(&input.activity_name),
            change_description: &description,
        },
    )
    .await?;

    tx.commit().await?;
    info!("Activity {id} updated by {}: {description}", user.username);

    require_activity(pool, id).await
}

/// Moves an activity in or out of the archive. Creator or admin only.
pub async fn set_archived(
    pool: &PgPool,
    user: &AuthUser,
    id: i64,
    archived: bool,
) -> Result<ActivityRow, AppError> {
    let existing = require_activity(pool, id).await?;
    if !user.can_manage(existing.created_by) {
        return Err(AppError::Forbidden(
            "You can only archive your own activities".to_string(),
        ));
    }
    if existing.is_archived == archived {
        return Ok(existing);
    }

    let (field, description) = if archived {
        ("archived", "Activity archived")
    } else {
        ("restored", "Activity restored from archive")
    };

    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE activities SET is_archived = $1, last_edited_by = $2, last_edited_at = now() WHERE id = $3",
    )
    .bind(archived)
    .bind(user.id)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    history::record(
        &mut *tx,
        NewHistoryEntry {
            activity_id: id,
            edited_by: user.id,
            field_changed: field,
            old_value: Some(if archived { "false" } else { "true" }),
            new_value: Some(if archived { "true" } else { "false" }),
            change_description: description,
        },
    )
    .await?;
    tx.commit().await?;

    info!("Activity {id} {field} by {}", user.username);
    require_activity(pool, id).await
}

/// Hard delete of the activity and its audit rows. Comments, attachments,
/// dependencies and notifications that reference it are left in place.
pub async fn delete_activity(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM edit_history WHERE activity_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM activities WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Activity {id} not found")));
    }

    tx.commit().await?;
    info!("Activity {id} deleted");
    Ok(())
}
