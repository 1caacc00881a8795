//! Read-only aggregates over non-archived activities.

use serde::Serialize;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, FromRow)]
pub struct SprintCountRow {
    pub sprint: i32,
    pub total: i64,
    pub completed: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SprintProgress {
    pub sprint: i32,
    pub total: i64,
    pub completed: i64,
    pub percentage: i64,
}

/// Rounded percentage, exactly 0 when there is nothing to complete.
pub fn completion_percentage(completed: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as i64
}

/// Always yields sprints 1 to 4, filling the gaps with empty sprints.
pub fn assemble_progress(rows: &[SprintCountRow]) -> Vec<SprintProgress> {
    (1..=4)
        .map(|sprint| {
            let (total, completed) = rows
                .iter()
                .find(|r| r.sprint == sprint)
                .map(|r| (r.total, r.completed))
                .unwrap_or((0, 0));
            SprintProgress {
                sprint,
                total,
                completed,
                percentage: completion_percentage(completed, total),
            }
        })
        .collect()
}

pub async fn sprint_progress(pool: &PgPool) -> Result<Vec<SprintProgress>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SprintCountRow>(
        r#"
        SELECT sprint,
               COUNT(*) AS total,
               COUNT(*) FILTER (WHERE status = 'Completed') AS completed
        FROM activities
        WHERE is_archived = FALSE
        GROUP BY sprint
        ORDER BY sprint
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(assemble_progress(&rows))
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ItTypeComparison {
    pub it_type: String,
    pub total: i64,
    pub completed: i64,
    pub in_progress: i64,
    pub planned: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GxpDistribution {
    pub it_type: String,
    pub gxp_impact: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DepartmentBreakdown {
    pub department: String,
    pub total: i64,
    pub completed: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PriorityDistribution {
    pub priority: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TcoSummary {
    pub it_type: String,
    pub total_tco: f64,
    pub avg_tco: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAnalytics {
    pub it_type_comparison: Vec<ItTypeComparison>,
    pub gxp_distribution: Vec<GxpDistribution>,
    pub department_breakdown: Vec<DepartmentBreakdown>,
    pub priority_distribution: Vec<PriorityDistribution>,
    pub tco_summary: Vec<TcoSummary>,
}

pub async fn dashboard_analytics(pool: &PgPool) -> Result<DashboardAnalytics, sqlx::Error> {
    let it_types = sqlx::query_as::<_, ItTypeComparison>(
        r#"
        SELECT it_type,
               COUNT(*) AS total,
               COUNT(*) FILTER (WHERE status = 'Completed') AS completed,
               COUNT(*) FILTER (WHERE status = 'In Progress') AS in_progress,
               COUNT(*) FILTER (WHERE status = 'Planned') AS planned
        FROM activities
        WHERE it_type IS NOT NULL AND is_archived = FALSE
        GROUP BY it_type
        ORDER BY it_type
        "#,
    )
    .fetch_all(pool);

    let gxp = sqlx::query_as::<_, GxpDistribution>(
        r#"
        SELECT it_type, gxp_impact, COUNT(*) AS count
        FROM activities
        WHERE it_type IS NOT NULL AND gxp_impact IS NOT NULL AND is_archived = FALSE
        GROUP BY it_type, gxp_impact
        ORDER BY it_type, gxp_impact
        "#,
    )
    .fetch_all(pool);

    let departments = sqlx::query_as::<_, DepartmentBreakdown>(
        r#"
        SELECT department,
               COUNT(*) AS total,
               COUNT(*) FILTER (WHERE status = 'Completed') AS completed
        FROM activities
        WHERE department IS NOT NULL AND is_archived = FALSE
        GROUP BY department
        ORDER BY department
        "#,
    )
    .fetch_all(pool);

    let priorities = sqlx::query_as::<_, PriorityDistribution>(
        r#"
        SELECT priority, COUNT(*) AS count
        FROM activities
        WHERE is_archived = FALSE
        GROUP BY priority
        ORDER BY priority
        "#,
    )
    .fetch_all(pool);

    let tco = sqlx::query_as::<_, TcoSummary>(
        r#"
        SELECT it_type,
               SUM(tco_value) AS total_tco,
               AVG(tco_value) AS avg_tco
        FROM activities
        WHERE tco_value IS NOT NULL AND it_type IS NOT NULL AND is_archived = FALSE
        GROUP BY it_type
        ORDER BY it_type
        "#,
    )
    .fetch_all(pool);

    let (it_type_comparison, gxp_distribution, department_breakdown, priority_distribution, tco_summary) =
        tokio::try_join!(it_types, gxp, departments, priorities, tco)?;

    Ok(DashboardAnalytics {
        it_type_comparison,
        gxp_distribution,
        department_breakdown,
        priority_distribution,
        tco_summary,
    })
}
