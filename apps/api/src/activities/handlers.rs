use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::activities::history;
use crate::activities::notify::announce_created;
use crate::activities::progress::{self, DashboardAnalytics, SprintProgress};
use crate::activities::service::{
    self, can_view, ActivityFilter, ActivityInput, ActivityScope,
};
use crate::auth::{AdminUser, AuthUser};
use crate::errors::AppError;
use crate::models::activity::ActivityRow;
use crate::models::history::EditHistoryRow;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ActivityWriteResponse {
    pub id: i64,
    pub message: &'static str,
    pub sprint: i32,
    pub activity: ActivityRow,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveRequest {
    pub archived: bool,
}

/// GET /api/activities
pub async fn handle_list_all(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<ActivityFilter>,
) -> Result<Json<Vec<ActivityRow>>, AppError> {
    let rows = service::list_activities(&state.db, ActivityScope::All, &filter).await?;
    Ok(Json(rows))
}

/// GET /api/activities/my
pub async fn handle_list_mine(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<ActivityFilter>,
) -> Result<Json<Vec<ActivityRow>>, AppError> {
    let rows = service::list_activities(&state.db, ActivityScope::Mine(user.id), &filter).await?;
    Ok(Json(rows))
}

/// GET /api/activities/shared
pub async fn handle_list_shared(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(filter): Query<ActivityFilter>,
) -> Result<Json<Vec<ActivityRow>>, AppError> {
    let rows = service::list_activities(&state.db, ActivityScope::Shared, &filter).await?;
    Ok(Json(rows))
}

/// GET /api/activities/:id
pub async fn handle_get_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ActivityRow>, AppError> {
    let activity = service::require_activity(&state.db, id).await?;
    if !can_view(&user, &activity) {
        return Err(AppError::Forbidden(
            "You do not have access to this activity".to_string(),
        ));
    }
    Ok(Json(activity))
}

/// POST /api/activities
pub async fn handle_create_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<ActivityInput>,
) -> Result<(StatusCode, Json<ActivityWriteResponse>), AppError> {
    let activity = service::create_activity(&state.db, &user, input).await?;

    announce_created(
        state.db.clone(),
        state.mailer.clone(),
        state.config.mail_from.clone(),
        activity.clone(),
        user.id,
    );

    Ok((
        StatusCode::CREATED,
        Json(ActivityWriteResponse {
            id: activity.id,
            message: "Activity created successfully",
            sprint: activity.sprint,
            activity,
        }),
    ))
}

/// PUT /api/activities/:id
pub async fn handle_update_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(input): Json<ActivityInput>,
) -> Result<Json<ActivityWriteResponse>, AppError> {
    let activity = service::update_activity(&state.db, &user, id, input).await?;
    Ok(Json(ActivityWriteResponse {
        id: activity.id,
        message: "Activity updated successfully",
        sprint: activity.sprint,
        activity,
    }))
}

/// DELETE /api/activities/:id
pub async fn handle_delete_activity(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    service::delete_activity(&state.db, id).await?;
    Ok(Json(json!({ "message": "Activity deleted successfully" })))
}

/// PUT /api/activities/:id/archive
pub async fn handle_archive_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<ArchiveRequest>,
) -> Result<Json<ActivityRow>, AppError> {
    let activity = service::set_archived(&state.db, &user, id, req.archived).await?;
    Ok(Json(activity))
}

/// GET /api/activities/:id/history (also served at /my-history)
pub async fn handle_activity_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<EditHistoryRow>>, AppError> {
    let activity = service::require_activity(&state.db, id).await?;
    if !user.can_manage(activity.created_by) {
        return Err(AppError::Forbidden(
            "You can only view history for your own activities".to_string(),
        ));
    }
    let rows = history::list_for_activity(&state.db, id).await?;
    Ok(Json(rows))
}

/// GET /api/activities/audit/all-history
pub async fn handle_all_history(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<EditHistoryRow>>, AppError> {
    let rows = history::list_recent(&state.db).await?;
    Ok(Json(rows))
}

/// GET /api/activities/sprint-progress
pub async fn handle_sprint_progress(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<SprintProgress>>, AppError> {
    Ok(Json(progress::sprint_progress(&state.db).await?))
}

/// GET /api/analytics/dashboard
pub async fn handle_dashboard_analytics(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<DashboardAnalytics>, AppError> {
    Ok(Json(progress::dashboard_analytics(&state.db).await?))
}
