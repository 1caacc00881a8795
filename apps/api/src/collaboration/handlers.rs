use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::collaboration::attachments::{
    self, content_disposition, multipart_error, read_upload, MAX_UPLOAD_BYTES,
};
use crate::collaboration::comments;
use crate::collaboration::dependencies::{self, NewDependency};
use crate::collaboration::notifications;
use crate::collaboration::templates::{self, NewTemplate};
use crate::errors::AppError;
use crate::mail::{compose, ActivityDigest, EmailKind};
use crate::models::collaboration::{
    AttachmentRow, CommentRow, DependencyRow, NotificationRow, TemplateRow,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewComment {
    pub comment_text: String,
}

#[derive(Debug, Deserialize)]
pub struct TestEmailRequest {
    pub email: String,
}

// ---- comments ----

/// GET /api/activities/:id/comments
pub async fn handle_list_comments(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(activity_id): Path<i64>,
) -> Result<Json<Vec<CommentRow>>, AppError> {
    Ok(Json(comments::list_comments(&state.db, activity_id).await?))
}

/// POST /api/activities/:id/comments
pub async fn handle_add_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(activity_id): Path<i64>,
    Json(req): Json<NewComment>,
) -> Result<(StatusCode, Json<CommentRow>), AppError> {
    let comment = comments::add_comment(&state.db, &user, activity_id, &req.comment_text).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// DELETE /api/comments/:id
pub async fn handle_delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    comments::delete_comment(&state.db, &user, id).await?;
    Ok(Json(json!({ "message": "Comment deleted successfully" })))
}

// ---- attachments ----

/// POST /api/activities/:id/attachments
pub async fn handle_upload_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(activity_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AttachmentRow>), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let upload = read_upload(field, MAX_UPLOAD_BYTES).await?;
        let row = attachments::store_attachment(
            &state.db,
            &state.attachments,
            &user,
            activity_id,
            upload,
        )
        .await?;
        return Ok((StatusCode::CREATED, Json(row)));
    }
    Err(AppError::Validation("No file uploaded".to_string()))
}

/// GET /api/activities/:id/attachments
pub async fn handle_list_attachments(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(activity_id): Path<i64>,
) -> Result<Json<Vec<AttachmentRow>>, AppError> {
    Ok(Json(
        attachments::list_attachments(&state.db, activity_id).await?,
    ))
}

/// GET /api/attachments/:id/download
pub async fn handle_download_attachment(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let (row, bytes) = attachments::load_attachment(&state.db, &state.attachments, id).await?;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, row.mime_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&row.original_name),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.into()))
}

/// DELETE /api/attachments/:id
pub async fn handle_delete_attachment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    attachments::delete_attachment(&state.db, &state.attachments, &user, id).await?;
    Ok(Json(json!({ "message": "Attachment deleted successfully" })))
}

// ---- dependencies ----

/// GET /api/activities/:id/dependencies
pub async fn handle_list_dependencies(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(activity_id): Path<i64>,
) -> Result<Json<Vec<DependencyRow>>, AppError> {
    Ok(Json(
        dependencies::list_dependencies(&state.db, activity_id).await?,
    ))
}

/// POST /api/activities/:id/dependencies
pub async fn handle_add_dependency(
    State(state): State<AppState>,
    user: AuthUser,
    Path(activity_id): Path<i64>,
    Json(req): Json<NewDependency>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let id = dependencies::add_dependency(&state.db, &user, activity_id, &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "message": "Dependency added successfully" })),
    ))
}

/// DELETE /api/dependencies/:id
pub async fn handle_delete_dependency(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    dependencies::delete_dependency(&state.db, id).await?;
    Ok(Json(json!({ "message": "Dependency removed successfully" })))
}

// ---- notifications ----

/// GET /api/notifications
pub async fn handle_list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<NotificationRow>>, AppError> {
    Ok(Json(
        notifications::list_for_user(&state.db, user.id).await?,
    ))
}

/// GET /api/notifications/unread-count
pub async fn handle_unread_count(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let count = notifications::unread_count(&state.db, user.id).await?;
    Ok(Json(json!({ "count": count })))
}

/// PUT /api/notifications/:id/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    notifications::mark_read(&state.db, user.id, id).await?;
    Ok(Json(json!({ "message": "Notification marked as read" })))
}

/// PUT /api/notifications/read-all
pub async fn handle_mark_all_read(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let updated = notifications::mark_all_read(&state.db, user.id).await?;
    Ok(Json(json!({ "message": "All notifications marked as read", "updated": updated })))
}

/// DELETE /api/notifications/clear-all
pub async fn handle_clear_all(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let deleted = notifications::clear_all(&state.db, user.id).await?;
    Ok(Json(json!({ "message": "All notifications cleared", "deleted": deleted })))
}

/// POST /api/notifications/test
///
/// Unlike activity emails this one is awaited, so the caller learns whether
/// the relay accepted it.
pub async fn handle_test_email(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<TestEmailRequest>,
) -> Result<Json<Value>, AppError> {
    let to = req.email.trim();
    if to.is_empty() || !to.contains('@') {
        return Err(AppError::Validation(
            "A valid email address is required".to_string(),
        ));
    }

    let digest = ActivityDigest {
        name: "Test Activity".to_string(),
        date: Utc::now().date_naive(),
        priority: Some("Medium".to_string()),
        status: Some("Planned".to_string()),
        department: None,
    };
    let message = compose(EmailKind::Assignment, &state.config.mail_from, to, &digest);
    state
        .mailer
        .send(&message)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    tracing::info!("Test email sent to {to} for {}", user.username);
    Ok(Json(json!({ "message": format!("Test email sent to {to}") })))
}

// ---- templates ----

/// GET /api/templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<TemplateRow>>, AppError> {
    Ok(Json(templates::list_templates(&state.db).await?))
}

/// POST /api/templates
pub async fn handle_create_template(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewTemplate>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let id = templates::create_template(&state.db, &user, &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "message": "Template created successfully" })),
    ))
}

/// DELETE /api/templates/:id
pub async fn handle_delete_template(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    templates::delete_template(&state.db, &user, id).await?;
    Ok(Json(json!({ "message": "Template deleted successfully" })))
}
