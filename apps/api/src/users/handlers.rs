//! Admin-only user management plus the shared user picker.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::password::hash_password;
use crate::auth::{AdminUser, AuthUser, Role};
use crate::db::PRIMARY_ADMIN_ID;
use crate::errors::{is_unique_violation, AppError};
use crate::models::user::{UserOption, UserSummary};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
}

/// GET /api/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let users = sqlx::query_as::<_, UserSummary>(
        "SELECT id, username, email, role, notify_email, created_at FROM users ORDER BY id",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(users))
}

/// GET /api/users/list
pub async fn handle_user_options(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<UserOption>>, AppError> {
    let users =
        sqlx::query_as::<_, UserOption>("SELECT id, username, role FROM users ORDER BY username")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(users))
}

/// POST /api/users
pub async fn handle_create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<CreatedUser>, AppError> {
    let username = req.username.trim().to_string();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Username, password, and role are required".to_string(),
        ));
    }
    let email = req.email.filter(|e| !e.trim().is_empty());

    let hash = hash_password(&req.password)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to hash password: {e}")))?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (username, password_hash, email, role) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&username)
    .bind(hash)
    .bind(&email)
    .bind(req.role.as_str())
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Validation("Username already exists".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    info!("Admin {} created user {username} ({})", admin.username, req.role.as_str());
    Ok(Json(CreatedUser {
        id,
        username,
        email,
        role: req.role,
    }))
}

/// DELETE /api/users/:id
pub async fn handle_delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if user_id == PRIMARY_ADMIN_ID {
        return Err(AppError::Validation(
            "Cannot delete the main admin user".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    info!("Admin {} deleted user {user_id}", admin.username);
    Ok(Json(json!({ "message": "User deleted successfully" })))
}
