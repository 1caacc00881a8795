//! Axum route handlers for login and self-service account settings.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::issue_token;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::{UserProfile, UserRow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEmailRequest {
    pub notify_email: Option<String>,
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = $1")
        .bind(req.username.trim())
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_token(
        user.id,
        &user.username,
        user.role(),
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to sign token: {e}")))?;

    info!("User {} logged in", user.username);
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// GET /api/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserProfile>, AppError> {
    let profile = sqlx::query_as::<_, UserProfile>(
        "SELECT id, username, email, role, notify_email FROM users WHERE id = $1",
    )
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(profile))
}

/// POST /api/auth/change-password
///
/// The current password must be proven again before the hash is rotated.
pub async fn handle_change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    if req.new_password.trim().is_empty() {
        return Err(AppError::Validation(
            "New password cannot be empty".to_string(),
        ));
    }

    let stored: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !verify_password(&req.current_password, &stored) {
        return Err(AppError::InvalidCredentials);
    }

    let hash = hash_password(&req.new_password)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to hash password: {e}")))?;
    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(hash)
        .bind(user.id)
        .execute(&state.db)
        .await?;

    info!("User {} changed their password", user.username);
    Ok(Json(json!({ "message": "Password updated successfully" })))
}

/// POST /api/auth/update-notification-email
pub async fn handle_update_notification_email(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NotificationEmailRequest>,
) -> Result<Json<Value>, AppError> {
    let email = req
        .notify_email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    if let Some(address) = &email {
        if !address.contains('@') {
            return Err(AppError::Validation(
                "Notification email must be a valid address".to_string(),
            ));
        }
    }

    sqlx::query("UPDATE users SET notify_email = $1 WHERE id = $2")
        .bind(email)
        .bind(user.id)
        .execute(&state.db)
        .await?;

    Ok(Json(
        json!({ "message": "Notification email updated successfully" }),
    ))
}
