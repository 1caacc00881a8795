use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::error;

use crate::state::AppState;

/// GET /health
/// Reports database reachability and the number of user accounts.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let users: Result<i64, sqlx::Error> = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await;

    match users {
        Ok(users) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "database": "connected",
                "users": users,
                "timestamp": Utc::now().to_rfc3339(),
            })),
        ),
        Err(e) => {
            error!("Health check failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "database": "unavailable",
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
        }
    }
}
