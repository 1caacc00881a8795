pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::activities::handlers as activities;
use crate::auth::handlers as auth;
use crate::collaboration::attachments::MAX_UPLOAD_BYTES;
use crate::collaboration::handlers as collab;
use crate::export;
use crate::state::AppState;
use crate::users::handlers as users;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/auth/login", post(auth::handle_login))
        .route("/api/auth/me", get(auth::handle_me))
        .route(
            "/api/auth/change-password",
            post(auth::handle_change_password),
        )
        .route(
            "/api/auth/update-notification-email",
            post(auth::handle_update_notification_email),
        )
        // Users
        .route(
            "/api/users",
            get(users::handle_list_users).post(users::handle_create_user),
        )
        .route("/api/users/list", get(users::handle_user_options))
        .route("/api/users/:id", delete(users::handle_delete_user))
        // Activities
        .route(
            "/api/activities",
            get(activities::handle_list_all).post(activities::handle_create_activity),
        )
        .route("/api/activities/my", get(activities::handle_list_mine))
        .route("/api/activities/shared", get(activities::handle_list_shared))
        .route(
            "/api/activities/sprint-progress",
            get(activities::handle_sprint_progress),
        )
        .route(
            "/api/activities/audit/all-history",
            get(activities::handle_all_history),
        )
        .route(
            "/api/activities/:id",
            get(activities::handle_get_activity)
                .put(activities::handle_update_activity)
                .delete(activities::handle_delete_activity),
        )
        .route(
            "/api/activities/:id/archive",
            put(activities::handle_archive_activity),
        )
        .route(
            "/api/activities/:id/history",
            get(activities::handle_activity_history),
        )
        .route(
            "/api/activities/:id/my-history",
            get(activities::handle_activity_history),
        )
        .route(
            "/api/analytics/dashboard",
            get(activities::handle_dashboard_analytics),
        )
        // Comments
        .route(
            "/api/activities/:id/comments",
            get(collab::handle_list_comments).post(collab::handle_add_comment),
        )
        .route("/api/comments/:id", delete(collab::handle_delete_comment))
        // Attachments
        .route(
            "/api/activities/:id/attachments",
            get(collab::handle_list_attachments).post(collab::handle_upload_attachment).layer(
                DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD),
            ),
        )
        .route(
            "/api/attachments/:id/download",
            get(collab::handle_download_attachment),
        )
        .route(
            "/api/attachments/:id",
            delete(collab::handle_delete_attachment),
        )
        // Dependencies
        .route(
            "/api/activities/:id/dependencies",
            get(collab::handle_list_dependencies).post(collab::handle_add_dependency),
        )
        .route(
            "/api/dependencies/:id",
            delete(collab::handle_delete_dependency),
        )
        // Notifications
        .route("/api/notifications", get(collab::handle_list_notifications))
        .route(
            "/api/notifications/unread-count",
            get(collab::handle_unread_count),
        )
        .route(
            "/api/notifications/read-all",
            put(collab::handle_mark_all_read),
        )
        .route(
            "/api/notifications/clear-all",
            delete(collab::handle_clear_all),
        )
        .route("/api/notifications/test", post(collab::handle_test_email))
        .route(
            "/api/notifications/:id/read",
            put(collab::handle_mark_read),
        )
        // Templates
        .route(
            "/api/templates",
            get(collab::handle_list_templates).post(collab::handle_create_template),
        )
        .route(
            "/api/templates/:id",
            delete(collab::handle_delete_template),
        )
        // Export
        .route("/api/export/pdf", post(export::handle_export_pdf))
        .route("/api/export/excel", post(export::handle_export_excel))
        .with_state(state)
}
