#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use activity_tracker::collaboration::attachments::AttachmentStore;
use activity_tracker::config::Config;
use activity_tracker::db::{ensure_primary_admin, run_migrations};
use activity_tracker::mail::LogMailer;
use activity_tracker::routes::build_router;
use activity_tracker::state::AppState;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, Executor, PgPool};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_PASSWORD: &str = "admin-test-pw";

/// A router over a throwaway database. `None` when TEST_DATABASE_URL is unset.
pub struct TestApp {
    pub router: Router,
    pub db: PgPool,
    pub uploads: TempDir,
    admin_options: PgConnectOptions,
    db_name: String,
}

impl TestApp {
    pub async fn spawn() -> Option<Self> {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("skipping Postgres integration tests: TEST_DATABASE_URL not set");
            return None;
        };
        let base = PgConnectOptions::from_str(&url).ok()?;
        let admin_options = base.clone().database("postgres");
        let db_name = format!("activity_tracker_test_{}", Uuid::new_v4().simple());

        let mut admin = admin_options.connect().await.ok()?;
        admin
            .execute(format!("CREATE DATABASE \"{db_name}\"").as_str())
            .await
            .ok()?;

        let db = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(base.database(&db_name))
            .await
            .ok()?;
        run_migrations(&db).await.ok()?;
        ensure_primary_admin(&db, ADMIN_PASSWORD).await.ok()?;

        let uploads = TempDir::new().ok()?;
        let attachments = AttachmentStore::new(uploads.path().join("uploads"));
        attachments.ensure_dir().await.ok()?;

        let config = Config {
            database_url: String::new(),
            jwt_secret: "integration-test-secret".to_string(),
            token_ttl_hours: 1,
            upload_dir: attachments.root().to_path_buf(),
            admin_initial_password: ADMIN_PASSWORD.to_string(),
            mail_relay_url: None,
            mail_from: "Activity Tracker <test@example.com>".to_string(),
            daily_reminder_cron: "0 0 9 * * *".to_string(),
            weekly_reminder_cron: "0 0 9 * * Mon".to_string(),
            port: 0,
            rust_log: "info".to_string(),
        };

        let state = AppState {
            db: db.clone(),
            config,
            mailer: Arc::new(LogMailer),
            attachments,
        };

        Some(Self {
            router: build_router(state),
            db,
            uploads,
            admin_options,
            db_name,
        })
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login("admin", ADMIN_PASSWORD).await
    }

    /// Creates a client account and returns `(id, token)`.
    pub async fn client(&self, username: &str) -> (i64, String) {
        let admin = self.admin_token().await;
        let (status, body) = self
            .json(
                Method::POST,
                "/api/users",
                Some(&admin),
                Some(json!({
                    "username": username,
                    "password": "client-pw",
                    "role": "client"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create user failed: {body}");
        let id = body["id"].as_i64().unwrap();
        (id, self.login(username, "client-pw").await)
    }

    pub async fn create_activity(&self, token: &str, body: Value) -> (StatusCode, Value) {
        self.json(Method::POST, "/api/activities", Some(token), Some(body))
            .await
    }

    pub async fn cleanup(self) {
        let Self {
            db,
            admin_options,
            db_name,
            ..
        } = self;
        db.close().await;
        if let Ok(mut admin) = admin_options.connect().await {
            let _ = admin
                .execute(format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)").as_str())
                .await;
        }
    }
}

pub fn activity_body(name: &str, date: &str) -> Value {
    json!({
        "activity_name": name,
        "gxp_scope": "No",
        "priority": "High",
        "risk_level": "Low",
        "activity_date": date,
    })
}
