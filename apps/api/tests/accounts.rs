mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use activity_tracker::db::ensure_primary_admin;
use common::{activity_body, TestApp, ADMIN_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");

    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "nobody", "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.admin_token().await;
    let (status, me) = app
        .json(Method::GET, "/api/auth/me", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "admin");
    assert_eq!(me["role"], "admin");

    let (status, _) = app
        .json(Method::GET, "/api/auth/me", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.cleanup().await;
}

#[tokio::test]
async fn password_change_requires_current_password() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let token = app.admin_token().await;

    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/change-password",
            Some(&token),
            Some(json!({ "currentPassword": "guess", "newPassword": "n3w" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/change-password",
            Some(&token),
            Some(json!({ "currentPassword": ADMIN_PASSWORD, "newPassword": "n3w-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    app.login("admin", "n3w-secret").await;

    app.cleanup().await;
}

#[tokio::test]
async fn user_administration_rules() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let admin = app.admin_token().await;
    let (carol_id, carol) = app.client("carol").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/users",
            Some(&admin),
            Some(json!({ "username": "carol", "password": "pw", "role": "client" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Username already exists");

    let (status, _) = app
        .json(Method::GET, "/api/users", Some(&carol), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, options) = app
        .json(Method::GET, "/api/users/list", Some(&carol), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(options.as_array().unwrap().len(), 2);

    let (status, body) = app
        .json(Method::DELETE, "/api/users/1", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Cannot delete the main admin user");

    let (status, _) = app
        .json(
            Method::DELETE,
            &format!("/api/users/{carol_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .json(
            Method::DELETE,
            &format!("/api/users/{carol_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.cleanup().await;
}

#[tokio::test]
async fn health_reports_database_and_user_count() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (status, body) = app.json(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["users"], 1);

    app.cleanup().await;
}

#[tokio::test]
async fn bootstrap_admin_is_created_only_once() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let token = app.admin_token().await;
    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/change-password",
            Some(&token),
            Some(json!({ "currentPassword": ADMIN_PASSWORD, "newPassword": "rotated-pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // a restart must neither recreate nor reset the existing admin
    let created = ensure_primary_admin(&app.db, "admin123").await.unwrap();
    assert!(!created);
    app.login("admin", "rotated-pw").await;

    sqlx::query("DELETE FROM users WHERE id = 1")
        .execute(&app.db)
        .await
        .unwrap();
    assert!(ensure_primary_admin(&app.db, "fresh-pw").await.unwrap());
    assert!(!ensure_primary_admin(&app.db, "fresh-pw").await.unwrap());
    app.login("admin", "fresh-pw").await;

    app.cleanup().await;
}

#[tokio::test]
async fn health_hides_database_errors() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    // the router shares this pool
    app.db.close().await;

    let (status, body) = app.json(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["database"], "unavailable");
    assert!(body.get("error").is_none(), "{body}");
    assert_eq!(body.as_object().unwrap().len(), 3);

    app.cleanup().await;
}

#[tokio::test]
async fn exports_return_documents() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (_, alice) = app.client("alice").await;
    let mut body = activity_body("Renew licences", "2025-09-30");
    body["tco_value"] = json!(1250.5);
    body["it_type"] = json!("Corp IT");
    app.create_activity(&alice, body).await;

    for (path, content_type, filename, magic) in [
        ("/api/export/pdf", "application/pdf", "activities.pdf", &b"%PDF"[..]),
        (
            "/api/export/excel",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "activities.xlsx",
            &b"PK"[..],
        ),
    ] {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {alice}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "sprint": 3 }).to_string()))
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        assert_eq!(response.headers()[header::CONTENT_TYPE], content_type);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            format!("attachment; filename={filename}").as_str()
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.starts_with(magic), "{path}");
    }

    let (status, analytics) = app
        .json(Method::GET, "/api/analytics/dashboard", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analytics["itTypeComparison"][0]["it_type"], "Corp IT");
    assert_eq!(analytics["tcoSummary"][0]["total_tco"], 1250.5);
    assert_eq!(analytics["priorityDistribution"][0]["count"], 1);

    app.cleanup().await;
}
