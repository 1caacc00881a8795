mod common;

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use common::{activity_body, TestApp};
use serde_json::{json, Value};

const BOUNDARY: &str = "activity-tracker-test-boundary";

fn multipart_request(uri: &str, token: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn stored_files(app: &TestApp) -> usize {
    std::fs::read_dir(app.uploads.path().join("uploads"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

async fn new_activity(app: &TestApp, token: &str, name: &str) -> i64 {
    let (status, body) = app
        .create_activity(token, activity_body(name, "2025-03-14"))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn attachment_upload_download_delete() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (_, alice) = app.client("alice").await;
    let (_, bob) = app.client("bob").await;
    let id = new_activity(&app, &alice, "Firewall review").await;
    let uri = format!("/api/activities/{id}/attachments");

    let response = app
        .send(multipart_request(&uri, &alice, "rules.csv", b"port,action\n22,deny\n"))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let row: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(row["original_name"], "rules.csv");
    assert_eq!(row["mime_type"], "text/csv");
    assert_eq!(row["file_size"], 20);
    assert_ne!(row["filename"], "rules.csv");
    let attachment_id = row["id"].as_i64().unwrap();
    assert_eq!(stored_files(&app), 1);

    let download = Request::builder()
        .uri(format!("/api/attachments/{attachment_id}/download"))
        .header(header::AUTHORIZATION, format!("Bearer {bob}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(download).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"rules.csv\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"port,action\n22,deny\n");

    let delete_uri = format!("/api/attachments/{attachment_id}");
    let (status, _) = app.json(Method::DELETE, &delete_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .json(Method::DELETE, &delete_uri, Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored_files(&app), 0);

    let (status, _) = app
        .json(
            Method::GET,
            &format!("/api/attachments/{attachment_id}/download"),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.cleanup().await;
}

#[tokio::test]
async fn oversized_upload_writes_nothing() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (_, alice) = app.client("alice").await;
    let id = new_activity(&app, &alice, "Large upload").await;

    let data = vec![b'x'; 10 * 1024 * 1024 + 1];
    let response = app
        .send(multipart_request(
            &format!("/api/activities/{id}/attachments"),
            &alice,
            "big.bin",
            &data,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(stored_files(&app), 0);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attachments")
        .fetch_one(&app.db)
        .await
        .unwrap();
    assert_eq!(count, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn comments_are_deleted_by_author_or_admin() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (_, alice) = app.client("alice").await;
    let (_, bob) = app.client("bob").await;
    let admin = app.admin_token().await;
    let id = new_activity(&app, &alice, "Backup restore drill").await;
    let uri = format!("/api/activities/{id}/comments");

    let (status, _) = app
        .json(Method::POST, &uri, Some(&bob), Some(json!({ "comment_text": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, first) = app
        .json(
            Method::POST,
            &uri,
            Some(&bob),
            Some(json!({ "comment_text": " first " })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["comment_text"], "first");
    assert_eq!(first["username"], "bob");

    let (_, second) = app
        .json(
            Method::POST,
            &uri,
            Some(&alice),
            Some(json!({ "comment_text": "second" })),
        )
        .await;

    let (_, listed) = app.json(Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(listed[0]["comment_text"], "second");
    assert_eq!(listed[1]["comment_text"], "first");

    let bob_comment = format!("/api/comments/{}", first["id"]);
    let (status, _) = app
        .json(Method::DELETE, &bob_comment, Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .json(Method::DELETE, &bob_comment, Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let alice_comment = format!("/api/comments/{}", second["id"]);
    let (status, _) = app
        .json(Method::DELETE, &alice_comment, Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/activities/999999/comments",
            Some(&alice),
            Some(json!({ "comment_text": "orphan" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.cleanup().await;
}

#[tokio::test]
async fn assignment_lands_in_the_owners_feed() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (alice_id, alice) = app.client("alice").await;
    let admin = app.admin_token().await;

    let mut body = activity_body("Migrate mailboxes", "2025-08-01");
    body["assigned_to"] = json!(alice_id);
    let (status, created) = app.create_activity(&admin, body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["activity"]["created_by"], alice_id);

    // announcements run detached from the request
    let mut feed = Value::Null;
    for _ in 0..50 {
        let (_, body) = app
            .json(Method::GET, "/api/notifications", Some(&alice), None)
            .await;
        if body.as_array().is_some_and(|n| !n.is_empty()) {
            feed = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(feed[0]["type"], "assignment");
    assert_eq!(feed[0]["is_read"], false);

    let (_, unread) = app
        .json(Method::GET, "/api/notifications/unread-count", Some(&alice), None)
        .await;
    assert_eq!(unread["count"], 1);

    let (status, _) = app
        .json(Method::PUT, "/api/notifications/read-all", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, unread) = app
        .json(Method::GET, "/api/notifications/unread-count", Some(&alice), None)
        .await;
    assert_eq!(unread["count"], 0);

    let (status, _) = app
        .json(Method::DELETE, "/api/notifications/clear-all", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, feed) = app
        .json(Method::GET, "/api/notifications", Some(&alice), None)
        .await;
    assert!(feed.as_array().unwrap().is_empty());

    app.cleanup().await;
}

#[tokio::test]
async fn dependencies_link_existing_activities() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (_, alice) = app.client("alice").await;
    let blocked = new_activity(&app, &alice, "Upgrade ERP").await;
    let blocker = new_activity(&app, &alice, "Freeze change window").await;
    let uri = format!("/api/activities/{blocked}/dependencies");

    let (status, _) = app
        .json(
            Method::POST,
            &uri,
            Some(&alice),
            Some(json!({ "depends_on_activity_id": 999999 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, added) = app
        .json(
            Method::POST,
            &uri,
            Some(&alice),
            Some(json!({ "depends_on_activity_id": blocker })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, listed) = app.json(Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(listed[0]["dependency_type"], "blocks");
    assert_eq!(listed[0]["depends_on_name"], "Freeze change window");
    assert_eq!(listed[0]["depends_on_status"], "Planned");

    let delete_uri = format!("/api/dependencies/{}", added["id"]);
    let (status, _) = app
        .json(Method::DELETE, &delete_uri, Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .json(Method::DELETE, &delete_uri, Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.cleanup().await;
}

#[tokio::test]
async fn templates_belong_to_their_creator() {
    let Some(app) = TestApp::spawn().await else {
        return;
    };
    let (_, alice) = app.client("alice").await;
    let (_, bob) = app.client("bob").await;

    let (status, _) = app
        .json(
            Method::POST,
            "/api/templates",
            Some(&alice),
            Some(json!({ "template_name": "  " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = app
        .json(
            Method::POST,
            "/api/templates",
            Some(&alice),
            Some(json!({
                "template_name": "Monthly patching",
                "priority": "Medium",
                "department": "Local IT"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, listed) = app
        .json(Method::GET, "/api/templates", Some(&bob), None)
        .await;
    assert_eq!(listed[0]["created_by_name"], "alice");
    assert_eq!(listed[0]["priority"], "Medium");

    let uri = format!("/api/templates/{}", created["id"]);
    let (status, _) = app.json(Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.json(Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    app.cleanup().await;
}
