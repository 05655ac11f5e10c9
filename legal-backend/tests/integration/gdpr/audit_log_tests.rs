// tests/integration/gdpr/audit_log_tests.rs

use crate::common::app_helper::setup_app;
use crate::common::request::{get, post_json};
use crate::common::test_data::{grant_consent, seed_user};
use axum::http::StatusCode;
use legal_backend::features::gdpr::models::user_consent::ConsentType;
use serde_json::json;

#[tokio::test]
async fn test_audit_logs_are_scoped_to_the_caller() {
    let app = setup_app();
    let alice = seed_user(&app).await;
    let bob = seed_user(&app).await;
    grant_consent(&app, alice.id, ConsentType::DataProcessing).await;

    let (status, _) = post_json(&app.router, "/gdpr/export", &alice.token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_json(&app.router, "/gdpr/export", &bob.token, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = get(&app.router, "/gdpr/audit-logs", &alice.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    let entry = &body["entries"][0];
    assert_eq!(entry["eventType"], "gdpr.export");
    assert_eq!(entry["success"], true);
    assert_eq!(entry["sequence"], 0);
    assert_eq!(entry["timestamp"], "2026-03-01T09:00:00.000Z");
    assert_eq!(entry["prevHash"], "0".repeat(64));
    assert_eq!(entry["hash"].as_str().unwrap().len(), 64);

    let (_, body) = get(&app.router, "/gdpr/audit-logs", &bob.token).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["entries"][0]["success"], false);
    assert_eq!(body["entries"][0]["sequence"], 1);
    assert_eq!(body["entries"][0]["prevHash"], entry["hash"]);
}

#[tokio::test]
async fn test_audit_log_filters() {
    let app = setup_app();
    let user = seed_user(&app).await;

    // 失敗1件、成功3件
    let (status, _) = post_json(&app.router, "/gdpr/export", &user.token, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    grant_consent(&app, user.id, ConsentType::DataProcessing).await;
    for _ in 0..3 {
        let (status, _) = post_json(&app.router, "/gdpr/export", &user.token, json!({})).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = get(&app.router, "/gdpr/audit-logs?success=false", &user.token).await;
    assert_eq!(body["total"], 1);

    let (_, body) = get(&app.router, "/gdpr/audit-logs?limit=2", &user.token).await;
    assert_eq!(body["total"], 2);
    // 最新の2件を古い順に返す
    assert_eq!(body["entries"][0]["sequence"], 2);
    assert_eq!(body["entries"][1]["sequence"], 3);

    let (_, body) = get(
        &app.router,
        "/gdpr/audit-logs?eventType=consent.granted",
        &user.token,
    )
    .await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_invalid_limit_is_rejected() {
    let app = setup_app();
    let user = seed_user(&app).await;

    let (status, _) = get(&app.router, "/gdpr/audit-logs?limit=0", &user.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app.router, "/gdpr/audit-logs?limit=abc", &user.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
