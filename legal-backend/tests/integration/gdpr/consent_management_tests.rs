// tests/integration/gdpr/consent_management_tests.rs

use crate::common::app_helper::setup_app;
use crate::common::request::{create_request, get, post_json, send};
use crate::common::test_data::seed_user;
use axum::http::StatusCode;
use chrono::Duration;
use legal_backend::features::audit::models::audit_log::AuditLogFilter;
use serde_json::json;

#[tokio::test]
async fn test_grant_enables_export() {
    let app = setup_app();
    let user = seed_user(&app).await;

    let (status, _) = post_json(&app.router, "/gdpr/export", &user.token, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = post_json(
        &app.router,
        "/gdpr/consents",
        &user.token,
        json!({ "consentType": "data_processing", "granted": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "consentType": "data_processing", "granted": true })
    );

    let (status, _) = post_json(&app.router, "/gdpr/export", &user.token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_revoke_keeps_history() {
    let app = setup_app();
    let user = seed_user(&app).await;

    let grant = json!({ "consentType": "marketing", "granted": true });
    let revoke = json!({ "consentType": "marketing", "granted": false });

    let (status, _) = post_json(&app.router, "/gdpr/consents", &user.token, grant.clone()).await;
    assert_eq!(status, StatusCode::OK);
    app.clock.advance(Duration::minutes(1));
    let (status, _) = post_json(&app.router, "/gdpr/consents", &user.token, revoke).await;
    assert_eq!(status, StatusCode::OK);
    app.clock.advance(Duration::minutes(1));
    let (status, _) = post_json(&app.router, "/gdpr/consents", &user.token, grant).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&app.router, "/gdpr/consents", &user.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);

    let consents = body["consents"].as_array().unwrap();
    // 新しい順
    assert_eq!(consents[0]["active"], true);
    assert!(consents[0]["revokedAt"].is_null());
    assert_eq!(consents[1]["active"], false);
    assert_eq!(consents[1]["revokedAt"], "2026-03-01T09:01:00.000Z");
    assert_eq!(consents[1]["grantedAt"], "2026-03-01T09:00:00.000Z");

    let entries = app
        .audit
        .query(&AuditLogFilter::for_user(user.id))
        .await
        .unwrap();
    let events: Vec<&str> = entries.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(
        events,
        vec!["consent.granted", "consent.revoked", "consent.granted"]
    );
    assert!(entries.iter().all(|e| e.success));
    assert_eq!(entries[0].resource_type, "user_consents");
}

#[tokio::test]
async fn test_repeated_grant_is_idempotent() {
    let app = setup_app();
    let user = seed_user(&app).await;
    let grant = json!({ "consentType": "analytics", "granted": true });

    for _ in 0..2 {
        let (status, _) =
            post_json(&app.router, "/gdpr/consents", &user.token, grant.clone()).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = get(&app.router, "/gdpr/consents", &user.token).await;
    assert_eq!(body["total"], 1);

    let entries = app
        .audit
        .query(&AuditLogFilter::for_user(user.id))
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].details["changed"], true);
    assert_eq!(entries[1].details["changed"], false);
}

#[tokio::test]
async fn test_consent_records_client_info() {
    let app = setup_app();
    let user = seed_user(&app).await;

    let mut request = create_request(
        "POST",
        "/gdpr/consents",
        Some(&user.token),
        Some(json!({ "consentType": "ai_training", "granted": true })),
    );
    request
        .headers_mut()
        .insert("X-Forwarded-For", "198.51.100.4, 10.0.0.1".parse().unwrap());
    request
        .headers_mut()
        .insert("User-Agent", "legal-app/2.1".parse().unwrap());
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&app.router, "/gdpr/consents", &user.token).await;
    assert_eq!(body["consents"][0]["consentType"], "ai_training");

    let entries = app
        .audit
        .query(&AuditLogFilter::for_user(user.id))
        .await
        .unwrap();
    assert_eq!(entries[0].details["ipAddress"], "198.51.100.4");
}

#[tokio::test]
async fn test_invalid_consent_type_is_rejected() {
    let app = setup_app();
    let user = seed_user(&app).await;

    let (status, body) = post_json(
        &app.router,
        "/gdpr/consents",
        &user.token,
        json!({ "consentType": "", "granted": true }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("Consent type must be between 1 and 64 characters"));
}
