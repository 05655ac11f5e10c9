// tests/integration/gdpr/data_deletion_tests.rs

use crate::common::app_helper::{setup_app, setup_app_with};
use crate::common::request::{get, post_json};
use crate::common::test_data::{grant_consent, seed_user, user_row_count, SEEDED_ROWS};
use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Duration;
use legal_backend::error::AppResult;
use legal_backend::features::audit::models::audit_log::AuditLogFilter;
use legal_backend::features::gdpr::models::user_consent::ConsentType;
use legal_backend::features::gdpr::models::user_data::{DeletionStep, Row, UserTable};
use legal_backend::features::gdpr::repositories::{
    DeletionTransaction, InMemoryUserDataStore, UserDataStore,
};
use legal_backend::shared::clock::Clock;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// 指定テーブルの削除で長時間止まるストア
struct SlowStore {
    inner: InMemoryUserDataStore,
    stall_on: UserTable,
}

struct SlowTxn {
    inner: Box<dyn DeletionTransaction>,
    stall_on: UserTable,
}

#[async_trait]
impl UserDataStore for SlowStore {
    async fn fetch_rows(&self, table: UserTable, user_id: Uuid) -> AppResult<Vec<Row>> {
        self.inner.fetch_rows(table, user_id).await
    }

    async fn count_rows(&self, table: UserTable, user_id: Uuid) -> AppResult<u64> {
        self.inner.count_rows(table, user_id).await
    }

    async fn begin_deletion(&self) -> AppResult<Box<dyn DeletionTransaction>> {
        Ok(Box::new(SlowTxn {
            inner: self.inner.begin_deletion().await?,
            stall_on: self.stall_on,
        }))
    }
}

#[async_trait]
impl DeletionTransaction for SlowTxn {
    async fn delete_rows(&mut self, step: &DeletionStep, user_id: Uuid) -> AppResult<u64> {
        if step.table == self.stall_on {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        }
        self.inner.delete_rows(step, user_id).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.inner.rollback().await
    }
}

#[tokio::test]
async fn test_unconfirmed_deletion_is_rejected_and_audited_once() {
    let app = setup_app();
    let user = seed_user(&app).await;
    grant_consent(&app, user.id, ConsentType::DataErasureRequest).await;

    for body in [json!({}), json!({ "confirmed": false })] {
        let (status, response) = post_json(&app.router, "/gdpr/delete", &user.token, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response["detail"],
            "Deletion requires explicit confirmation (confirmed: true)"
        );
    }

    let entries = app
        .audit
        .query(&AuditLogFilter::for_user(user.id))
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        assert_eq!(entry.event_type, "gdpr.delete");
        assert_eq!(entry.action, "delete_denied");
        assert!(!entry.success);
        assert_eq!(entry.details["stage"], "confirmation");
    }

    // データは残り、削除の回数制限も消費されない
    assert_eq!(user_row_count(&app, user.id).await, SEEDED_ROWS);
    let (status, _) = post_json(
        &app.router,
        "/gdpr/delete",
        &user.token,
        json!({ "confirmed": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reason_with_control_characters_is_rejected_before_deleting() {
    let app = setup_app();
    let user = seed_user(&app).await;
    grant_consent(&app, user.id, ConsentType::DataErasureRequest).await;

    let (status, body) = post_json(
        &app.router,
        "/gdpr/delete",
        &user.token,
        json!({ "confirmed": true, "reason": "bye\u{0000}" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "reason: Control characters are not allowed");
    assert_eq!(user_row_count(&app, user.id).await, SEEDED_ROWS);

    let entries = app
        .audit
        .query(&AuditLogFilter::for_user(user.id))
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].details["stage"], "validation");
}

#[tokio::test]
async fn test_deletion_requires_erasure_consent() {
    let app = setup_app();
    let user = seed_user(&app).await;
    grant_consent(&app, user.id, ConsentType::DataProcessing).await;

    let (status, body) = post_json(
        &app.router,
        "/gdpr/delete",
        &user.token,
        json!({ "confirmed": true }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["detail"],
        "Active consent required for data_erasure_request"
    );
    assert_eq!(user_row_count(&app, user.id).await, SEEDED_ROWS);
}

#[tokio::test]
async fn test_deletion_with_pre_export() {
    let app = setup_app();
    let user = seed_user(&app).await;
    let bystander = seed_user(&app).await;
    grant_consent(&app, user.id, ConsentType::DataErasureRequest).await;

    let (status, body) = post_json(
        &app.router,
        "/gdpr/delete",
        &user.token,
        json!({
            "confirmed": true,
            "exportBeforeDelete": true,
            "reason": "Closing my account"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["deletionDate"], "2026-03-01T09:00:00.000Z");

    let export_path = body["exportPath"].as_str().unwrap();
    let exported = std::fs::read_to_string(export_path).unwrap();
    assert!(exported.contains(&user.case_id.to_string()));

    let counts = &body["deletedCounts"];
    assert_eq!(counts.as_object().unwrap().len(), 12);
    assert_eq!(counts["users"], 1);
    assert_eq!(counts["sessions"], 2);
    assert_eq!(counts["chat_messages"], 2);
    assert_eq!(counts["case_facts"], 1);
    let total: u64 = counts
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_u64().unwrap())
        .sum();
    assert_eq!(total, SEEDED_ROWS);

    // 事前エクスポートの監査ログが保持されている
    assert_eq!(body["preservedAuditLogs"], 1);
    assert_eq!(body["preservedConsents"], 1);

    assert_eq!(user_row_count(&app, user.id).await, 0);
    assert_eq!(user_row_count(&app, bystander.id).await, SEEDED_ROWS);

    let entries = app
        .audit
        .query(&AuditLogFilter::for_user(user.id))
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].event_type, "gdpr.export");
    assert_eq!(entries[0].details["trigger"], "pre_deletion");
    assert_eq!(entries[1].event_type, "gdpr.delete");
    assert_eq!(entries[1].id.to_string(), body["auditLogId"].as_str().unwrap());
    assert_eq!(entries[1].details["exportPath"], export_path);
    assert_eq!(entries[1].details["reason"], "Closing my account");
    assert!(app.audit.verify_integrity().await.unwrap().valid);

    // セッションも削除されたため以降は認証できない
    let (status, _) = get(&app.router, "/gdpr/consents", &user.token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deletion_without_pre_export_omits_export_path() {
    let app = setup_app();
    let user = seed_user(&app).await;
    grant_consent(&app, user.id, ConsentType::DataErasureRequest).await;

    let (status, body) = post_json(
        &app.router,
        "/gdpr/delete",
        &user.token,
        json!({ "confirmed": true }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("exportPath").is_none());
    assert_eq!(body["preservedAuditLogs"], 0);
    assert_eq!(std::fs::read_dir(app.export_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_deletion_is_limited_to_once_per_thirty_days() {
    let app = setup_app();
    let user = seed_user(&app).await;
    grant_consent(&app, user.id, ConsentType::DataErasureRequest).await;

    let (status, _) = post_json(
        &app.router,
        "/gdpr/delete",
        &user.token,
        json!({ "confirmed": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // 再ログインしたユーザーの2回目の削除
    app.clock.advance(Duration::days(1));
    let token = format!("relogin-{}", Uuid::new_v4().simple());
    app.user_data
        .insert_row(
            UserTable::Sessions,
            json!({
                "id": Uuid::new_v4().to_string(),
                "user_id": user.id.to_string(),
                "token": token,
                "expires_at": (app.clock.now() + Duration::days(1)).to_rfc3339(),
            }),
        )
        .await
        .unwrap();

    let (status, body) = post_json(
        &app.router,
        "/gdpr/delete",
        &token,
        json!({ "confirmed": true }),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body["detail"],
        "Rate limit exceeded for delete. Try again after 2026-03-31T09:00:00.000Z"
    );
    // 拒否されたため新しいセッションは残っている
    assert_eq!(
        app.user_data.count_rows(UserTable::Sessions, user.id).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_timed_out_deletion_rolls_back() {
    let app = setup_app_with(
        |config| config.operation_timeout = std::time::Duration::from_millis(200),
        |store| {
            Arc::new(SlowStore {
                inner: store,
                stall_on: UserTable::Users,
            }) as Arc<dyn UserDataStore>
        },
    );
    let user = seed_user(&app).await;
    grant_consent(&app, user.id, ConsentType::DataErasureRequest).await;

    let (status, body) = post_json(
        &app.router,
        "/gdpr/delete",
        &user.token,
        json!({ "confirmed": true }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "An internal server error occurred");

    // 途中までの削除も含めてすべて元に戻っている
    assert_eq!(user_row_count(&app, user.id).await, SEEDED_ROWS);

    let entries = app
        .audit
        .query(&AuditLogFilter::for_user(user.id))
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].success);
    assert_eq!(entries[0].details["stage"], "delete");
    assert_eq!(entries[0].details["error"], "transaction_failure");
}
