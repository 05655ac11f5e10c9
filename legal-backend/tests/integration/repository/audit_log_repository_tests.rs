// tests/integration/repository/audit_log_repository_tests.rs

use crate::common::db::TestDatabase;
use chrono::{Duration, TimeZone, Utc};
use legal_backend::features::audit::models::audit_log::{
    AuditEvent, AuditLogBuilder, AuditLogFilter,
};
use legal_backend::features::audit::repositories::{AuditLogRepository, LedgerBackend};
use legal_backend::features::audit::services::AuditChain;
use legal_backend::shared::clock::ManualClock;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

async fn setup_chain() -> (TestDatabase, AuditLogRepository, AuditChain, ManualClock) {
    let db = TestDatabase::new().await;
    let repo = AuditLogRepository::new(db.connection.clone());
    // 秒未満を含む時刻でtimestamptzの精度を確認する
    let clock = ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::nanoseconds(123_456_789),
    );
    let chain = AuditChain::new(Arc::new(repo.clone()), Arc::new(clock.clone()));
    (db, repo, chain, clock)
}

#[tokio::test]
async fn test_chain_verifies_after_postgres_round_trip() {
    let (_db, repo, chain, clock) = setup_chain().await;
    let user_id = Uuid::new_v4();

    for i in 0..3 {
        chain
            .append(
                AuditLogBuilder::new(user_id, AuditEvent::GdprExport, "user_data")
                    .resource_id(user_id.to_string())
                    .details(json!({
                        "zeta": i,
                        "alpha": { "nested": [1, 2.5, "三"], "b": null },
                        "filePath": "/exports/a b.json",
                    }))
                    .build(),
            )
            .await
            .unwrap();
        clock.advance(Duration::milliseconds(1500));
    }

    let stored = repo.entries().await.unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0].sequence, 0);
    assert_eq!(stored[2].sequence, 2);
    assert_eq!(stored[1].prev_hash, stored[0].hash);
    assert_eq!(stored[0].created_at.timestamp_subsec_micros(), 123_456);
    assert_eq!(stored[0].details["alpha"]["nested"][2], "三");

    let report = chain.verify_integrity().await.unwrap();
    assert!(report.valid);
    assert_eq!(report.entries_checked, 3);
    assert_eq!(report.first_broken_index, None);
}

#[tokio::test]
async fn test_duplicate_sequence_is_rejected_by_database() {
    let (_db, repo, chain, _) = setup_chain().await;
    let user_id = Uuid::new_v4();

    let first = chain
        .append(AuditLogBuilder::new(user_id, AuditEvent::ConsentGranted, "consent").build())
        .await
        .unwrap();

    // 同じsequenceの分岐は一意制約で拒否される
    let mut fork = first.clone();
    fork.id = Uuid::new_v4();
    fork.hash = "f".repeat(64);
    assert!(repo.insert(fork).await.is_err());

    assert_eq!(repo.entries().await.unwrap().len(), 1);
    assert!(chain.verify_integrity().await.unwrap().valid);
}

#[tokio::test]
async fn test_query_filters_and_limit() {
    let (_db, repo, chain, clock) = setup_chain().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    for (user_id, event, success) in [
        (alice, AuditEvent::GdprExport, true),
        (bob, AuditEvent::GdprExport, true),
        (alice, AuditEvent::GdprExport, false),
        (alice, AuditEvent::GdprDelete, true),
    ] {
        chain
            .append(
                AuditLogBuilder::new(user_id, event, "user_data")
                    .success(success)
                    .build(),
            )
            .await
            .unwrap();
        clock.advance(Duration::minutes(1));
    }

    let alice_entries = repo.query(&AuditLogFilter::for_user(alice)).await.unwrap();
    assert_eq!(alice_entries.len(), 3);
    assert!(alice_entries.windows(2).all(|w| w[0].sequence < w[1].sequence));

    let failed = repo
        .query(&AuditLogFilter {
            success: Some(false),
            ..AuditLogFilter::for_user(alice)
        })
        .await
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].sequence, 2);

    // limit は新しい方から取り、昇順で返す
    let latest = repo
        .query(&AuditLogFilter {
            limit: Some(2),
            ..AuditLogFilter::for_user(alice)
        })
        .await
        .unwrap();
    let sequences: Vec<i64> = latest.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![2, 3]);

    assert_eq!(repo.count_for_user(alice).await.unwrap(), 3);
    assert_eq!(repo.count_for_user(bob).await.unwrap(), 1);
}
