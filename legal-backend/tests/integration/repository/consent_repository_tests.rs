// tests/integration/repository/consent_repository_tests.rs

use crate::common::db::TestDatabase;
use chrono::{Duration, TimeZone, Utc};
use legal_backend::features::gdpr::models::user_consent::ConsentType;
use legal_backend::features::gdpr::repositories::{ConsentRepository, ConsentStore};
use legal_backend::features::gdpr::services::ConsentGate;
use legal_backend::shared::clock::ManualClock;
use std::sync::Arc;
use uuid::Uuid;

async fn setup_gate() -> (TestDatabase, ConsentRepository, ConsentGate, ManualClock) {
    let db = TestDatabase::new().await;
    let repo = ConsentRepository::new(db.connection.clone());
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
    let gate = ConsentGate::new(Arc::new(repo.clone()), Arc::new(clock.clone()));
    (db, repo, gate, clock)
}

#[tokio::test]
async fn test_latest_record_decides_active_consent() {
    let (_db, repo, gate, clock) = setup_gate().await;
    let user_id = Uuid::new_v4();
    let consent_type = ConsentType::DataProcessing;

    assert!(repo.latest(user_id, consent_type.as_str()).await.unwrap().is_none());

    let granted = gate
        .grant(user_id, &consent_type, Some("203.0.113.7".into()), None)
        .await
        .unwrap();
    assert!(granted.changed);
    assert!(gate.has_active_consent(user_id, &consent_type).await.unwrap());

    clock.advance(Duration::hours(1));
    let revoked = gate.revoke(user_id, &consent_type).await.unwrap();
    assert!(revoked.changed);
    assert!(!gate.has_active_consent(user_id, &consent_type).await.unwrap());

    // 撤回は行を更新するだけで削除しない
    let latest = repo
        .latest(user_id, consent_type.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, granted.record.unwrap().id);
    assert_eq!(
        latest.revoked_at,
        Some(Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap())
    );
    assert_eq!(latest.ip_address.as_deref(), Some("203.0.113.7"));

    // 再付与は新しいレコードになり、最新として扱われる
    clock.advance(Duration::hours(1));
    let regranted = gate.grant(user_id, &consent_type, None, None).await.unwrap();
    assert!(regranted.changed);
    assert!(gate.has_active_consent(user_id, &consent_type).await.unwrap());

    let history = repo.list_for_user(user_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].revoked_at.is_some());
    assert!(history[1].is_active());
    assert_eq!(repo.count_for_user(user_id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_consent_types_are_independent() {
    let (_db, repo, gate, _) = setup_gate().await;
    let user_id = Uuid::new_v4();

    gate.grant(user_id, &ConsentType::Marketing, None, None)
        .await
        .unwrap();

    assert!(!gate
        .has_active_consent(user_id, &ConsentType::DataProcessing)
        .await
        .unwrap());
    assert!(repo
        .latest(user_id, ConsentType::DataErasureRequest.as_str())
        .await
        .unwrap()
        .is_none());
    assert_eq!(repo.count_for_user(Uuid::new_v4()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_revoking_unknown_consent_record_is_not_found() {
    let (_db, repo, _, _) = setup_gate().await;
    assert!(repo.mark_revoked(Uuid::new_v4(), Utc::now()).await.is_err());
}
