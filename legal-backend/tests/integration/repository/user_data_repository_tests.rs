// tests/integration/repository/user_data_repository_tests.rs

use crate::common::db::TestDatabase;
use chrono::{DateTime, TimeZone, Utc};
use legal_backend::features::audit::models::audit_log::{AuditEvent, AuditLogBuilder};
use legal_backend::features::audit::repositories::AuditLogRepository;
use legal_backend::features::audit::services::AuditChain;
use legal_backend::features::gdpr::models::user_data::{DeletionPlan, DeletionStep, UserTable};
use legal_backend::features::gdpr::repositories::{
    ConsentRepository, UserDataRepository, UserDataStore,
};
use legal_backend::features::gdpr::services::DataDeleter;
use legal_backend::shared::clock::ManualClock;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// シード済みの行数（users, sessions, cases, case_facts, notes, chat_conversations, chat_messages x2）
const SEEDED_ROWS: u64 = 8;

struct SeededUser {
    id: Uuid,
    case_id: Uuid,
}

async fn seed_user(db: &TestDatabase) -> SeededUser {
    let user = SeededUser {
        id: Uuid::new_v4(),
        case_id: Uuid::new_v4(),
    };
    let conversation_id = Uuid::new_v4();

    db.execute(&format!(
        "INSERT INTO users (id, email, name, password_hash, created_at)
         VALUES ('{user}', '{user}@example.com', 'Test User', 'hash', '2026-02-01T10:00:00+09:00');
         INSERT INTO sessions (id, user_id, token, expires_at)
         VALUES ('{session}', '{user}', 'token-{user}', '2026-03-08T00:00:00Z');
         INSERT INTO cases (id, user_id, title, description)
         VALUES ('{case}', '{user}', 'Deposit dispute', 'enc:v1:opaque');
         INSERT INTO case_facts (id, case_id, fact_content)
         VALUES ('{fact}', '{case}', 'Deposit was 1200 EUR');
         INSERT INTO notes (id, user_id, content)
         VALUES ('{note}', '{user}', 'Call the landlord');
         INSERT INTO chat_conversations (id, user_id, title)
         VALUES ('{conversation}', '{user}', 'Deposit');
         INSERT INTO chat_messages (id, conversation_id, role, content)
         VALUES ('{m1}', '{conversation}', 'user', 'Can they keep it?'),
                ('{m2}', '{conversation}', 'assistant', 'It depends.');",
        user = user.id,
        session = Uuid::new_v4(),
        case = user.case_id,
        fact = Uuid::new_v4(),
        note = Uuid::new_v4(),
        conversation = conversation_id,
        m1 = Uuid::new_v4(),
        m2 = Uuid::new_v4(),
    ))
    .await;

    user
}

async fn total_rows(repo: &UserDataRepository, user_id: Uuid) -> u64 {
    let mut total = 0;
    for table in UserTable::ALL {
        total += repo.count_rows(table, user_id).await.unwrap();
    }
    total
}

fn step(table: UserTable) -> DeletionStep {
    DeletionStep {
        table,
        scope: table.ownership(),
    }
}

#[tokio::test]
async fn test_fetch_rows_returns_json_objects() {
    let db = TestDatabase::new().await;
    let repo = UserDataRepository::new(db.connection.clone());
    let user = seed_user(&db).await;
    let other = seed_user(&db).await;

    let users = repo.fetch_rows(UserTable::Users, user.id).await.unwrap();
    assert_eq!(users.len(), 1);
    let profile = &users[0];
    assert_eq!(profile["id"], Value::String(user.id.to_string()));
    assert_eq!(profile["name"], "Test User");
    assert_eq!(profile["password_salt"], Value::Null);
    let created_at = profile["created_at"].as_str().unwrap();
    assert_eq!(
        DateTime::parse_from_rfc3339(created_at).unwrap(),
        Utc.with_ymd_and_hms(2026, 2, 1, 1, 0, 0).unwrap()
    );

    // 親テーブル経由の所有関係
    let facts = repo.fetch_rows(UserTable::CaseFacts, user.id).await.unwrap();
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0]["case_id"], Value::String(user.case_id.to_string()));
    assert_eq!(facts[0]["fact_content"], "Deposit was 1200 EUR");

    let messages = repo
        .fetch_rows(UserTable::ChatMessages, user.id)
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);

    assert_eq!(total_rows(&repo, user.id).await, SEEDED_ROWS);
    assert_eq!(total_rows(&repo, other.id).await, SEEDED_ROWS);
    assert_eq!(total_rows(&repo, Uuid::new_v4()).await, 0);
}

#[tokio::test]
async fn test_failed_step_rolls_back_earlier_steps() {
    let db = TestDatabase::new().await;
    let repo = UserDataRepository::new(db.connection.clone());
    let user = seed_user(&db).await;

    let mut txn = repo.begin_deletion().await.unwrap();
    assert_eq!(
        txn.delete_rows(&step(UserTable::Notes), user.id).await.unwrap(),
        1
    );
    assert_eq!(
        txn.delete_rows(&step(UserTable::ChatMessages), user.id)
            .await
            .unwrap(),
        2
    );
    // sessions と cases が残っているため外部キー制約で失敗する
    assert!(txn
        .delete_rows(&step(UserTable::Users), user.id)
        .await
        .is_err());
    txn.rollback().await.unwrap();

    assert_eq!(total_rows(&repo, user.id).await, SEEDED_ROWS);
    assert_eq!(repo.count_rows(UserTable::Notes, user.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_uncommitted_deletion_is_discarded_on_drop() {
    let db = TestDatabase::new().await;
    let repo = UserDataRepository::new(db.connection.clone());
    let user = seed_user(&db).await;

    {
        let mut txn = repo.begin_deletion().await.unwrap();
        txn.delete_rows(&step(UserTable::Notes), user.id)
            .await
            .unwrap();
    }

    assert_eq!(repo.count_rows(UserTable::Notes, user.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_standard_plan_deletes_everything_and_preserves_audit_logs() {
    let db = TestDatabase::new().await;
    let repo = UserDataRepository::new(db.connection.clone());
    let consents = ConsentRepository::new(db.connection.clone());
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
    let audit = Arc::new(AuditChain::new(
        Arc::new(AuditLogRepository::new(db.connection.clone())),
        Arc::new(clock),
    ));
    let deleter = DataDeleter::new(
        Arc::new(repo.clone()),
        Arc::new(consents),
        audit.clone(),
        DeletionPlan::standard(),
    );

    let user = seed_user(&db).await;
    let bystander = seed_user(&db).await;
    audit
        .append(AuditLogBuilder::new(user.id, AuditEvent::GdprExport, "user_data").build())
        .await
        .unwrap();

    let outcome = deleter.delete(user.id).await.unwrap();

    assert_eq!(outcome.total_deleted(), SEEDED_ROWS);
    assert_eq!(outcome.deleted_counts["chat_messages"], 2);
    assert_eq!(outcome.deleted_counts["users"], 1);
    assert_eq!(outcome.preserved_audit_logs, 1);
    assert_eq!(outcome.preserved_consents, 0);

    assert_eq!(total_rows(&repo, user.id).await, 0);
    assert_eq!(total_rows(&repo, bystander.id).await, SEEDED_ROWS);
    assert!(audit.verify_integrity().await.unwrap().valid);
}
