// tests/integration/repository/session_repository_tests.rs

use crate::common::db::TestDatabase;
use chrono::{TimeZone, Utc};
use legal_backend::features::auth::repositories::{SessionLookup, SessionRepository};
use uuid::Uuid;

#[tokio::test]
async fn test_find_session_by_token() {
    let db = TestDatabase::new().await;
    let repo = SessionRepository::new(db.connection.clone());
    let user_id = Uuid::new_v4();
    let session_id = Uuid::new_v4();

    db.execute(&format!(
        "INSERT INTO users (id, email, password_hash) VALUES ('{}', 'session@example.com', 'x');
         INSERT INTO sessions (id, user_id, token, expires_at)
         VALUES ('{}', '{}', 'token-abc', '2026-03-08T18:00:00+09:00');",
        user_id, session_id, user_id
    ))
    .await;

    let session = repo.find_session("token-abc").await.unwrap().unwrap();
    assert_eq!(session.id, session_id);
    assert_eq!(session.user_id, user_id);
    assert_eq!(
        session.expires_at,
        Utc.with_ymd_and_hms(2026, 3, 8, 9, 0, 0).unwrap()
    );
    assert!(!session.is_expired_at(Utc.with_ymd_and_hms(2026, 3, 8, 8, 59, 59).unwrap()));
    assert!(session.is_expired_at(Utc.with_ymd_and_hms(2026, 3, 8, 9, 0, 0).unwrap()));

    assert!(repo.find_session("unknown").await.unwrap().is_none());
}
