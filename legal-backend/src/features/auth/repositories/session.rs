// legal-backend/src/features/auth/repositories/session.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{entity::*, query::*, DbConn};
use uuid::Uuid;

use crate::error::AppResult;
use crate::features::auth::models::session::{self, Entity as SessionEntity};

/// 認証済みセッション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl ActiveSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// セッショントークンの解決。期限切れの判定は呼び出し側で行う
#[async_trait]
pub trait SessionLookup: Send + Sync {
    async fn find_session(&self, token: &str) -> AppResult<Option<ActiveSession>>;
}

#[derive(Clone)]
pub struct SessionRepository {
    db: DbConn,
}

impl SessionRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionLookup for SessionRepository {
    async fn find_session(&self, token: &str) -> AppResult<Option<ActiveSession>> {
        let session = SessionEntity::find()
            .filter(session::Column::Token.eq(token))
            .one(&self.db)
            .await?;

        Ok(session.map(|s| ActiveSession {
            id: s.id,
            user_id: s.user_id,
            expires_at: s.expires_at,
        }))
    }
}
