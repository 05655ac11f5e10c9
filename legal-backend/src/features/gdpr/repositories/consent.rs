// legal-backend/src/features/gdpr/repositories/consent.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{entity::*, query::*, DbConn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::features::gdpr::models::user_consent::{
    self, ActiveModel as ConsentActiveModel, Entity as ConsentEntity, Model as ConsentModel,
};

/// 同意レコードの保存先。行の削除操作は持たない
#[async_trait]
pub trait ConsentStore: Send + Sync {
    /// (user, type) の最新レコード
    async fn latest(&self, user_id: Uuid, consent_type: &str) -> AppResult<Option<ConsentModel>>;

    async fn insert(&self, consent: ConsentModel) -> AppResult<ConsentModel>;

    /// revoked_at を設定する
    async fn mark_revoked(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<ConsentModel>;

    /// ユーザーの全レコード（作成順）
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<ConsentModel>>;

    async fn count_for_user(&self, user_id: Uuid) -> AppResult<u64>;
}

#[derive(Clone)]
pub struct ConsentRepository {
    db: DbConn,
}

impl ConsentRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConsentStore for ConsentRepository {
    async fn latest(&self, user_id: Uuid, consent_type: &str) -> AppResult<Option<ConsentModel>> {
        let consent = ConsentEntity::find()
            .filter(user_consent::Column::UserId.eq(user_id))
            .filter(user_consent::Column::ConsentType.eq(consent_type))
            .order_by_desc(user_consent::Column::CreatedAt)
            .one(&self.db)
            .await?;
        Ok(consent)
    }

    async fn insert(&self, consent: ConsentModel) -> AppResult<ConsentModel> {
        let active = ConsentActiveModel {
            id: Set(consent.id),
            user_id: Set(consent.user_id),
            consent_type: Set(consent.consent_type),
            is_granted: Set(consent.is_granted),
            granted_at: Set(consent.granted_at),
            revoked_at: Set(consent.revoked_at),
            ip_address: Set(consent.ip_address),
            user_agent: Set(consent.user_agent),
            created_at: Set(consent.created_at),
            updated_at: Set(consent.updated_at),
        };
        Ok(active.insert(&self.db).await?)
    }

    async fn mark_revoked(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<ConsentModel> {
        let consent = ConsentEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Consent {} not found", id)))?;

        let mut active: ConsentActiveModel = consent.into();
        active.revoked_at = Set(Some(at));
        active.updated_at = Set(at);
        Ok(active.update(&self.db).await?)
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<ConsentModel>> {
        let consents = ConsentEntity::find()
            .filter(user_consent::Column::UserId.eq(user_id))
            .order_by_asc(user_consent::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(consents)
    }

    async fn count_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let count = ConsentEntity::find()
            .filter(user_consent::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}
