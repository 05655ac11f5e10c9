// legal-backend/src/features/audit/repositories/audit_log.rs

use async_trait::async_trait;
use sea_orm::{entity::*, query::*, DbConn};
use uuid::Uuid;

use crate::error::AppResult;
use crate::features::audit::models::audit_log::{
    self, ActiveModel as AuditLogActiveModel, AuditLogEntry, AuditLogFilter,
    Entity as AuditLogEntity,
};
use crate::features::audit::repositories::ledger::LedgerBackend;

/// PostgreSQL上の監査ログ。sequence と hash のユニーク制約で別プロセスからの分岐を防ぐ
#[derive(Clone)]
pub struct AuditLogRepository {
    db: DbConn,
}

impl AuditLogRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    fn filtered(filter: &AuditLogFilter) -> Select<AuditLogEntity> {
        let mut query = AuditLogEntity::find();
        if let Some(user_id) = filter.user_id {
            query = query.filter(audit_log::Column::UserId.eq(user_id));
        }
        if let Some(event_type) = &filter.event_type {
            query = query.filter(audit_log::Column::EventType.eq(event_type.as_str()));
        }
        if let Some(success) = filter.success {
            query = query.filter(audit_log::Column::Success.eq(success));
        }
        if let Some(since) = filter.since {
            query = query.filter(audit_log::Column::CreatedAt.gte(since));
        }
        if let Some(until) = filter.until {
            query = query.filter(audit_log::Column::CreatedAt.lt(until));
        }
        query
    }
}

#[async_trait]
impl LedgerBackend for AuditLogRepository {
    async fn last_entry(&self) -> AppResult<Option<AuditLogEntry>> {
        let entry = AuditLogEntity::find()
            .order_by_desc(audit_log::Column::Sequence)
            .one(&self.db)
            .await?;
        Ok(entry)
    }

    async fn insert(&self, entry: AuditLogEntry) -> AppResult<AuditLogEntry> {
        let active = AuditLogActiveModel {
            id: Set(entry.id),
            sequence: Set(entry.sequence),
            created_at: Set(entry.created_at),
            event_type: Set(entry.event_type),
            user_id: Set(entry.user_id),
            resource_type: Set(entry.resource_type),
            resource_id: Set(entry.resource_id),
            action: Set(entry.action),
            details: Set(entry.details),
            success: Set(entry.success),
            prev_hash: Set(entry.prev_hash),
            hash: Set(entry.hash),
        };
        Ok(active.insert(&self.db).await?)
    }

    async fn entries(&self) -> AppResult<Vec<AuditLogEntry>> {
        let entries = AuditLogEntity::find()
            .order_by_asc(audit_log::Column::Sequence)
            .all(&self.db)
            .await?;
        Ok(entries)
    }

    async fn query(&self, filter: &AuditLogFilter) -> AppResult<Vec<AuditLogEntry>> {
        let entries = match filter.limit {
            Some(limit) => {
                let mut latest = Self::filtered(filter)
                    .order_by_desc(audit_log::Column::Sequence)
                    .limit(limit)
                    .all(&self.db)
                    .await?;
                latest.reverse();
                latest
            }
            None => {
                Self::filtered(filter)
                    .order_by_asc(audit_log::Column::Sequence)
                    .all(&self.db)
                    .await?
            }
        };
        Ok(entries)
    }

    async fn count_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let count = AuditLogEntity::find()
            .filter(audit_log::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}
