// legal-backend/src/features/audit/repositories/ledger.rs

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::features::audit::models::audit_log::{AuditLogEntry, AuditLogFilter};

/// 監査ログの保存先。追記と読み取りだけを公開し、既存エントリの更新・削除手段は持たない
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// 最新（sequence最大）のエントリ
    async fn last_entry(&self) -> AppResult<Option<AuditLogEntry>>;

    /// エントリを末尾に追加する。sequenceが末尾の次でなければ拒否する
    async fn insert(&self, entry: AuditLogEntry) -> AppResult<AuditLogEntry>;

    /// 全エントリ（sequence昇順）
    async fn entries(&self) -> AppResult<Vec<AuditLogEntry>>;

    /// 条件に合うエントリ（sequence昇順）。limit指定時は新しい方からlimit件
    async fn query(&self, filter: &AuditLogFilter) -> AppResult<Vec<AuditLogEntry>>;

    async fn count_for_user(&self, user_id: Uuid) -> AppResult<u64>;
}

/// プロセス内のアリーナ型台帳。インデックス＝sequence で、push以外の変更操作はない
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    entries: Arc<RwLock<Vec<AuditLogEntry>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 改ざん検知テスト用
    #[cfg(test)]
    pub(crate) async fn tamper(&self, index: usize, edit: impl FnOnce(&mut AuditLogEntry)) {
        if let Some(entry) = self.entries.write().await.get_mut(index) {
            edit(entry);
        }
    }
}

#[async_trait]
impl LedgerBackend for InMemoryLedger {
    async fn last_entry(&self) -> AppResult<Option<AuditLogEntry>> {
        Ok(self.entries.read().await.last().cloned())
    }

    async fn insert(&self, entry: AuditLogEntry) -> AppResult<AuditLogEntry> {
        let mut entries = self.entries.write().await;
        let expected = entries.len() as i64;
        if entry.sequence != expected {
            return Err(AppError::InternalServerError(format!(
                "Audit ledger sequence conflict: expected {}, got {}",
                expected, entry.sequence
            )));
        }
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn entries(&self) -> AppResult<Vec<AuditLogEntry>> {
        Ok(self.entries.read().await.clone())
    }

    async fn query(&self, filter: &AuditLogFilter) -> AppResult<Vec<AuditLogEntry>> {
        let entries = self.entries.read().await;
        let mut matched: Vec<AuditLogEntry> = entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect();

        if let Some(limit) = filter.limit {
            let limit = limit as usize;
            if matched.len() > limit {
                let excess = matched.len() - limit;
                matched.drain(..excess);
            }
        }
        Ok(matched)
    }

    async fn count_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|e| e.user_id == user_id).count() as u64)
    }
}
