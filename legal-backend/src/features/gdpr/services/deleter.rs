// legal-backend/src/features/gdpr/services/deleter.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::features::audit::services::hash_chain::AuditChain;
use crate::features::gdpr::models::user_data::DeletionPlan;
use crate::features::gdpr::repositories::consent::ConsentStore;
use crate::features::gdpr::repositories::user_data::UserDataStore;
use crate::log_with_context;

/// 削除結果。監査ログと同意レコードは削除せず件数だけ返す
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionOutcome {
    pub deleted_counts: BTreeMap<String, u64>,
    pub preserved_audit_logs: u64,
    pub preserved_consents: u64,
}

impl DeletionOutcome {
    pub fn total_deleted(&self) -> u64 {
        self.deleted_counts.values().sum()
    }
}

/// 削除計画を1トランザクションで実行する
pub struct DataDeleter {
    user_data: Arc<dyn UserDataStore>,
    consents: Arc<dyn ConsentStore>,
    audit: Arc<AuditChain>,
    plan: DeletionPlan,
}

impl DataDeleter {
    pub fn new(
        user_data: Arc<dyn UserDataStore>,
        consents: Arc<dyn ConsentStore>,
        audit: Arc<AuditChain>,
        plan: DeletionPlan,
    ) -> Self {
        Self {
            user_data,
            consents,
            audit,
            plan,
        }
    }

    /// 全ステップ成功時のみ commit する。途中で失敗した場合はロールバックして TransactionFailure を返す
    pub async fn delete(&self, user_id: Uuid) -> AppResult<DeletionOutcome> {
        let mut txn = self
            .user_data
            .begin_deletion()
            .await
            .map_err(|e| AppError::TransactionFailure(format!("Failed to begin deletion: {}", e)))?;

        let mut deleted_counts = BTreeMap::new();
        for step in self.plan.steps() {
            let table = step.table.table_name();
            match txn.delete_rows(step, user_id).await {
                Ok(count) => {
                    log_with_context!(
                        tracing::Level::DEBUG,
                        "Deletion step completed",
                        "user_id" => user_id,
                        "table" => table,
                        "deleted" => count
                    );
                    deleted_counts.insert(table.to_string(), count);
                }
                Err(e) => {
                    log_with_context!(
                        tracing::Level::ERROR,
                        "Deletion step failed, rolling back",
                        "user_id" => user_id,
                        "table" => table,
                        "error" => &e
                    );
                    if let Err(rollback_error) = txn.rollback().await {
                        log_with_context!(
                            tracing::Level::ERROR,
                            "Rollback failed",
                            "user_id" => user_id,
                            "error" => &rollback_error
                        );
                    }
                    return Err(AppError::TransactionFailure(format!(
                        "Deleting from {} failed: {}",
                        table, e
                    )));
                }
            }
        }

        txn.commit()
            .await
            .map_err(|e| AppError::TransactionFailure(format!("Commit failed: {}", e)))?;

        let outcome = DeletionOutcome {
            deleted_counts,
            preserved_audit_logs: self.audit.count_for_user(user_id).await?,
            preserved_consents: self.consents.count_for_user(user_id).await?,
        };

        log_with_context!(
            tracing::Level::INFO,
            "User data deleted",
            "user_id" => user_id,
            "total_deleted" => outcome.total_deleted(),
            "preserved_audit_logs" => outcome.preserved_audit_logs,
            "preserved_consents" => outcome.preserved_consents
        );

        Ok(outcome)
    }
}
