// legal-backend/src/features/gdpr/services/consent.rs

use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppResult;
use crate::features::gdpr::models::user_consent::{ConsentType, Model as ConsentModel};
use crate::features::gdpr::repositories::consent::ConsentStore;
use crate::log_with_context;
use crate::shared::clock::Clock;

/// 付与・撤回の結果。changed=false は既に目的の状態だったことを示す
#[derive(Debug, Clone, PartialEq)]
pub struct ConsentChange {
    pub record: Option<ConsentModel>,
    pub changed: bool,
}

/// 同意の確認と付与・撤回
pub struct ConsentGate {
    store: Arc<dyn ConsentStore>,
    clock: Arc<dyn Clock>,
    // 同一ユーザーの付与・撤回が交錯して有効レコードが重複しないようにする
    write_lock: Mutex<()>,
}

impl ConsentGate {
    pub fn new(store: Arc<dyn ConsentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// 最新レコードが granted かつ未撤回のときだけ true
    pub async fn has_active_consent(
        &self,
        user_id: Uuid,
        consent_type: &ConsentType,
    ) -> AppResult<bool> {
        let latest = self.store.latest(user_id, consent_type.as_str()).await?;
        Ok(latest.is_some_and(|consent| consent.is_active()))
    }

    /// 新しいレコードを追加する。既に有効なら既存レコードを返す
    pub async fn grant(
        &self,
        user_id: Uuid,
        consent_type: &ConsentType,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> AppResult<ConsentChange> {
        let _guard = self.write_lock.lock().await;

        if let Some(current) = self.store.latest(user_id, consent_type.as_str()).await? {
            if current.is_active() {
                return Ok(ConsentChange {
                    record: Some(current),
                    changed: false,
                });
            }
        }

        let consent = ConsentModel::new(
            user_id,
            consent_type,
            true,
            ip_address,
            user_agent,
            self.clock.now(),
        );
        let stored = self.store.insert(consent).await?;

        log_with_context!(
            tracing::Level::INFO,
            "Consent granted",
            "user_id" => user_id,
            "consent_type" => consent_type.as_str(),
            "consent_id" => stored.id
        );

        Ok(ConsentChange {
            record: Some(stored),
            changed: true,
        })
    }

    /// 有効なレコードに revoked_at を設定する。行は削除しない
    pub async fn revoke(&self, user_id: Uuid, consent_type: &ConsentType) -> AppResult<ConsentChange> {
        let _guard = self.write_lock.lock().await;

        let active = self
            .store
            .latest(user_id, consent_type.as_str())
            .await?
            .filter(|consent| consent.is_active());

        let Some(active) = active else {
            return Ok(ConsentChange {
                record: None,
                changed: false,
            });
        };

        let revoked = self.store.mark_revoked(active.id, self.clock.now()).await?;

        log_with_context!(
            tracing::Level::INFO,
            "Consent revoked",
            "user_id" => user_id,
            "consent_type" => consent_type.as_str(),
            "consent_id" => revoked.id
        );

        Ok(ConsentChange {
            record: Some(revoked),
            changed: true,
        })
    }

    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<ConsentModel>> {
        self.store.list_for_user(user_id).await
    }
}
