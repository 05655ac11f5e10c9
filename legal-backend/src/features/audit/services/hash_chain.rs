// legal-backend/src/features/audit/services/hash_chain.rs

use chrono::{SecondsFormat, SubsecRound};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::features::audit::models::audit_log::{AuditDraft, AuditLogEntry, AuditLogFilter};
use crate::features::audit::repositories::ledger::LedgerBackend;
use crate::log_with_context;
use crate::shared::clock::Clock;

/// 先頭エントリの prev_hash
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// ハッシュ対象の正規化表現。フィールドはアルファベット順に宣言している
#[derive(Serialize)]
struct CanonicalEntry<'a> {
    action: &'a str,
    created_at: String,
    details: Value,
    event_type: &'a str,
    id: String,
    resource_id: Option<&'a str>,
    resource_type: &'a str,
    sequence: i64,
    success: bool,
    user_id: String,
}

/// オブジェクトのキーを再帰的にソートする
fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// prev_hash と hash を除く全フィールドの正規化JSON
pub fn canonical_payload(entry: &AuditLogEntry) -> String {
    let canonical = CanonicalEntry {
        action: &entry.action,
        created_at: entry
            .created_at
            .to_rfc3339_opts(SecondsFormat::Micros, true),
        details: sort_keys(&entry.details),
        event_type: &entry.event_type,
        id: entry.id.to_string(),
        resource_id: entry.resource_id.as_deref(),
        resource_type: &entry.resource_type,
        sequence: entry.sequence,
        success: entry.success,
        user_id: entry.user_id.to_string(),
    };
    serde_json::to_string(&canonical).unwrap_or_default()
}

/// SHA-256(prev_hash ∥ 正規化JSON) の16進表現
pub fn compute_hash(prev_hash: &str, entry: &AuditLogEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(canonical_payload(entry).as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub valid: bool,
    pub first_broken_index: Option<u64>,
    pub entries_checked: u64,
}

/// チェーン全体を先頭から検証し、最初に壊れているインデックスを返す
pub fn verify_chain(entries: &[AuditLogEntry]) -> IntegrityReport {
    let mut expected_prev = GENESIS_HASH;

    for (index, entry) in entries.iter().enumerate() {
        let intact = entry.sequence == index as i64
            && entry.prev_hash == expected_prev
            && compute_hash(&entry.prev_hash, entry) == entry.hash;

        if !intact {
            return IntegrityReport {
                valid: false,
                first_broken_index: Some(index as u64),
                entries_checked: index as u64 + 1,
            };
        }
        expected_prev = entry.hash.as_str();
    }

    IntegrityReport {
        valid: true,
        first_broken_index: None,
        entries_checked: entries.len() as u64,
    }
}

/// 改ざん検知可能な監査ログ
pub struct AuditChain {
    backend: Arc<dyn LedgerBackend>,
    clock: Arc<dyn Clock>,
    // 追記は常に1つずつ。prev_hash の読み取りから挿入までを直列化する
    writer: Mutex<()>,
}

impl AuditChain {
    pub fn new(backend: Arc<dyn LedgerBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            writer: Mutex::new(()),
        }
    }

    /// エントリを追記する。挿入に失敗した場合は何も残らない
    pub async fn append(&self, draft: AuditDraft) -> AppResult<AuditLogEntry> {
        let _guard = self.writer.lock().await;

        let (sequence, prev_hash) = match self.backend.last_entry().await? {
            Some(last) => (last.sequence + 1, last.hash),
            None => (0, GENESIS_HASH.to_string()),
        };

        let mut entry = AuditLogEntry {
            id: Uuid::new_v4(),
            sequence,
            // DBのtimestamptzと同じ精度に揃える
            created_at: self.clock.now().trunc_subsecs(6),
            event_type: draft.event_type,
            user_id: draft.user_id,
            resource_type: draft.resource_type,
            resource_id: draft.resource_id,
            action: draft.action,
            details: draft.details,
            success: draft.success,
            prev_hash,
            hash: String::new(),
        };
        entry.hash = compute_hash(&entry.prev_hash, &entry);

        let stored = self.backend.insert(entry).await?;

        log_with_context!(
            tracing::Level::DEBUG,
            "Audit entry appended",
            "sequence" => stored.sequence,
            "event_type" => &stored.event_type,
            "user_id" => stored.user_id,
            "success" => stored.success
        );

        Ok(stored)
    }

    pub async fn verify_integrity(&self) -> AppResult<IntegrityReport> {
        let entries = self.backend.entries().await?;
        let report = verify_chain(&entries);

        if let Some(index) = report.first_broken_index {
            log_with_context!(
                tracing::Level::ERROR,
                "Audit chain integrity violation detected",
                "first_broken_index" => index,
                "entries_checked" => report.entries_checked
            );
        }

        Ok(report)
    }

    /// 壊れていれば IntegrityViolation を返す
    pub async fn ensure_integrity(&self) -> AppResult<IntegrityReport> {
        let report = self.verify_integrity().await?;
        match report.first_broken_index {
            Some(index) => Err(AppError::IntegrityViolation { index }),
            None => Ok(report),
        }
    }

    pub async fn query(&self, filter: &AuditLogFilter) -> AppResult<Vec<AuditLogEntry>> {
        self.backend.query(filter).await
    }

    pub async fn count_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        self.backend.count_for_user(user_id).await
    }

    pub async fn entries(&self) -> AppResult<Vec<AuditLogEntry>> {
        self.backend.entries().await
    }
}
