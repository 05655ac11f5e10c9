// legal-backend/src/features/gdpr/repositories/memory.rs
//! DATABASE_URL 未設定時とテストで使うインメモリ実装

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::features::auth::repositories::session::{ActiveSession, SessionLookup};
use crate::features::gdpr::models::user_consent::Model as ConsentModel;
use crate::features::gdpr::models::user_data::{DeletionStep, Ownership, Row, UserTable};
use crate::features::gdpr::repositories::consent::ConsentStore;
use crate::features::gdpr::repositories::user_data::{DeletionTransaction, UserDataStore};

#[derive(Clone, Default)]
pub struct InMemoryConsentStore {
    consents: Arc<RwLock<Vec<ConsentModel>>>,
}

impl InMemoryConsentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsentStore for InMemoryConsentStore {
    async fn latest(&self, user_id: Uuid, consent_type: &str) -> AppResult<Option<ConsentModel>> {
        let consents = self.consents.read().await;
        Ok(consents
            .iter()
            .rev()
            .find(|c| c.user_id == user_id && c.consent_type == consent_type)
            .cloned())
    }

    async fn insert(&self, consent: ConsentModel) -> AppResult<ConsentModel> {
        self.consents.write().await.push(consent.clone());
        Ok(consent)
    }

    async fn mark_revoked(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<ConsentModel> {
        let mut consents = self.consents.write().await;
        let consent = consents
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Consent {} not found", id)))?;
        consent.revoked_at = Some(at);
        consent.updated_at = at;
        Ok(consent.clone())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<ConsentModel>> {
        let consents = self.consents.read().await;
        Ok(consents
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn count_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let consents = self.consents.read().await;
        Ok(consents.iter().filter(|c| c.user_id == user_id).count() as u64)
    }
}

type Tables = HashMap<UserTable, Vec<Row>>;

fn column_text(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(Value::as_str).map(str::to_string)
}

/// 所有者条件をインメモリで評価する形に展開したもの
enum OwnerFilter {
    Equals { column: &'static str, value: String },
    In {
        column: &'static str,
        ids: HashSet<String>,
    },
}

impl OwnerFilter {
    fn build(tables: &Tables, scope: Ownership, user_id: &str) -> Self {
        match scope {
            Ownership::Direct { column } => OwnerFilter::Equals {
                column,
                value: user_id.to_string(),
            },
            Ownership::ViaParent { column, parent } => {
                let parent_filter = Self::build(tables, parent.ownership(), user_id);
                let ids = tables
                    .get(&parent)
                    .into_iter()
                    .flatten()
                    .filter(|row| parent_filter.matches(row))
                    .filter_map(|row| column_text(row, "id"))
                    .collect();
                OwnerFilter::In { column, ids }
            }
        }
    }

    fn matches(&self, row: &Row) -> bool {
        match self {
            OwnerFilter::Equals { column, value } => {
                column_text(row, column).as_deref() == Some(value.as_str())
            }
            OwnerFilter::In { column, ids } => {
                column_text(row, column).is_some_and(|id| ids.contains(&id))
            }
        }
    }
}

/// テーブルごとの行をJSONで保持するストア
#[derive(Clone, Default)]
pub struct InMemoryUserDataStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryUserDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 行を追加する。JSONオブジェクト以外は拒否する
    pub async fn insert_row(&self, table: UserTable, row: Value) -> AppResult<()> {
        let Value::Object(row) = row else {
            return Err(AppError::BadRequest(format!(
                "Row for {} must be a JSON object",
                table.table_name()
            )));
        };
        self.tables
            .write()
            .await
            .entry(table)
            .or_default()
            .push(row);
        Ok(())
    }

    /// 所有者に関係なくテーブルの全行数
    pub async fn total_rows(&self, table: UserTable) -> usize {
        self.tables.read().await.get(&table).map_or(0, Vec::len)
    }
}

#[async_trait]
impl UserDataStore for InMemoryUserDataStore {
    async fn fetch_rows(&self, table: UserTable, user_id: Uuid) -> AppResult<Vec<Row>> {
        let tables = self.tables.read().await;
        let filter = OwnerFilter::build(&tables, table.ownership(), &user_id.to_string());
        Ok(tables
            .get(&table)
            .into_iter()
            .flatten()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect())
    }

    async fn count_rows(&self, table: UserTable, user_id: Uuid) -> AppResult<u64> {
        Ok(self.fetch_rows(table, user_id).await?.len() as u64)
    }

    async fn begin_deletion(&self) -> AppResult<Box<dyn DeletionTransaction>> {
        // 書き込みロックを保持したまま作業コピーを変更し、commitで差し替える
        let guard = self.tables.clone().write_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(InMemoryDeletion { guard, working }))
    }
}

struct InMemoryDeletion {
    guard: OwnedRwLockWriteGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl DeletionTransaction for InMemoryDeletion {
    async fn delete_rows(&mut self, step: &DeletionStep, user_id: Uuid) -> AppResult<u64> {
        let filter = OwnerFilter::build(&self.working, step.scope, &user_id.to_string());
        let rows = self.working.entry(step.table).or_default();
        let before = rows.len();
        rows.retain(|row| !filter.matches(row));
        Ok((before - rows.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let InMemoryDeletion { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl SessionLookup for InMemoryUserDataStore {
    async fn find_session(&self, token: &str) -> AppResult<Option<ActiveSession>> {
        let tables = self.tables.read().await;
        let session = tables
            .get(&UserTable::Sessions)
            .into_iter()
            .flatten()
            .find(|row| column_text(row, "token").as_deref() == Some(token))
            .and_then(|row| {
                Some(ActiveSession {
                    id: column_text(row, "id")?.parse().ok()?,
                    user_id: column_text(row, "user_id")?.parse().ok()?,
                    expires_at: DateTime::parse_from_rfc3339(&column_text(row, "expires_at")?)
                        .ok()?
                        .with_timezone(&Utc),
                })
            });
        Ok(session)
    }
}
