// legal-backend/src/features/gdpr/services/exporter.rs

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::features::gdpr::models::export_manifest::{
    CategoryExport, ExportFormat, ExportManifest, ExportMetadata, EXPORT_SCHEMA_VERSION,
};
use crate::features::gdpr::models::user_data::{
    ExportCategory, ExportSource, Row, UserTable, EXPORT_CATEGORIES,
};
use crate::features::gdpr::repositories::consent::ConsentStore;
use crate::features::gdpr::repositories::user_data::UserDataStore;
use crate::features::gdpr::services::export_storage::ExportStorage;
use crate::infrastructure::encryption::{EncryptedField, FieldCipher};
use crate::log_with_context;
use crate::shared::clock::Clock;
use crate::shared::datetime::{normalize_timestamp, to_iso_millis};

/// 保存済みのエクスポート
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub manifest: ExportManifest,
    pub path: String,
}

/// ユーザーデータの収集・復号・シリアライズ
pub struct DataExporter {
    user_data: Arc<dyn UserDataStore>,
    consents: Arc<dyn ConsentStore>,
    cipher: Arc<dyn FieldCipher>,
    storage: Arc<dyn ExportStorage>,
    clock: Arc<dyn Clock>,
}

impl DataExporter {
    pub fn new(
        user_data: Arc<dyn UserDataStore>,
        consents: Arc<dyn ConsentStore>,
        cipher: Arc<dyn FieldCipher>,
        storage: Arc<dyn ExportStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_data,
            consents,
            cipher,
            storage,
            clock,
        }
    }

    /// 全カテゴリを収集してマニフェストを作る。1カテゴリでも失敗すれば全体が失敗する
    pub async fn collect(&self, user_id: Uuid, format: ExportFormat) -> AppResult<ExportManifest> {
        let now = self.clock.now();
        let mut user_data = BTreeMap::new();
        let mut total_records = 0u64;

        for category in EXPORT_CATEGORIES.iter() {
            let records = self.collect_category(category, user_id, now).await?;
            let count = records.len() as u64;
            total_records += count;
            user_data.insert(
                category.key.to_string(),
                CategoryExport {
                    table_name: category.table_name().to_string(),
                    records,
                    count,
                },
            );
        }

        Ok(ExportManifest {
            metadata: ExportMetadata {
                export_date: to_iso_millis(now),
                user_id,
                format,
                total_records,
                schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            },
            user_data,
        })
    }

    /// 収集して保存する
    pub async fn export(&self, user_id: Uuid, format: ExportFormat) -> AppResult<ExportArtifact> {
        let manifest = self.collect(user_id, format).await?;
        let contents = render(&manifest, format)?;

        let file_name = format!(
            "gdpr-export-{}-{}.{}",
            self.clock.now().format("%Y%m%dT%H%M%S%3fZ"),
            &Uuid::new_v4().simple().to_string()[..8],
            format.as_str()
        );
        let path = self.storage.store(user_id, &file_name, contents).await?;

        log_with_context!(
            tracing::Level::INFO,
            "User data exported",
            "user_id" => user_id,
            "format" => format.as_str(),
            "total_records" => manifest.metadata.total_records,
            "path" => &path
        );

        Ok(ExportArtifact { manifest, path })
    }

    async fn collect_category(
        &self,
        category: &ExportCategory,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Value>> {
        match category.source {
            ExportSource::Table(table) => {
                let rows = self.user_data.fetch_rows(table, user_id).await?;
                rows.into_iter()
                    .filter(|row| table != UserTable::Sessions || is_live_session(row, now))
                    .map(|row| self.prepare_row(table, row).map(Value::Object))
                    .collect()
            }
            ExportSource::Consents => {
                let consents = self.consents.list_for_user(user_id).await?;
                consents
                    .into_iter()
                    .map(|consent| {
                        let value = serde_json::to_value(consent).map_err(|e| {
                            AppError::InternalServerError(format!(
                                "Failed to serialize consent record: {}",
                                e
                            ))
                        })?;
                        match value {
                            Value::Object(row) => {
                                let row = normalize_row(row, |column| column.ends_with("_at"));
                                Ok(Value::Object(row))
                            }
                            other => Ok(other),
                        }
                    })
                    .collect()
            }
        }
    }

    /// 秘密カラムの除去、暗号化カラムの復号、日時の正規化
    fn prepare_row(&self, table: UserTable, mut row: Row) -> AppResult<Row> {
        for column in table.redacted_columns() {
            row.remove(*column);
        }

        for column in table.encrypted_columns() {
            let Some(value) = row.get(*column) else {
                continue;
            };
            // 暗号化前の平文データはそのまま出力する
            if let Some(field) = EncryptedField::from_column(value) {
                let plaintext = self.cipher.decrypt(&field).map_err(|e| {
                    log_with_context!(
                        tracing::Level::ERROR,
                        "Failed to decrypt field during export",
                        "table" => table.table_name(),
                        "column" => column,
                        "error" => &e
                    );
                    e
                })?;
                row.insert(column.to_string(), Value::String(plaintext));
            }
        }

        Ok(normalize_row(row, |column| table.is_timestamp_column(column)))
    }
}

fn is_live_session(row: &Row, now: DateTime<Utc>) -> bool {
    row.get("expires_at")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map_or(true, |expires_at| expires_at.with_timezone(&Utc) > now)
}

/// 日時カラムをUTC ISO-8601に揃える
fn normalize_row(row: Row, is_timestamp: impl Fn(&str) -> bool) -> Row {
    row.into_iter()
        .map(|(key, value)| {
            if is_timestamp(&key) {
                let normalized = normalize_timestamp(&value);
                (key, normalized)
            } else {
                (key, value)
            }
        })
        .collect::<Map<String, Value>>()
}

/// マニフェストを指定形式のバイト列にする
pub fn render(manifest: &ExportManifest, format: ExportFormat) -> AppResult<Vec<u8>> {
    match format {
        ExportFormat::Json => serde_json::to_vec_pretty(manifest).map_err(|e| {
            AppError::InternalServerError(format!("Failed to serialize export: {}", e))
        }),
        ExportFormat::Csv => Ok(render_csv(manifest).into_bytes()),
    }
}

fn render_csv(manifest: &ExportManifest) -> String {
    let meta = &manifest.metadata;
    let mut out = format!(
        "# metadata,exportDate={},userId={},format={},totalRecords={},schemaVersion={}\n",
        meta.export_date, meta.user_id, meta.format, meta.total_records, meta.schema_version
    );

    for (key, category) in &manifest.user_data {
        out.push('\n');
        out.push_str(&format!("# {} ({})\n", key, category.table_name));

        let columns: BTreeSet<&str> = category
            .records
            .iter()
            .filter_map(Value::as_object)
            .flat_map(|record| record.keys().map(String::as_str))
            .collect();
        if columns.is_empty() {
            continue;
        }

        let header: Vec<String> = columns.iter().map(|c| csv_field(c)).collect();
        out.push_str(&header.join(","));
        out.push('\n');

        for record in &category.records {
            let cells: Vec<String> = columns
                .iter()
                .map(|column| csv_cell(record.get(*column)))
                .collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }
    }

    out
}

fn csv_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => csv_field(s),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => csv_field(&nested.to_string()),
    }
}

/// RFC 4180 のクォート
fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
