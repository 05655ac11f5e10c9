// legal-backend/src/features/gdpr/models/export_manifest.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub const EXPORT_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub export_date: String,
    pub user_id: Uuid,
    pub format: ExportFormat,
    pub total_records: u64,
    pub schema_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryExport {
    pub table_name: String,
    pub records: Vec<Value>,
    pub count: u64,
}

/// エクスポート1回分の成果物。永続化はファイルとしてのみ行う
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub metadata: ExportMetadata,
    pub user_data: BTreeMap<String, CategoryExport>,
}

impl ExportManifest {
    pub fn category_counts(&self) -> BTreeMap<String, u64> {
        self.user_data
            .iter()
            .map(|(key, category)| (key.clone(), category.count))
            .collect()
    }
}
