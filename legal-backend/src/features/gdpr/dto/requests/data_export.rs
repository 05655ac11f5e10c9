use crate::features::gdpr::models::export_manifest::ExportFormat;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// GDPR data export request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct DataExportRequest {
    pub format: ExportFormat,
}
