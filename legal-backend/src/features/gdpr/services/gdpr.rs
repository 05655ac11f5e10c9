// legal-backend/src/features/gdpr/services/gdpr.rs

use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::config::GdprConfig;
use crate::error::{AppError, AppResult};
use crate::features::audit::models::audit_log::{
    AuditEvent, AuditLogBuilder, AuditLogEntry, AuditLogFilter,
};
use crate::features::audit::services::hash_chain::AuditChain;
use crate::features::gdpr::dto::{
    AuditLogQuery, ConsentUpdateRequest, ConsentUpdateResponse, DataDeletionRequest,
    DataDeletionResponse, DataExportRequest, DataExportResponse,
};
use crate::features::gdpr::models::export_manifest::ExportFormat;
use crate::features::gdpr::models::user_consent::{ConsentType, Model as ConsentModel};
use crate::features::gdpr::services::consent::ConsentGate;
use crate::features::gdpr::services::deleter::{DataDeleter, DeletionOutcome};
use crate::features::gdpr::services::exporter::{DataExporter, ExportArtifact};
use crate::infrastructure::rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter};
use crate::log_with_context;
use crate::shared::clock::Clock;
use crate::shared::datetime::to_iso_millis;

pub const EXPORT_OPERATION: &str = "export";
pub const DELETE_OPERATION: &str = "delete";
const RESOURCE_TYPE: &str = "user_data";
const DEFAULT_AUDIT_LOG_LIMIT: u64 = 100;

/// 失敗した段階とエラー
struct Failure {
    stage: &'static str,
    error: AppError,
}

impl Failure {
    fn at(stage: &'static str, error: AppError) -> Self {
        Self { stage, error }
    }
}

/// リクエスト元の情報（同意レコードに記録する）
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// GDPR操作の唯一の入口。同意確認 → レート制限 → 実行 → 監査ログ追記 の順に進める
pub struct GdprService {
    consent_gate: Arc<ConsentGate>,
    rate_limiter: RateLimiter,
    exporter: Arc<DataExporter>,
    deleter: Arc<DataDeleter>,
    audit: Arc<AuditChain>,
    clock: Arc<dyn Clock>,
    config: GdprConfig,
}

impl GdprService {
    pub fn new(
        consent_gate: Arc<ConsentGate>,
        rate_limiter: RateLimiter,
        exporter: Arc<DataExporter>,
        deleter: Arc<DataDeleter>,
        audit: Arc<AuditChain>,
        clock: Arc<dyn Clock>,
        config: GdprConfig,
    ) -> Self {
        Self {
            consent_gate,
            rate_limiter,
            exporter,
            deleter,
            audit,
            clock,
            config,
        }
    }

    pub fn audit(&self) -> &Arc<AuditChain> {
        &self.audit
    }

    /// データエクスポート（第20条）
    pub async fn export_user_data(
        &self,
        user_id: Uuid,
        request: DataExportRequest,
    ) -> AppResult<DataExportResponse> {
        let format = request.format;

        match self.run_export(user_id, format).await {
            Ok(artifact) => {
                let manifest = &artifact.manifest;
                let entry = self
                    .audit
                    .append(
                        AuditLogBuilder::new(user_id, AuditEvent::GdprExport, RESOURCE_TYPE)
                            .resource_id(user_id.to_string())
                            .details(json!({
                                "format": format.as_str(),
                                "totalRecords": manifest.metadata.total_records,
                                "categories": manifest.category_counts(),
                                "filePath": &artifact.path,
                                "trigger": "request",
                            }))
                            .build(),
                    )
                    .await?;

                Ok(DataExportResponse {
                    success: true,
                    file_path: artifact.path,
                    total_records: artifact.manifest.metadata.total_records,
                    export_date: artifact.manifest.metadata.export_date,
                    format,
                    audit_log_id: entry.id,
                })
            }
            Err(failure) => {
                Err(self
                    .audit_failure(
                        user_id,
                        AuditEvent::GdprExport,
                        "export_denied",
                        failure,
                        json!({ "format": format.as_str() }),
                    )
                    .await)
            }
        }
    }

    async fn run_export(&self, user_id: Uuid, format: ExportFormat) -> Result<ExportArtifact, Failure> {
        self.require_consent(user_id, ConsentType::DataProcessing)
            .await
            .map_err(|e| Failure::at("consent", e))?;
        self.check_rate(user_id, EXPORT_OPERATION, self.config.export_policy)
            .await
            .map_err(|e| Failure::at("rate_limit", e))?;

        self.with_timeout("export", self.exporter.export(user_id, format))
            .await
    }

    /// データ削除（第17条）
    pub async fn delete_user_data(
        &self,
        user_id: Uuid,
        request: DataDeletionRequest,
    ) -> AppResult<DataDeletionResponse> {
        let mut pre_export: Option<String> = None;

        match self.run_delete(user_id, &request, &mut pre_export).await {
            Ok(outcome) => {
                let entry = self
                    .audit
                    .append(
                        AuditLogBuilder::new(user_id, AuditEvent::GdprDelete, RESOURCE_TYPE)
                            .resource_id(user_id.to_string())
                            .details(json!({
                                "deletedCounts": &outcome.deleted_counts,
                                "totalDeleted": outcome.total_deleted(),
                                "preservedAuditLogs": outcome.preserved_audit_logs,
                                "preservedConsents": outcome.preserved_consents,
                                "exportPath": &pre_export,
                                "reason": &request.reason,
                            }))
                            .build(),
                    )
                    .await?;

                Ok(DataDeletionResponse {
                    success: true,
                    deletion_date: to_iso_millis(self.clock.now()),
                    deleted_counts: outcome.deleted_counts,
                    preserved_audit_logs: outcome.preserved_audit_logs,
                    preserved_consents: outcome.preserved_consents,
                    export_path: pre_export,
                    audit_log_id: entry.id,
                })
            }
            Err(failure) => {
                Err(self
                    .audit_failure(
                        user_id,
                        AuditEvent::GdprDelete,
                        "delete_denied",
                        failure,
                        json!({
                            "exportBeforeDelete": request.export_before_delete,
                            "exportPath": &pre_export,
                        }),
                    )
                    .await)
            }
        }
    }

    async fn run_delete(
        &self,
        user_id: Uuid,
        request: &DataDeletionRequest,
        pre_export: &mut Option<String>,
    ) -> Result<DeletionOutcome, Failure> {
        if !request.is_confirmed() {
            return Err(Failure::at(
                "confirmation",
                AppError::BadRequest(
                    "Deletion requires explicit confirmation (confirmed: true)".to_string(),
                ),
            ));
        }
        request
            .validate()
            .map_err(|e| Failure::at("validation", AppError::from(e)))?;

        self.require_consent(user_id, ConsentType::DataErasureRequest)
            .await
            .map_err(|e| Failure::at("consent", e))?;
        self.check_rate(user_id, DELETE_OPERATION, self.config.delete_policy)
            .await
            .map_err(|e| Failure::at("rate_limit", e))?;

        if request.export_before_delete {
            let artifact = self
                .with_timeout("pre_export", self.exporter.export(user_id, ExportFormat::Json))
                .await?;
            self.audit
                .append(
                    AuditLogBuilder::new(user_id, AuditEvent::GdprExport, RESOURCE_TYPE)
                        .resource_id(user_id.to_string())
                        .details(json!({
                            "format": ExportFormat::Json.as_str(),
                            "totalRecords": artifact.manifest.metadata.total_records,
                            "categories": artifact.manifest.category_counts(),
                            "filePath": &artifact.path,
                            "trigger": "pre_deletion",
                        }))
                        .build(),
                )
                .await
                .map_err(|e| Failure::at("pre_export", e))?;
            *pre_export = Some(artifact.path);
        }

        // タイムアウトで future が破棄された場合、未コミットのトランザクションはロールバックされる
        self.with_timeout("delete", self.deleter.delete(user_id))
            .await
            .map_err(|Failure { stage, error }| match error {
                AppError::TransactionFailure(_) => Failure::at(stage, error),
                other => Failure::at(stage, AppError::TransactionFailure(other.to_string())),
            })
    }

    /// 同意の付与・撤回。変更の有無にかかわらず監査ログを1件残す
    pub async fn update_consent(
        &self,
        user_id: Uuid,
        request: ConsentUpdateRequest,
        client: ClientInfo,
    ) -> AppResult<ConsentUpdateResponse> {
        let consent_type = ConsentType::from(request.consent_type.clone());
        let (event, action) = if request.granted {
            (AuditEvent::ConsentGranted, "grant")
        } else {
            (AuditEvent::ConsentRevoked, "revoke")
        };

        let result = match request.validate() {
            Err(e) => Err(AppError::from(e)),
            Ok(()) if request.granted => {
                self.consent_gate
                    .grant(
                        user_id,
                        &consent_type,
                        client.ip_address.clone(),
                        client.user_agent.clone(),
                    )
                    .await
            }
            Ok(()) => self.consent_gate.revoke(user_id, &consent_type).await,
        };

        match result {
            Ok(change) => {
                let consent_id = change.record.as_ref().map(|c| c.id.to_string());
                let mut builder = AuditLogBuilder::new(user_id, event, "user_consents")
                    .action(action)
                    .details(json!({
                        "consentType": consent_type.as_str(),
                        "changed": change.changed,
                        "ipAddress": &client.ip_address,
                    }));
                if let Some(id) = consent_id {
                    builder = builder.resource_id(id);
                }
                self.audit.append(builder.build()).await?;

                Ok(ConsentUpdateResponse {
                    success: true,
                    consent_type: consent_type.as_str().to_string(),
                    granted: request.granted,
                })
            }
            Err(error) => Err(self
                .audit_failure(
                    user_id,
                    event,
                    action,
                    Failure::at("consent_update", error),
                    json!({ "consentType": consent_type.as_str() }),
                )
                .await),
        }
    }

    /// 同意履歴（新しい順）
    pub async fn list_consents(&self, user_id: Uuid) -> AppResult<Vec<ConsentModel>> {
        let mut consents = self.consent_gate.list(user_id).await?;
        consents.reverse();
        Ok(consents)
    }

    async fn require_consent(&self, user_id: Uuid, consent_type: ConsentType) -> AppResult<()> {
        if self
            .consent_gate
            .has_active_consent(user_id, &consent_type)
            .await?
        {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Active consent required for {}",
                consent_type
            )))
        }
    }

    async fn check_rate(
        &self,
        user_id: Uuid,
        operation: &str,
        policy: RateLimitPolicy,
    ) -> AppResult<()> {
        match self
            .rate_limiter
            .check_and_increment(user_id, operation, policy)
            .await?
        {
            RateLimitDecision::Allowed { .. } => Ok(()),
            RateLimitDecision::Denied { reset_at } => Err(AppError::RateLimited {
                operation: operation.to_string(),
                reset_at,
            }),
        }
    }

    async fn with_timeout<T>(
        &self,
        stage: &'static str,
        operation: impl Future<Output = AppResult<T>>,
    ) -> Result<T, Failure> {
        match tokio::time::timeout(self.config.operation_timeout, operation).await {
            Ok(result) => result.map_err(|e| Failure::at(stage, e)),
            Err(_) => {
                log_with_context!(
                    tracing::Level::ERROR,
                    "GDPR operation timed out",
                    "stage" => stage,
                    "timeout_secs" => self.config.operation_timeout.as_secs_f64()
                );
                Err(Failure::at(
                    stage,
                    AppError::InternalServerError(format!("{} timed out", stage)),
                ))
            }
        }
    }

    /// 失敗を監査ログに記録し、呼び出し元に返すエラーを返す
    async fn audit_failure(
        &self,
        user_id: Uuid,
        event: AuditEvent,
        action: &str,
        failure: Failure,
        mut details: Value,
    ) -> AppError {
        let Failure { stage, error } = failure;

        if let Value::Object(map) = &mut details {
            map.insert("stage".to_string(), json!(stage));
            map.insert("error".to_string(), json!(error.kind()));
            map.insert("reason".to_string(), json!(error.detail()));
            if let AppError::RateLimited { reset_at, .. } = &error {
                map.insert("resetAt".to_string(), json!(to_iso_millis(*reset_at)));
            }
        }

        log_with_context!(
            tracing::Level::WARN,
            "GDPR operation failed",
            "user_id" => user_id,
            "event" => event.as_str(),
            "stage" => stage,
            "error" => &error
        );

        let resource_type = match event {
            AuditEvent::ConsentGranted | AuditEvent::ConsentRevoked => "user_consents",
            _ => RESOURCE_TYPE,
        };
        let draft = AuditLogBuilder::new(user_id, event, resource_type)
            .resource_id(user_id.to_string())
            .action(action)
            .details(details)
            .success(false)
            .build();

        if let Err(audit_error) = self.audit.append(draft).await {
            log_with_context!(
                tracing::Level::ERROR,
                "Failed to record audit entry for failed operation",
                "user_id" => user_id,
                "error" => &audit_error
            );
        }

        error
    }

    /// ユーザー自身の監査ログ
    pub async fn audit_entries_for(
        &self,
        user_id: Uuid,
        query: AuditLogQuery,
    ) -> AppResult<Vec<AuditLogEntry>> {
        self.audit
            .query(&AuditLogFilter {
                event_type: query.event_type,
                success: query.success,
                limit: Some(query.limit.unwrap_or(DEFAULT_AUDIT_LOG_LIMIT)),
                ..AuditLogFilter::for_user(user_id)
            })
            .await
    }
}
