// legal-backend/src/features/gdpr/handlers/gdpr.rs

use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::extractors::ValidatedJson;
use crate::features::gdpr::dto::{
    AuditLogListResponse, AuditLogQuery, AuditLogResponse, ConsentListResponse,
    ConsentRecordResponse, ConsentUpdateRequest, ConsentUpdateResponse, DataDeletionRequest,
    DataDeletionResponse, DataExportRequest, DataExportResponse,
};
use crate::features::gdpr::services::ClientInfo;
use crate::middleware::auth::{extract_client_ip, AuthenticatedUser};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

/// Export the authenticated user's data (GDPR Art. 20)
pub async fn export_user_data_handler(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<DataExportRequest>,
) -> AppResult<Json<DataExportResponse>> {
    let response = app_state
        .gdpr_service
        .export_user_data(user.user_id, request)
        .await?;

    Ok(Json(response))
}

/// Delete the authenticated user's data (GDPR Art. 17)
pub async fn delete_user_data_handler(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<DataDeletionRequest>,
) -> AppResult<Json<DataDeletionResponse>> {
    let response = app_state
        .gdpr_service
        .delete_user_data(user.user_id, request)
        .await?;

    Ok(Json(response))
}

/// List every consent record of the user, newest first
pub async fn list_consents_handler(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ConsentListResponse>> {
    let consents: Vec<ConsentRecordResponse> = app_state
        .gdpr_service
        .list_consents(user.user_id)
        .await?
        .into_iter()
        .map(ConsentRecordResponse::from)
        .collect();

    Ok(Json(ConsentListResponse {
        total: consents.len(),
        consents,
    }))
}

/// Grant or revoke a consent
pub async fn update_consent_handler(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<ConsentUpdateRequest>,
) -> AppResult<Json<ConsentUpdateResponse>> {
    let client = ClientInfo {
        ip_address: extract_client_ip(&headers),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string()),
    };

    let response = app_state
        .gdpr_service
        .update_consent(user.user_id, request, client)
        .await?;

    Ok(Json(response))
}

/// The user's own audit trail
pub async fn list_audit_logs_handler(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    query: Result<Query<AuditLogQuery>, QueryRejection>,
) -> AppResult<Json<AuditLogListResponse>> {
    let Query(query) =
        query.map_err(|e| AppError::BadRequest(format!("Invalid query parameters: {}", e)))?;
    query.validate()?;

    let entries: Vec<AuditLogResponse> = app_state
        .gdpr_service
        .audit_entries_for(user.user_id, query)
        .await?
        .into_iter()
        .map(AuditLogResponse::from)
        .collect();

    Ok(Json(AuditLogListResponse {
        total: entries.len(),
        entries,
    }))
}

/// GDPR router
pub fn gdpr_router(app_state: AppState) -> Router {
    Router::new()
        .route("/gdpr/export", post(export_user_data_handler))
        .route("/gdpr/delete", post(delete_user_data_handler))
        .route(
            "/gdpr/consents",
            get(list_consents_handler).post(update_consent_handler),
        )
        .route("/gdpr/audit-logs", get(list_audit_logs_handler))
        .with_state(app_state)
}
