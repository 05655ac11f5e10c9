// legal-backend/src/api/mod.rs
use crate::config::GdprConfig;
use crate::features::audit::repositories::LedgerBackend;
use crate::features::audit::services::AuditChain;
use crate::features::auth::repositories::SessionLookup;
use crate::features::gdpr::handlers::gdpr_router;
use crate::features::gdpr::models::user_data::DeletionPlan;
use crate::features::gdpr::repositories::{ConsentStore, UserDataStore};
use crate::features::gdpr::services::{
    ConsentGate, DataDeleter, DataExporter, GdprService, LocalExportStorage,
};
use crate::infrastructure::encryption::FieldCipher;
use crate::infrastructure::rate_limit::{RateLimitStore, RateLimiter};
use crate::logging::{inject_request_context, logging_middleware};
use crate::shared::clock::Clock;
use axum::{middleware as axum_middleware, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 永続化の実装一式。Postgres とインメモリを差し替えられる
#[derive(Clone)]
pub struct Backends {
    pub ledger: Arc<dyn LedgerBackend>,
    pub consents: Arc<dyn ConsentStore>,
    pub user_data: Arc<dyn UserDataStore>,
    pub sessions: Arc<dyn SessionLookup>,
    pub rate_limits: Arc<dyn RateLimitStore>,
}

/// 統一されたアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub gdpr_service: Arc<GdprService>,
    pub sessions: Arc<dyn SessionLookup>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// サービスを組み立てる
    pub fn assemble(
        backends: Backends,
        cipher: Arc<dyn FieldCipher>,
        clock: Arc<dyn Clock>,
        config: GdprConfig,
    ) -> Self {
        let audit = Arc::new(AuditChain::new(backends.ledger, clock.clone()));
        let consent_gate = Arc::new(ConsentGate::new(backends.consents.clone(), clock.clone()));
        let rate_limiter = RateLimiter::new(backends.rate_limits, clock.clone());
        let exporter = Arc::new(DataExporter::new(
            backends.user_data.clone(),
            backends.consents.clone(),
            cipher,
            Arc::new(LocalExportStorage::new(config.export_dir.clone())),
            clock.clone(),
        ));
        let deleter = Arc::new(DataDeleter::new(
            backends.user_data,
            backends.consents,
            audit.clone(),
            DeletionPlan::standard(),
        ));

        let gdpr_service = Arc::new(GdprService::new(
            consent_gate,
            rate_limiter,
            exporter,
            deleter,
            audit,
            clock.clone(),
            config,
        ));

        Self {
            gdpr_service,
            sessions: backends.sessions,
            clock,
        }
    }
}

/// ルーター全体を構築する
pub fn build_router(app_state: AppState) -> Router {
    gdpr_router(app_state)
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(axum_middleware::from_fn(inject_request_context))
        .layer(TraceLayer::new_for_http())
}
