// tests/common/app_helper.rs
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use legal_backend::api::{build_router, AppState, Backends};
use legal_backend::config::GdprConfig;
use legal_backend::features::audit::repositories::InMemoryLedger;
use legal_backend::features::audit::services::AuditChain;
use legal_backend::features::gdpr::repositories::{
    InMemoryConsentStore, InMemoryUserDataStore, UserDataStore,
};
use legal_backend::infrastructure::encryption::AesGcmFieldCipher;
use legal_backend::infrastructure::rate_limit::InMemoryRateLimitStore;
use legal_backend::shared::clock::ManualClock;
use std::sync::Arc;
use tempfile::TempDir;

/// 全ストアをインメモリで持つテスト用アプリ
pub struct TestApp {
    pub router: Router,
    pub user_data: InMemoryUserDataStore,
    pub consents: InMemoryConsentStore,
    pub ledger: InMemoryLedger,
    pub rate_limits: InMemoryRateLimitStore,
    pub audit: Arc<AuditChain>,
    pub clock: ManualClock,
    pub cipher: AesGcmFieldCipher,
    pub export_dir: TempDir,
}

pub fn test_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

pub fn setup_app() -> TestApp {
    setup_app_with(|_| {}, |store| Arc::new(store) as Arc<dyn UserDataStore>)
}

/// GDPR設定とユーザーデータストアを差し替えて構築する
pub fn setup_app_with<C, S>(configure: C, wrap_store: S) -> TestApp
where
    C: FnOnce(&mut GdprConfig),
    S: FnOnce(InMemoryUserDataStore) -> Arc<dyn UserDataStore>,
{
    super::init_test_env();

    let export_dir = tempfile::tempdir().unwrap();
    let mut config = GdprConfig {
        export_dir: export_dir.path().to_path_buf(),
        ..GdprConfig::default()
    };
    configure(&mut config);

    let user_data = InMemoryUserDataStore::new();
    let consents = InMemoryConsentStore::new();
    let ledger = InMemoryLedger::new();
    let clock = ManualClock::new(test_start());
    let cipher = AesGcmFieldCipher::generate();
    let rate_limits = InMemoryRateLimitStore::new();

    let backends = Backends {
        ledger: Arc::new(ledger.clone()),
        consents: Arc::new(consents.clone()),
        user_data: wrap_store(user_data.clone()),
        sessions: Arc::new(user_data.clone()),
        rate_limits: Arc::new(rate_limits.clone()),
    };
    let state = AppState::assemble(
        backends,
        Arc::new(cipher.clone()),
        Arc::new(clock.clone()),
        config,
    );
    let audit = state.gdpr_service.audit().clone();

    TestApp {
        router: build_router(state),
        user_data,
        consents,
        ledger,
        rate_limits,
        audit,
        clock,
        cipher,
        export_dir,
    }
}
