// src/main.rs
use legal_backend::api::{build_router, AppState, Backends};
use legal_backend::config::AppConfig;
use legal_backend::db::create_db_pool;
use legal_backend::features::audit::repositories::{AuditLogRepository, InMemoryLedger};
use legal_backend::features::auth::repositories::SessionRepository;
use legal_backend::features::gdpr::repositories::{
    ConsentRepository, InMemoryConsentStore, InMemoryUserDataStore, UserDataRepository,
};
use legal_backend::infrastructure::encryption::{AesGcmFieldCipher, FieldCipher};
use legal_backend::infrastructure::rate_limit::InMemoryRateLimitStore;
use legal_backend::shared::clock::{Clock, SystemClock};
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // トレーシングの設定
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "legal_backend=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    tracing::info!("Starting Legal Backend server...");

    // 設定を読み込む
    let app_config = AppConfig::from_env()?;
    tracing::info!(
        environment = %app_config.environment,
        export_dir = %app_config.gdpr.export_dir.display(),
        "Configuration loaded"
    );

    let cipher: Arc<dyn FieldCipher> = match &app_config.encryption_key {
        Some(key) => Arc::new(AesGcmFieldCipher::from_base64_key(key)?),
        None => {
            tracing::warn!("ENCRYPTION_KEY not set, using an ephemeral key");
            Arc::new(AesGcmFieldCipher::generate())
        }
    };

    let backends = match &app_config.database_url {
        Some(database_url) => {
            let db = create_db_pool(database_url).await?;
            tracing::info!("Database pool created successfully.");

            Migrator::up(&db, None).await?;
            tracing::info!("Migrations applied.");

            Backends {
                ledger: Arc::new(AuditLogRepository::new(db.clone())),
                consents: Arc::new(ConsentRepository::new(db.clone())),
                user_data: Arc::new(UserDataRepository::new(db.clone())),
                sessions: Arc::new(SessionRepository::new(db)),
                rate_limits: Arc::new(InMemoryRateLimitStore::new()),
            }
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            let user_data = InMemoryUserDataStore::new();
            Backends {
                ledger: Arc::new(InMemoryLedger::new()),
                consents: Arc::new(InMemoryConsentStore::new()),
                user_data: Arc::new(user_data.clone()),
                sessions: Arc::new(user_data),
                rate_limits: Arc::new(InMemoryRateLimitStore::new()),
            }
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let app_state = AppState::assemble(backends, cipher, clock, app_config.gdpr.clone());

    // 起動時に監査ログの連鎖を検証する。壊れていても起動は続ける
    let report = app_state.gdpr_service.audit().verify_integrity().await?;
    if report.valid {
        tracing::info!(
            entries_checked = report.entries_checked,
            "Audit chain verified"
        );
    } else {
        tracing::error!(
            first_broken_index = ?report.first_broken_index,
            "Audit chain is broken, run verify-audit-chain for details"
        );
    }

    // ルーターの設定
    let app_router = build_router(app_state);

    // サーバーの起動
    let server_addr = app_config.server_addr();
    tracing::info!("Router configured. Server listening on {}", server_addr);

    let listener = TcpListener::bind(&server_addr).await?;
    axum::serve(listener, app_router.into_make_service()).await?;

    Ok(())
}
