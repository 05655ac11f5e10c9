// src/bin/verify_audit_chain.rs
//! 監査ログのハッシュ連鎖を検証する。壊れていれば終了コード 1

use legal_backend::config::AppConfig;
use legal_backend::db::create_db_pool;
use legal_backend::features::audit::repositories::AuditLogRepository;
use legal_backend::features::audit::services::AuditChain;
use legal_backend::shared::clock::SystemClock;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "legal_backend=warn".into()),
        )
        .with(fmt::layer())
        .init();

    let app_config = AppConfig::from_env()?;
    let database_url = app_config
        .database_url
        .ok_or("DATABASE_URL must be set to verify the audit chain")?;

    let db = create_db_pool(&database_url).await?;
    let chain = AuditChain::new(
        Arc::new(AuditLogRepository::new(db)),
        Arc::new(SystemClock),
    );

    let report = chain.verify_integrity().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
