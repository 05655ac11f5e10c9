// src/config.rs
use crate::infrastructure::rate_limit::RateLimitPolicy;
use chrono::Duration as ChronoDuration;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// GDPR処理（エクスポート・削除）の設定
#[derive(Clone, Debug)]
pub struct GdprConfig {
    pub export_dir: PathBuf,
    pub export_policy: RateLimitPolicy,
    pub delete_policy: RateLimitPolicy,
    pub operation_timeout: Duration,
}

impl Default for GdprConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("./exports"),
            export_policy: RateLimitPolicy::new(5, ChronoDuration::hours(24)),
            delete_policy: RateLimitPolicy::new(1, ChronoDuration::days(30)),
            operation_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    /// 未設定の場合はインメモリストアで起動する
    pub database_url: Option<String>,
    /// Base64エンコードされた32バイト鍵
    pub encryption_key: Option<String>,
    pub gdpr: GdprConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok(); // .env ファイルを読み込む (存在しなくてもエラーにしない)

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let encryption_key = env::var("ENCRYPTION_KEY").ok().filter(|k| !k.is_empty());
        if encryption_key.is_none() && environment == "production" {
            return Err("ENCRYPTION_KEY must be set in production".to_string());
        }

        let defaults = GdprConfig::default();
        let gdpr = GdprConfig {
            export_dir: env::var("GDPR_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            export_policy: RateLimitPolicy::new(
                parse_var("GDPR_EXPORT_LIMIT", 5)?,
                ChronoDuration::hours(parse_var("GDPR_EXPORT_WINDOW_HOURS", 24)?),
            ),
            delete_policy: RateLimitPolicy::new(
                parse_var("GDPR_DELETE_LIMIT", 1)?,
                ChronoDuration::days(parse_var("GDPR_DELETE_WINDOW_DAYS", 30)?),
            ),
            operation_timeout: Duration::from_secs(parse_var("GDPR_OPERATION_TIMEOUT_SECS", 120)?),
        };

        Ok(Self {
            environment,
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", 5000)?,
            database_url: env::var("DATABASE_URL").ok().filter(|u| !u.is_empty()),
            encryption_key,
            gdpr,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// テスト用の設定を作成
    pub fn for_testing() -> Self {
        Self {
            environment: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: None,
            encryption_key: None,
            gdpr: GdprConfig {
                export_dir: env::temp_dir().join("legal-backend-exports"),
                ..GdprConfig::default()
            },
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("Invalid {} value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}
