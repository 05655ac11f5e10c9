// legal-backend/src/features/gdpr/services/export_storage.rs

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// エクスポート成果物の保存先
#[async_trait]
pub trait ExportStorage: Send + Sync {
    /// 保存して参照用のパスを返す
    async fn store(&self, user_id: Uuid, file_name: &str, contents: Vec<u8>) -> AppResult<String>;
}

/// ローカルディスクへの保存。一時ファイルに書いてから rename する
#[derive(Debug, Clone)]
pub struct LocalExportStorage {
    root: PathBuf,
}

impl LocalExportStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn io_error(action: &str, path: &std::path::Path, e: std::io::Error) -> AppError {
    AppError::InternalServerError(format!("Failed to {} {}: {}", action, path.display(), e))
}

#[async_trait]
impl ExportStorage for LocalExportStorage {
    async fn store(&self, user_id: Uuid, file_name: &str, contents: Vec<u8>) -> AppResult<String> {
        if file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return Err(AppError::InternalServerError(format!(
                "Invalid export file name: {}",
                file_name
            )));
        }

        let dir = self.root.join(user_id.to_string());
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error("create", &dir, e))?;

        let final_path = dir.join(file_name);
        let temp_path = dir.join(format!(".{}.partial", file_name));

        if let Err(e) = fs::write(&temp_path, &contents).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(io_error("write", &temp_path, e));
        }
        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(io_error("move", &final_path, e));
        }

        Ok(final_path.to_string_lossy().into_owned())
    }
}
