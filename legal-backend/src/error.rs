// src/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::ValidationErrors;

use crate::shared::datetime::to_iso_millis;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Validation failed")]
    ValidationFailure(#[from] ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limit exceeded for {operation} until {reset_at}")]
    RateLimited {
        operation: String,
        reset_at: DateTime<Utc>,
    },

    #[error("Audit chain integrity violation at index {index}")]
    IntegrityViolation { index: u64 },

    #[error("Transaction failure: {0}")]
    TransactionFailure(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

const INTERNAL_DETAIL: &str = "An internal server error occurred";

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_)
            | AppError::ValidationFailure(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::DbErr(_)
            | AppError::IntegrityViolation { .. }
            | AppError::TransactionFailure(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// クライアントに返す説明文。5xx では内部情報を含めない
    pub fn detail(&self) -> String {
        match self {
            AppError::NotFound(message)
            | AppError::ValidationError(message)
            | AppError::BadRequest(message)
            | AppError::Unauthorized(message)
            | AppError::Forbidden(message) => message.clone(),
            AppError::ValidationFailure(errors) => validation_detail(errors),
            AppError::RateLimited {
                operation,
                reset_at,
            } => format!(
                "Rate limit exceeded for {}. Try again after {}",
                operation,
                to_iso_millis(*reset_at)
            ),
            AppError::DbErr(_)
            | AppError::IntegrityViolation { .. }
            | AppError::TransactionFailure(_)
            | AppError::InternalServerError(_) => INTERNAL_DETAIL.to_string(),
        }
    }

    /// 監査ログに残す短い分類名
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::DbErr(_) => "database_error",
            AppError::NotFound(_) => "not_found",
            AppError::ValidationError(_) | AppError::ValidationFailure(_) => "validation_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::IntegrityViolation { .. } => "integrity_violation",
            AppError::TransactionFailure(_) => "transaction_failure",
            AppError::InternalServerError(_) => "internal_server_error",
        }
    }
}

fn validation_detail(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map_or_else(|| "Invalid value".to_string(), |m| m.to_string());
                format!("{}: {}", field, message)
            })
        })
        .collect();
    messages.sort();
    if messages.is_empty() {
        "Validation failed".to_string()
    } else {
        messages.join("; ")
    }
}

// axum でエラーをHTTPレスポンスに変換するための実装
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // サーバーログには詳細を出す
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "Request failed");
        }

        let body = ErrorResponse {
            detail: self.detail(),
        };

        (status, Json(body)).into_response()
    }
}

// Result 型のエイリアス
pub type AppResult<T> = Result<T, AppError>;

/// 統一的なエラーレスポンス構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
