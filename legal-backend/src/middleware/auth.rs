// legal-backend/src/middleware/auth.rs

use crate::api::AppState;
use crate::error::AppError;
use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

pub const SESSION_HEADER: &str = "X-Session-Id";
pub const SESSION_COOKIE: &str = "session_id";
const SESSION_QUERY_KEYS: [&str; 2] = ["session_id", "sessionId"];

/// セッションで認証されたユーザー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_string();

        let token = extract_session_token(parts).ok_or_else(|| {
            warn!(path = %path, "Missing session token");
            AppError::Unauthorized("Authentication required".to_string())
        })?;

        let session = state.sessions.find_session(&token).await?.ok_or_else(|| {
            warn!(path = %path, "Unknown session token");
            AppError::Unauthorized("Invalid or expired session".to_string())
        })?;

        if session.is_expired_at(state.clock.now()) {
            warn!(
                user_id = %session.user_id,
                path = %path,
                "Access attempt with expired session"
            );
            return Err(AppError::Unauthorized(
                "Invalid or expired session".to_string(),
            ));
        }

        Ok(Self {
            user_id: session.user_id,
            session_id: session.id,
        })
    }
}

// --- ヘルパー関数 ---

/// Bearer → X-Session-Id → Cookie → クエリパラメータ の順に探す
fn extract_session_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    let session_header = || {
        parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|token| token.trim().to_string())
    };

    let cookie = || {
        CookieJar::from_headers(&parts.headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
    };

    let query = || {
        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri).ok()?;
        SESSION_QUERY_KEYS
            .iter()
            .find_map(|key| params.get(*key).cloned())
    };

    bearer
        .or_else(session_header)
        .or_else(cookie)
        .or_else(query)
        .filter(|token| !token.is_empty())
}

/// クライアントIPを抽出
pub fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    // X-Forwarded-For ヘッダーをチェック（プロキシ経由の場合）
    if let Some(forwarded_for) = headers.get("X-Forwarded-For") {
        if let Ok(forwarded_str) = forwarded_for.to_str() {
            // 最初のIPアドレスを取得
            return forwarded_str
                .split(',')
                .next()
                .map(|ip| ip.trim().to_string());
        }
    }

    if let Some(real_ip) = headers.get("X-Real-IP") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}
