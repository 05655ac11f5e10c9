// legal-backend/src/infrastructure/rate_limit.rs

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppResult;
use crate::log_with_context;
use crate::shared::clock::Clock;

/// 操作ごとのレート制限ポリシー（上限回数とウィンドウ幅）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub limit: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

/// (ユーザー, 操作名) のキー
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub user_id: Uuid,
    pub operation: String,
}

impl RateLimitKey {
    pub fn new(user_id: Uuid, operation: impl Into<String>) -> Self {
        Self {
            user_id,
            operation: operation.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        count: u32,
        reset_at: DateTime<Utc>,
    },
    Denied {
        reset_at: DateTime<Utc>,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }

    pub fn reset_at(&self) -> DateTime<Utc> {
        match self {
            RateLimitDecision::Allowed { reset_at, .. } | RateLimitDecision::Denied { reset_at } => {
                *reset_at
            }
        }
    }
}

/// キーごとのカウンタ
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitCounter {
    pub count: u32,
    pub window_start: DateTime<Utc>,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitCounter {
    fn open(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            count: 0,
            window_start: now,
            reset_at: now + window,
        }
    }

    /// カウンタを1回分進める。ウィンドウ終了後は新しいウィンドウを開始する
    fn advance(&mut self, policy: RateLimitPolicy, now: DateTime<Utc>) -> RateLimitDecision {
        if now >= self.reset_at {
            *self = Self::open(now, policy.window);
        }
        if self.count >= policy.limit {
            return RateLimitDecision::Denied {
                reset_at: self.reset_at,
            };
        }

        self.count += 1;
        RateLimitDecision::Allowed {
            count: self.count,
            reset_at: self.reset_at,
        }
    }
}

/// レート制限の状態ストア。check_and_increment はキー単位でアトミックでなければならない
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn check_and_increment(
        &self,
        key: &RateLimitKey,
        policy: RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitDecision>;
}

/// プロセス内のレート制限ストレージ（再起動で消える）
#[derive(Clone, Default)]
pub struct InMemoryRateLimitStore {
    counters: Arc<Mutex<HashMap<RateLimitKey, RateLimitCounter>>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn counter(&self, key: &RateLimitKey) -> Option<RateLimitCounter> {
        self.counters.lock().await.get(key).cloned()
    }

    /// 期限切れのカウンタを削除し、削除件数を返す
    pub async fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let mut counters = self.counters.lock().await;
        let before = counters.len();
        counters.retain(|_, counter| now < counter.reset_at);
        before - counters.len()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn check_and_increment(
        &self,
        key: &RateLimitKey,
        policy: RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitDecision> {
        let mut counters = self.counters.lock().await;

        let counter = counters
            .entry(key.clone())
            .or_insert_with(|| RateLimitCounter::open(now, policy.window));

        Ok(counter.advance(policy, now))
    }
}

/// 機密操作のレート制限
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn check_and_increment(
        &self,
        user_id: Uuid,
        operation: &str,
        policy: RateLimitPolicy,
    ) -> AppResult<RateLimitDecision> {
        let key = RateLimitKey::new(user_id, operation);
        let now = self.clock.now();
        let decision = self.store.check_and_increment(&key, policy, now).await?;

        match &decision {
            RateLimitDecision::Allowed { count, reset_at } => log_with_context!(
                tracing::Level::DEBUG,
                "Rate limit check passed",
                "user_id" => user_id,
                "operation" => operation,
                "count" => count,
                "limit" => policy.limit,
                "reset_at" => reset_at
            ),
            RateLimitDecision::Denied { reset_at } => log_with_context!(
                tracing::Level::WARN,
                "Rate limit exceeded",
                "user_id" => user_id,
                "operation" => operation,
                "limit" => policy.limit,
                "reset_at" => reset_at
            ),
        }

        Ok(decision)
    }
}
