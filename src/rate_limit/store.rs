use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use redis::AsyncCommands;

use super::{RateLimitDecision, RateLimitPolicy};
use crate::error::GatewayError;

/// 限流计数的存储抽象。与缓存不同，存储故障不能静默放行，
/// 统一上抛为内部错误
#[async_trait]
pub trait RateLimiterStore: Send + Sync {
    /// 记一次请求并返回判定。固定窗口语义：
    /// 首次请求或窗口已过 => count=1 且刷新 reset_at；否则自增后与上限比较
    async fn hit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, GatewayError>;
}

struct RateLimitEntry {
    count: u32,
    reset_at: Instant,
}

/// 进程内限流存储；锁内无 await，检查与写入之间不存在竞态窗口
pub struct MemoryRateLimiterStore {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl MemoryRateLimiterStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryRateLimiterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimiterStore for MemoryRateLimiterStore {
    async fn hit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, GatewayError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| GatewayError::Internal("限流状态不可用".to_string()))?;

        let now = Instant::now();
        let full_key = format!("{}:{}", policy.name, key);
        let entry = entries.entry(full_key).or_insert(RateLimitEntry {
            count: 0,
            reset_at: now + policy.window,
        });

        if now > entry.reset_at {
            entry.count = 1;
            entry.reset_at = now + policy.window;
        } else {
            entry.count += 1;
        }

        let retry_after_secs = entry.reset_at.saturating_duration_since(now).as_secs().max(1);
        Ok(RateLimitDecision {
            allowed: entry.count <= policy.limit,
            remaining: policy.limit.saturating_sub(entry.count),
            retry_after_secs,
        })
    }
}

/// Redis 限流存储：INCR + 首次设置 EXPIRE，多实例共享计数
pub struct RedisRateLimiterStore {
    redis: Arc<redis::Client>,
}

impl RedisRateLimiterStore {
    pub fn new(redis: Arc<redis::Client>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl RateLimiterStore for RedisRateLimiterStore {
    async fn hit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, GatewayError> {
        let mut conn = self
            .redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| GatewayError::Internal(format!("限流状态不可用: {}", e)))?;

        let redis_key = format!("rate_limit:{}:{}", policy.name, key);
        let count: u32 = conn
            .incr(&redis_key, 1)
            .await
            .map_err(|e| GatewayError::Internal(format!("限流计数失败: {}", e)))?;

        if count == 1 {
            let _: () = conn
                .expire(&redis_key, policy.window.as_secs() as i64)
                .await
                .map_err(|e| GatewayError::Internal(format!("限流窗口设置失败: {}", e)))?;
        }

        let retry_after_secs = if count > policy.limit {
            let ttl: i64 = conn.ttl(&redis_key).await.unwrap_or(-1);
            if ttl > 0 {
                ttl as u64
            } else {
                policy.window.as_secs()
            }
        } else {
            0
        };

        Ok(RateLimitDecision {
            allowed: count <= policy.limit,
            remaining: policy.limit.saturating_sub(count),
            retry_after_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TEST_POLICY: RateLimitPolicy = RateLimitPolicy {
        name: "test",
        limit: 3,
        window: Duration::from_millis(50),
    };

    #[tokio::test]
    async fn denies_the_request_over_the_cap() {
        let store = MemoryRateLimiterStore::new();
        for i in 0..TEST_POLICY.limit {
            let d = store.hit("1.2.3.4", &TEST_POLICY).await.unwrap();
            assert!(d.allowed, "第 {} 次请求应放行", i + 1);
        }
        let d = store.hit("1.2.3.4", &TEST_POLICY).await.unwrap();
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
        assert!(d.retry_after_secs >= 1);
    }

    #[tokio::test]
    async fn window_reset_starts_a_fresh_count() {
        let store = MemoryRateLimiterStore::new();
        for _ in 0..=TEST_POLICY.limit {
            store.hit("5.6.7.8", &TEST_POLICY).await.unwrap();
        }
        assert!(!store.hit("5.6.7.8", &TEST_POLICY).await.unwrap().allowed);

        tokio::time::sleep(Duration::from_millis(70)).await;
        let d = store.hit("5.6.7.8", &TEST_POLICY).await.unwrap();
        assert!(d.allowed);
        // 重置后计数回到 1
        assert_eq!(d.remaining, TEST_POLICY.limit - 1);
    }

    #[tokio::test]
    async fn different_keys_do_not_share_a_window() {
        let store = MemoryRateLimiterStore::new();
        for _ in 0..=TEST_POLICY.limit {
            store.hit("9.9.9.9", &TEST_POLICY).await.unwrap();
        }
        assert!(store.hit("8.8.8.8", &TEST_POLICY).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn policies_keep_separate_namespaces() {
        let other: RateLimitPolicy = RateLimitPolicy {
            name: "other",
            limit: 3,
            window: Duration::from_millis(50),
        };
        let store = MemoryRateLimiterStore::new();
        for _ in 0..=TEST_POLICY.limit {
            store.hit("7.7.7.7", &TEST_POLICY).await.unwrap();
        }
        assert!(store.hit("7.7.7.7", &other).await.unwrap().allowed);
    }
}
