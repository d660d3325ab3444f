use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::Value;

use super::models::CacheEntry;

/// 响应缓存的存储抽象：单实例用内存实现，多实例部署切换到 Redis 实现。
/// 缓存是尽力而为的，存储故障按未命中处理，不影响主流程。
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, data: Value, ttl: Duration);
}

/// 进程内缓存，带条目上限与两段式逐出
pub struct MemoryCacheStore {
    inner: Mutex<MemoryCacheInner>,
    max_entries: usize,
}

struct MemoryCacheInner {
    map: HashMap<String, CacheEntry>,
    seq: u64,
}

impl MemoryCacheStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(MemoryCacheInner {
                map: HashMap::new(),
                seq: 0,
            }),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.map.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<Value> {
        let Ok(mut inner) = self.inner.lock() else {
            return None;
        };
        let now = Instant::now();
        // 读取时惰性逐出过期条目
        if inner.map.get(key).is_some_and(|e| e.is_expired(now)) {
            inner.map.remove(key);
            return None;
        }
        inner.map.get(key).map(|e| e.data.clone())
    }

    async fn set(&self, key: &str, data: Value, ttl: Duration) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.seq += 1;
        let entry = CacheEntry {
            data,
            expires_at: Instant::now() + ttl,
            seq: inner.seq,
        };
        inner.map.insert(key.to_string(), entry);

        if inner.map.len() > self.max_entries {
            // 第一轮：清理已过期的条目
            let now = Instant::now();
            inner.map.retain(|_, e| !e.is_expired(now));

            // 第二轮：仍超限则按插入序号从最老开始逐出
            while inner.map.len() > self.max_entries {
                let oldest = inner
                    .map
                    .iter()
                    .min_by_key(|(_, e)| e.seq)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        inner.map.remove(&k);
                    }
                    None => break,
                }
            }
        }
    }
}

/// Redis 缓存实现，多实例部署时共享；TTL 交给 Redis 的 EX 处理
pub struct RedisCacheStore {
    redis: Arc<redis::Client>,
    prefix: &'static str,
}

impl RedisCacheStore {
    pub fn new(redis: Arc<redis::Client>) -> Self {
        Self {
            redis,
            prefix: "resp_cache:",
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut conn = match self.redis.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("缓存读取失败，按未命中处理: {}", e);
                return None;
            }
        };
        let redis_key = format!("{}{}", self.prefix, key);
        let raw: Option<String> = match conn.get(redis_key).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("缓存读取失败，按未命中处理: {}", e);
                return None;
            }
        };
        raw.and_then(|json| serde_json::from_str(&json).ok())
    }

    async fn set(&self, key: &str, data: Value, ttl: Duration) {
        let mut conn = match self.redis.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("缓存写入失败: {}", e);
                return;
            }
        };
        let redis_key = format!("{}{}", self.prefix, key);
        let json = match serde_json::to_string(&data) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("缓存序列化失败: {}", e);
                return;
            }
        };
        let result: Result<(), _> = conn.set_ex(redis_key, json, ttl.as_secs()).await;
        if let Err(e) = result {
            tracing::warn!("缓存写入失败: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn entry_is_never_served_past_ttl() {
        let store = MemoryCacheStore::new(10);
        store
            .set("markets:page=1", json!({"price": 1}), Duration::from_millis(20))
            .await;
        assert!(store.get("markets:page=1").await.is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.get("markets:page=1").await.is_none());
        // 过期条目在读取时被移除
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn miss_on_unknown_key() {
        let store = MemoryCacheStore::new(10);
        assert!(store.get("global:").await.is_none());
    }

    #[tokio::test]
    async fn eviction_removes_expired_then_oldest() {
        let store = MemoryCacheStore::new(3);
        store.set("a", json!(1), Duration::from_millis(5)).await;
        store.set("b", json!(2), Duration::from_secs(60)).await;
        store.set("c", json!(3), Duration::from_secs(60)).await;

        tokio::time::sleep(Duration::from_millis(10)).await;
        // 超限触发逐出：过期的 a 先被清理，容量回到上限内
        store.set("d", json!(4), Duration::from_secs(60)).await;
        assert_eq!(store.len(), 3);
        assert!(store.get("a").await.is_none());
        assert!(store.get("b").await.is_some());

        // 再超限时没有过期条目，按最老插入逐出 b
        store.set("e", json!(5), Duration::from_secs(60)).await;
        assert_eq!(store.len(), 3);
        assert!(store.get("b").await.is_none());
        assert!(store.get("c").await.is_some());
        assert!(store.get("e").await.is_some());
    }

    #[tokio::test]
    async fn overwrite_refreshes_entry() {
        let store = MemoryCacheStore::new(10);
        store.set("k", json!("old"), Duration::from_secs(60)).await;
        store.set("k", json!("new"), Duration::from_secs(60)).await;
        assert_eq!(store.get("k").await, Some(json!("new")));
        assert_eq!(store.len(), 1);
    }
}
