use std::sync::Arc;

use config::Config;

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod exchanges;
pub mod middleware;
pub mod rate_limit;
pub mod router;
pub mod routes;
pub mod utils;

use cache::{CacheStore, MemoryCacheStore, RedisCacheStore};
use rate_limit::{MemoryRateLimiterStore, RateLimiterStore, RedisRateLimiterStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http: reqwest::Client,
    pub cache: Arc<dyn CacheStore>,
    pub rate_limits: Arc<dyn RateLimiterStore>,
}

impl AppState {
    /// 根据配置挑选存储实现：配置了 REDIS_URL 就用 Redis（多实例共享），
    /// 否则落到进程内存储（单实例）
    pub fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()?;

        let (cache, rate_limits): (Arc<dyn CacheStore>, Arc<dyn RateLimiterStore>) =
            match &config.redis_url {
                Some(url) => {
                    let redis = Arc::new(redis::Client::open(url.clone())?);
                    (
                        Arc::new(RedisCacheStore::new(redis.clone())),
                        Arc::new(RedisRateLimiterStore::new(redis)),
                    )
                }
                None => (
                    Arc::new(MemoryCacheStore::new(config.cache_max_entries)),
                    Arc::new(MemoryRateLimiterStore::new()),
                ),
            };

        Ok(Self {
            config,
            http,
            cache,
            rate_limits,
        })
    }
}
