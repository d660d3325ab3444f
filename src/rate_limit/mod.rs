// 限流模块
// 固定窗口计数器（非滑动窗口）：窗口边界处的突发最多可达名义速率的 2 倍，
// 这是有意保留的简化，不要“顺手”改成令牌桶

pub mod store;

use std::time::Duration;

pub use store::{MemoryRateLimiterStore, RateLimiterStore, RedisRateLimiterStore};

/// 单个调用点的限流策略
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// 限流键的命名空间，避免不同调用点互相计数
    pub name: &'static str,
    pub limit: u32,
    pub window: Duration,
}

/// 聚合接口：共享 Key 档
pub const AGGREGATOR_SHARED: RateLimitPolicy = RateLimitPolicy {
    name: "agg_shared",
    limit: 10,
    window: Duration::from_secs(60),
};

/// 聚合接口：BYOK 档（调用方自带 Key，放宽上限）
pub const AGGREGATOR_BYOK: RateLimitPolicy = RateLimitPolicy {
    name: "agg_byok",
    limit: 30,
    window: Duration::from_secs(60),
};

/// 交易所余额接口
pub const EXCHANGE_BALANCE: RateLimitPolicy = RateLimitPolicy {
    name: "exchange_balance",
    limit: 20,
    window: Duration::from_secs(60),
};

/// 一次限流判定的结果
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub retry_after_secs: u64,
}
