use std::time::{Duration, Instant};

use serde_json::Value;

/// 缓存档位，决定各类端点的 TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheClass {
    /// 高频快照（行情、全局指标）
    Snapshot,
    /// K 线、分类列表等慢变序列
    Series,
    /// 单币种静态详情
    Detail,
}

impl CacheClass {
    pub fn ttl(&self) -> Duration {
        match self {
            CacheClass::Snapshot => Duration::from_secs(60),
            CacheClass::Series => Duration::from_secs(300),
            CacheClass::Detail => Duration::from_secs(3600),
        }
    }

    /// 未识别档位时的兜底 TTL
    pub fn default_ttl() -> Duration {
        Duration::from_secs(300)
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Value,
    pub expires_at: Instant,
    /// 插入序号，驱动“最老先逐出”
    pub seq: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_table_matches_classes() {
        assert_eq!(CacheClass::Snapshot.ttl(), Duration::from_secs(60));
        assert_eq!(CacheClass::Series.ttl(), Duration::from_secs(300));
        assert_eq!(CacheClass::Detail.ttl(), Duration::from_secs(3600));
        assert_eq!(CacheClass::default_ttl(), Duration::from_secs(300));
    }
}
