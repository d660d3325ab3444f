// 响应缓存模块
// 仅用于共享 Key 流量；BYOK 请求不读写缓存

pub mod keys;
pub mod models;
pub mod store;

pub use keys::build_cache_key;
pub use models::CacheClass;
pub use store::{CacheStore, MemoryCacheStore, RedisCacheStore};
