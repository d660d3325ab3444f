use std::env;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    /// 可选的 Redis 地址；未配置时使用进程内存储
    pub redis_url: Option<String>,
    /// 服务端托管的共享 CoinGecko Key（调用方未自带 Key 时的降级路径）
    pub shared_coingecko_api_key: Option<String>,
    pub coingecko_demo_url: String,
    pub coingecko_pro_url: String,
    pub alchemy_base_url: String,
    pub aggregator_timeout_secs: u64,
    pub exchange_timeout_secs: u64,
    pub cache_max_entries: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "::".to_string()),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".to_string()),
            redis_url: env::var("REDIS_URL").ok(),
            shared_coingecko_api_key: env::var("SHARED_COINGECKO_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            coingecko_demo_url: env::var("COINGECKO_DEMO_URL")
                .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string()),
            coingecko_pro_url: env::var("COINGECKO_PRO_URL")
                .unwrap_or_else(|_| "https://pro-api.coingecko.com/api/v3".to_string()),
            alchemy_base_url: env::var("ALCHEMY_BASE_URL")
                .unwrap_or_else(|_| "https://{chain}.g.alchemy.com/v2".to_string()),
            aggregator_timeout_secs: env::var("AGGREGATOR_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(12),
            exchange_timeout_secs: env::var("EXCHANGE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            cache_max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
        })
    }

    pub fn aggregator_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregator_timeout_secs)
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_timeout_secs)
    }
}

#[cfg(test)]
impl Default for Config {
    fn default() -> Self {
        Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            api_base_uri: "/api".to_string(),
            redis_url: None,
            shared_coingecko_api_key: None,
            coingecko_demo_url: "https://api.coingecko.com/api/v3".to_string(),
            coingecko_pro_url: "https://pro-api.coingecko.com/api/v3".to_string(),
            alchemy_base_url: "https://{chain}.g.alchemy.com/v2".to_string(),
            aggregator_timeout_secs: 12,
            exchange_timeout_secs: 10,
            cache_max_entries: 1000,
        }
    }
}
