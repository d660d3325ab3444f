use serde::Deserialize;
use serde_json::{Map, Value};

/// `POST /data` 的请求体
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataRequest {
    /// 调用方自带的 CoinGecko Key（BYOK）
    pub api_key: Option<String>,
    pub alchemy_key: Option<String>,
    pub wallet_address: Option<String>,
    pub alchemy_chain: Option<String>,
    /// 要聚合的逻辑端点名列表
    pub endpoints: Vec<String>,
    /// 端点共用的参数表
    pub params: Map<String, Value>,
}
