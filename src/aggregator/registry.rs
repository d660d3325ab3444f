use serde_json::{Map, Value};

use crate::cache::CacheClass;

/// 端点背后的数据提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// CoinGecko 风格的行情接口；needs_key=false 的端点完全免 Key
    CoinGecko { needs_key: bool },
    /// Alchemy JSON-RPC，凭证由请求体里的 alchemyKey 提供
    Alchemy,
}

/// 聚合器暴露的单个逻辑端点
pub struct EndpointDescriptor {
    pub name: &'static str,
    pub provider: Provider,
    /// None 表示该端点不可缓存
    pub cache_class: Option<CacheClass>,
    pub required_params: &'static [&'static str],
    /// 生成上游路径与查询串（必填参数已校验后调用）
    pub build_path: fn(&Map<String, Value>) -> String,
    /// 成功后的裁剪：截断超长列表、剔除用不到的重字段
    pub shape: Option<fn(Value) -> Value>,
}

/// 行情列表单页上限，也是缓存里保存的最大条数
const MARKETS_MAX_PER_PAGE: u64 = 250;
const TRENDING_MAX_COINS: usize = 15;

static REGISTRY: &[EndpointDescriptor] = &[
    EndpointDescriptor {
        name: "global",
        provider: Provider::CoinGecko { needs_key: true },
        cache_class: Some(CacheClass::Snapshot),
        required_params: &[],
        build_path: |_| "/global".to_string(),
        shape: None,
    },
    EndpointDescriptor {
        name: "markets",
        provider: Provider::CoinGecko { needs_key: true },
        cache_class: Some(CacheClass::Snapshot),
        required_params: &[],
        build_path: |params| {
            let vs = param_str(params, "vsCurrency").unwrap_or_else(|| "usd".to_string());
            let per_page = param_u64(params, "perPage")
                .unwrap_or(100)
                .min(MARKETS_MAX_PER_PAGE);
            let page = param_u64(params, "page").unwrap_or(1).max(1);
            format!(
                "/coins/markets?vs_currency={}&order=market_cap_desc&per_page={}&page={}&sparkline=false&price_change_percentage=24h",
                vs, per_page, page
            )
        },
        shape: Some(|value| truncate_array(value, MARKETS_MAX_PER_PAGE as usize)),
    },
    EndpointDescriptor {
        name: "ohlc",
        provider: Provider::CoinGecko { needs_key: true },
        cache_class: Some(CacheClass::Series),
        required_params: &["coinId", "days"],
        build_path: |params| {
            let coin = param_str(params, "coinId").unwrap_or_default();
            let days = param_str(params, "days").unwrap_or_default();
            let vs = param_str(params, "vsCurrency").unwrap_or_else(|| "usd".to_string());
            format!("/coins/{}/ohlc?vs_currency={}&days={}", coin, vs, days)
        },
        shape: None,
    },
    EndpointDescriptor {
        name: "coin",
        provider: Provider::CoinGecko { needs_key: true },
        cache_class: Some(CacheClass::Detail),
        required_params: &["coinId"],
        build_path: |params| {
            let coin = param_str(params, "coinId").unwrap_or_default();
            format!(
                "/coins/{}?localization=false&tickers=false&market_data=true&community_data=false&developer_data=false",
                coin
            )
        },
        shape: Some(strip_heavy_coin_fields),
    },
    EndpointDescriptor {
        name: "categories",
        provider: Provider::CoinGecko { needs_key: true },
        cache_class: Some(CacheClass::Series),
        required_params: &[],
        build_path: |_| "/coins/categories?order=market_cap_desc".to_string(),
        shape: None,
    },
    EndpointDescriptor {
        name: "trending",
        provider: Provider::CoinGecko { needs_key: false },
        cache_class: Some(CacheClass::Snapshot),
        required_params: &[],
        build_path: |_| "/search/trending".to_string(),
        shape: Some(|mut value| {
            if let Some(coins) = value.get_mut("coins").and_then(|c| c.as_array_mut()) {
                coins.truncate(TRENDING_MAX_COINS);
            }
            value
        }),
    },
    EndpointDescriptor {
        name: "defi",
        provider: Provider::CoinGecko { needs_key: false },
        cache_class: Some(CacheClass::Snapshot),
        required_params: &[],
        build_path: |_| "/global/decentralized_finance_defi".to_string(),
        shape: None,
    },
    EndpointDescriptor {
        name: "walletTokens",
        provider: Provider::Alchemy,
        // 钱包余额随调用方凭证走，不进共享缓存
        cache_class: None,
        required_params: &[],
        build_path: |_| String::new(),
        shape: None,
    },
];

pub fn find(name: &str) -> Option<&'static EndpointDescriptor> {
    REGISTRY.iter().find(|d| d.name == name)
}

pub fn param_str(params: &Map<String, Value>, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn param_u64(params: &Map<String, Value>, key: &str) -> Option<u64> {
    match params.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truncate_array(value: Value, max: usize) -> Value {
    match value {
        Value::Array(mut items) => {
            items.truncate(max);
            Value::Array(items)
        }
        other => other,
    }
}

fn strip_heavy_coin_fields(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        obj.remove("tickers");
        obj.remove("status_updates");
        obj.remove("public_notice");
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn registry_knows_all_exposed_endpoints() {
        for name in [
            "global",
            "markets",
            "ohlc",
            "coin",
            "categories",
            "trending",
            "defi",
            "walletTokens",
        ] {
            assert!(find(name).is_some(), "缺少端点 {}", name);
        }
        assert!(find("nonexistent").is_none());
    }

    #[test]
    fn markets_path_clamps_per_page() {
        let d = find("markets").unwrap();
        let path = (d.build_path)(&params(json!({"perPage": 5000, "vsCurrency": "eur"})));
        assert!(path.contains("per_page=250"));
        assert!(path.contains("vs_currency=eur"));
    }

    #[test]
    fn ohlc_declares_required_params() {
        let d = find("ohlc").unwrap();
        assert_eq!(d.required_params, ["coinId", "days"]);
        let path = (d.build_path)(&params(json!({"coinId": "bitcoin", "days": "7"})));
        assert_eq!(path, "/coins/bitcoin/ohlc?vs_currency=usd&days=7");
    }

    #[test]
    fn trending_and_defi_are_key_free() {
        for name in ["trending", "defi"] {
            match find(name).unwrap().provider {
                Provider::CoinGecko { needs_key } => assert!(!needs_key),
                _ => panic!("{} 应为 CoinGecko 端点", name),
            }
        }
    }

    #[test]
    fn coin_shape_strips_heavy_fields() {
        let shaped = strip_heavy_coin_fields(json!({
            "id": "bitcoin",
            "tickers": [1, 2, 3],
            "market_data": {"current_price": {}}
        }));
        assert!(shaped.get("tickers").is_none());
        assert!(shaped.get("market_data").is_some());
    }
}
