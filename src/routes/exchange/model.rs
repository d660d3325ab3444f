use serde::{Deserialize, Serialize};

use crate::exchanges::normalize::NormalizedBalance;

/// `POST /exchange-balance` 的请求体；凭证只在本次请求内存活
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeBalanceRequest {
    pub exchange: String,
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeBalanceResponse {
    pub exchange: &'static str,
    pub balances: Vec<NormalizedBalance>,
    pub count: usize,
    pub fetched_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn response_serializes_camel_case() {
        let resp = ExchangeBalanceResponse {
            exchange: "binance",
            balances: vec![NormalizedBalance {
                asset: "BTC".to_string(),
                free: Decimal::ONE,
                locked: Decimal::ZERO,
            }],
            count: 1,
            fetched_at: "2024-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["fetchedAt"], "2024-01-01T00:00:00Z");
        assert_eq!(json["balances"][0]["asset"], "BTC");
        assert_eq!(json["count"], 1);
    }
}
