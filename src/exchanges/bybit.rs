use std::time::Duration;

use serde_json::Value;

use super::{Exchange, ExchangeCredential, send_signed, sign};
use crate::error::GatewayError;

const BALANCE_PATH: &str = "/v5/account/wallet-balance";
const BALANCE_QUERY: &str = "accountType=UNIFIED";
const RECV_WINDOW: &str = "5000";

/// 待签名输入：时间戳 + apiKey + recvWindow + 查询串，摘要取 HMAC-SHA256 的 hex
pub fn sign_request(
    secret: &str,
    timestamp: &str,
    api_key: &str,
    recv_window: &str,
    query: &str,
) -> String {
    sign::hmac_sha256_hex(secret, &format!("{}{}{}{}", timestamp, api_key, recv_window, query))
}

pub async fn fetch_balances(
    http: &reqwest::Client,
    base_url: &str,
    cred: &ExchangeCredential,
    timeout: Duration,
) -> Result<Value, GatewayError> {
    let timestamp = chrono::Utc::now().timestamp_millis().to_string();
    let signature = sign_request(
        &cred.api_secret,
        &timestamp,
        &cred.api_key,
        RECV_WINDOW,
        BALANCE_QUERY,
    );

    let request = http
        .get(format!("{}{}?{}", base_url, BALANCE_PATH, BALANCE_QUERY))
        .header("X-BAPI-API-KEY", &cred.api_key)
        .header("X-BAPI-SIGN", signature)
        .header("X-BAPI-TIMESTAMP", timestamp)
        .header("X-BAPI-RECV-WINDOW", RECV_WINDOW);
    let body = send_signed(Exchange::Bybit, request, timeout).await?;

    // Bybit 的失败走 200 + retCode
    if let Some(ret_code) = body.get("retCode").and_then(|c| c.as_i64()) {
        if ret_code != 0 {
            let msg = body
                .get("retMsg")
                .and_then(|m| m.as_str())
                .unwrap_or("bybit 调用失败");
            return Err(GatewayError::Upstream(msg.to_string()));
        }
    }
    Ok(body)
}
