use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{Exchange, ExchangeCredential, send_signed, sign};
use crate::error::GatewayError;

const BALANCE_PATH: &str = "/api/v5/account/balance";

/// OKX 要求 ISO-8601 毫秒精度的时间戳参与签名
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// 待签名输入：ISO 时间戳 + 方法 + 路径，摘要取 HMAC-SHA256 的 base64
pub fn sign_request(secret: &str, timestamp: &str, method: &str, path: &str) -> String {
    sign::hmac_sha256_base64(secret, &format!("{}{}{}", timestamp, method, path))
}

pub async fn fetch_balances(
    http: &reqwest::Client,
    base_url: &str,
    cred: &ExchangeCredential,
    timeout: Duration,
) -> Result<Value, GatewayError> {
    let timestamp = iso_timestamp(Utc::now());
    let signature = sign_request(&cred.api_secret, &timestamp, "GET", BALANCE_PATH);

    // 与 KuCoin 不同，passphrase 原样放进请求头
    let request = http
        .get(format!("{}{}", base_url, BALANCE_PATH))
        .header("OK-ACCESS-KEY", &cred.api_key)
        .header("OK-ACCESS-SIGN", signature)
        .header("OK-ACCESS-TIMESTAMP", timestamp)
        .header("OK-ACCESS-PASSPHRASE", cred.passphrase());
    let body = send_signed(Exchange::Okx, request, timeout).await?;

    // OKX 正常应答的业务码是 "0"
    if let Some(code) = body.get("code").and_then(|c| c.as_str()) {
        if code != "0" {
            let msg = body
                .get("msg")
                .and_then(|m| m.as_str())
                .unwrap_or("okx 调用失败");
            return Err(GatewayError::Upstream(msg.to_string()));
        }
    }
    Ok(body)
}
