use std::time::Duration;

use serde_json::Value;

use super::{Exchange, ExchangeCredential, send_signed, sign};
use crate::error::GatewayError;

const BALANCE_PATH: &str = "/0/private/Balance";

/// Kraken 的签名是二进制拼接：`path ++ SHA256(nonce ++ postBody)`，
/// HMAC-SHA512 的密钥是 base64 解码后的 secret，摘要再 base64 编码
pub fn sign_request(
    secret_b64: &str,
    path: &str,
    nonce: &str,
    post_body: &str,
) -> Result<String, GatewayError> {
    let key = sign::b64_decode(secret_b64)
        .map_err(|_| GatewayError::Validation("Kraken Secret 不是合法的 base64".to_string()))?;

    let inner = sign::sha256_digest(format!("{}{}", nonce, post_body).as_bytes());
    let mut payload = path.as_bytes().to_vec();
    payload.extend_from_slice(&inner);
    Ok(sign::hmac_sha512_base64(&key, &payload))
}

pub async fn fetch_balances(
    http: &reqwest::Client,
    base_url: &str,
    cred: &ExchangeCredential,
    timeout: Duration,
) -> Result<Value, GatewayError> {
    let nonce = chrono::Utc::now().timestamp_millis().to_string();
    let post_body = format!("nonce={}", nonce);
    let signature = sign_request(&cred.api_secret, BALANCE_PATH, &nonce, &post_body)?;

    let request = http
        .post(format!("{}{}", base_url, BALANCE_PATH))
        .header("API-Key", &cred.api_key)
        .header("API-Sign", signature)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(post_body);
    let body = send_signed(Exchange::Kraken, request, timeout).await?;

    // Kraken 用 200 + error 数组表达失败
    if let Some(err) = body
        .get("error")
        .and_then(|e| e.as_array())
        .and_then(|errs| errs.first())
        .and_then(|e| e.as_str())
        .filter(|e| !e.is_empty())
    {
        return Err(GatewayError::Upstream(err.to_string()));
    }
    Ok(body)
}
