// 交易所余额网关
// 六家交易所各自一套签名协议，互不通用；统一在这里分发

pub mod binance;
pub mod bybit;
pub mod coinbase;
pub mod kraken;
pub mod kucoin;
pub mod normalize;
pub mod okx;
pub mod sign;

use std::time::Duration;

use serde_json::Value;

use crate::error::GatewayError;

/// 凭证字段的最小可信长度
const MIN_CREDENTIAL_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    Binance,
    Coinbase,
    Kraken,
    Kucoin,
    Bybit,
    Okx,
}

impl Exchange {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "binance" => Some(Exchange::Binance),
            "coinbase" => Some(Exchange::Coinbase),
            "kraken" => Some(Exchange::Kraken),
            "kucoin" => Some(Exchange::Kucoin),
            "bybit" => Some(Exchange::Bybit),
            "okx" => Some(Exchange::Okx),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Exchange::Binance => "binance",
            Exchange::Coinbase => "coinbase",
            Exchange::Kraken => "kraken",
            Exchange::Kucoin => "kucoin",
            Exchange::Bybit => "bybit",
            Exchange::Okx => "okx",
        }
    }

    /// KuCoin 与 OKX 的私有接口要求 passphrase
    pub fn requires_passphrase(&self) -> bool {
        matches!(self, Exchange::Kucoin | Exchange::Okx)
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Exchange::Binance => "https://api.binance.com",
            Exchange::Coinbase => "https://api.coinbase.com",
            Exchange::Kraken => "https://api.kraken.com",
            Exchange::Kucoin => "https://api.kucoin.com",
            Exchange::Bybit => "https://api.bybit.com",
            Exchange::Okx => "https://www.okx.com",
        }
    }
}

/// 一次请求内的交易所凭证；绝不持久化
#[derive(Clone)]
pub struct ExchangeCredential {
    pub exchange: Exchange,
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: Option<String>,
}

impl ExchangeCredential {
    /// 发起任何网络调用之前的本地校验
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.api_key.trim().len() < MIN_CREDENTIAL_LEN
            || self.api_secret.trim().len() < MIN_CREDENTIAL_LEN
        {
            return Err(GatewayError::Auth(
                "API Key 或 Secret 缺失或过短".to_string(),
            ));
        }
        if self.exchange.requires_passphrase()
            && self
                .passphrase
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .is_none()
        {
            return Err(GatewayError::Auth(format!(
                "{} 需要提供 passphrase",
                self.exchange.name()
            )));
        }
        Ok(())
    }

    pub fn passphrase(&self) -> &str {
        self.passphrase.as_deref().unwrap_or("")
    }
}

/// 校验凭证并向对应交易所发起已签名的余额查询，返回交易所原生报文
pub async fn fetch_balances(
    http: &reqwest::Client,
    base_url: &str,
    cred: &ExchangeCredential,
    timeout: Duration,
) -> Result<Value, GatewayError> {
    cred.validate()?;
    match cred.exchange {
        Exchange::Binance => binance::fetch_balances(http, base_url, cred, timeout).await,
        Exchange::Coinbase => coinbase::fetch_balances(http, base_url, cred, timeout).await,
        Exchange::Kraken => kraken::fetch_balances(http, base_url, cred, timeout).await,
        Exchange::Kucoin => kucoin::fetch_balances(http, base_url, cred, timeout).await,
        Exchange::Bybit => bybit::fetch_balances(http, base_url, cred, timeout).await,
        Exchange::Okx => okx::fetch_balances(http, base_url, cred, timeout).await,
    }
}

/// 发送已签名的请求。超时与上游拒绝是两类错误：
/// 前者映射为 Timeout，文案带“超时”；后者尽量透传交易所的错误消息
pub(crate) async fn send_signed(
    exchange: Exchange,
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<Value, GatewayError> {
    match tokio::time::timeout(timeout, request.send()).await {
        Err(_) => Err(GatewayError::Timeout(format!(
            "{} 请求超时",
            exchange.name()
        ))),
        Ok(Err(e)) => Err(GatewayError::Upstream(format!(
            "{} 请求失败: {}",
            exchange.name(),
            e
        ))),
        Ok(Ok(resp)) => {
            let status = resp.status();
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            if !status.is_success() {
                let msg = error_message(exchange, &body).unwrap_or_else(|| {
                    format!("{} 返回状态码 {}", exchange.name(), status.as_u16())
                });
                return Err(GatewayError::Upstream(msg));
            }
            Ok(body)
        }
    }
}

/// 从交易所错误报文中取出可读消息；字段名各家不同
fn error_message(exchange: Exchange, body: &Value) -> Option<String> {
    match exchange {
        Exchange::Binance | Exchange::Kucoin | Exchange::Okx => body
            .get("msg")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string),
        Exchange::Bybit => body
            .get("retMsg")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string),
        Exchange::Kraken => body
            .get("error")
            .and_then(|e| e.as_array())
            .and_then(|errs| errs.first())
            .and_then(|e| e.as_str())
            .map(str::to_string),
        Exchange::Coinbase => body
            .get("errors")
            .and_then(|e| e.as_array())
            .and_then(|errs| errs.first())
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(exchange: Exchange, passphrase: Option<&str>) -> ExchangeCredential {
        ExchangeCredential {
            exchange,
            api_key: "test-api-key".to_string(),
            api_secret: "test-api-secret".to_string(),
            passphrase: passphrase.map(str::to_string),
        }
    }

    #[test]
    fn exchange_names_round_trip() {
        for name in ["binance", "coinbase", "kraken", "kucoin", "bybit", "okx"] {
            let ex = Exchange::from_name(name).unwrap();
            assert_eq!(ex.name(), name);
        }
        assert!(Exchange::from_name("ftx").is_none());
        // 大小写与空白不敏感
        assert_eq!(Exchange::from_name(" Binance "), Some(Exchange::Binance));
    }

    #[test]
    fn passphrase_required_for_kucoin_and_okx() {
        assert!(cred(Exchange::Kucoin, None).validate().is_err());
        assert!(cred(Exchange::Okx, Some("  ")).validate().is_err());
        assert!(cred(Exchange::Kucoin, Some("pass-1")).validate().is_ok());
        assert!(cred(Exchange::Binance, None).validate().is_ok());
    }

    #[test]
    fn short_credentials_are_rejected() {
        let mut c = cred(Exchange::Binance, None);
        c.api_secret = "short".to_string();
        assert!(c.validate().is_err());
    }

    #[tokio::test]
    async fn missing_passphrase_fails_before_any_network_call() {
        // base_url 指向一个没有监听的端口；校验不过就不会发包，
        // 因此这里必须拿到校验错误而不是连接错误
        let http = reqwest::Client::new();
        let err = fetch_balances(
            &http,
            "http://127.0.0.1:9",
            &cred(Exchange::Okx, None),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        match err {
            GatewayError::Auth(msg) => assert!(msg.contains("passphrase")),
            other => panic!("预期凭证校验错误，实际是 {:?}", other),
        }
    }

    #[test]
    fn error_message_extraction_per_exchange() {
        use serde_json::json;
        assert_eq!(
            error_message(Exchange::Binance, &json!({"code": -2014, "msg": "bad key"})),
            Some("bad key".to_string())
        );
        assert_eq!(
            error_message(Exchange::Bybit, &json!({"retCode": 10003, "retMsg": "invalid api_key"})),
            Some("invalid api_key".to_string())
        );
        assert_eq!(
            error_message(Exchange::Kraken, &json!({"error": ["EAPI:Invalid key"]})),
            Some("EAPI:Invalid key".to_string())
        );
        assert_eq!(
            error_message(
                Exchange::Coinbase,
                &json!({"errors": [{"id": "authentication_error", "message": "invalid signature"}]})
            ),
            Some("invalid signature".to_string())
        );
        assert_eq!(error_message(Exchange::Okx, &Value::Null), None);
    }
}
