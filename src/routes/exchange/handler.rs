use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::HeaderMap,
};
use std::net::SocketAddr;

use super::model::{ExchangeBalanceRequest, ExchangeBalanceResponse};
use crate::{
    AppState,
    error::GatewayError,
    exchanges::{self, Exchange, ExchangeCredential, normalize::normalize},
    rate_limit::EXCHANGE_BALANCE,
    utils::{GatewayJson, client_ip},
};

/// 交易所余额入口：限流 → 凭证校验 → 签名请求 → 归一化
#[axum::debug_handler]
pub async fn exchange_balance(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    GatewayJson(req): GatewayJson<ExchangeBalanceRequest>,
) -> Result<Json<ExchangeBalanceResponse>, GatewayError> {
    let ip = client_ip(&headers, Some(addr));
    let decision = state.rate_limits.hit(&ip, &EXCHANGE_BALANCE).await?;
    if !decision.allowed {
        return Err(GatewayError::RateLimited {
            retry_after_secs: decision.retry_after_secs,
        });
    }

    let exchange = Exchange::from_name(&req.exchange)
        .ok_or_else(|| GatewayError::Validation(format!("不支持的交易所: {}", req.exchange)))?;

    let cred = ExchangeCredential {
        exchange,
        api_key: req.api_key,
        api_secret: req.api_secret,
        passphrase: req.passphrase,
    };

    let raw = exchanges::fetch_balances(
        &state.http,
        exchange.default_base_url(),
        &cred,
        state.config.exchange_timeout(),
    )
    .await?;

    let balances = normalize(exchange, &raw);
    Ok(Json(ExchangeBalanceResponse {
        exchange: exchange.name(),
        count: balances.len(),
        balances,
        fetched_at: chrono::Utc::now().to_rfc3339(),
    }))
}
