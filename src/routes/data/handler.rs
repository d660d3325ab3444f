use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::HeaderMap,
};
use serde_json::Value;
use std::net::SocketAddr;

use super::model::DataRequest;
use crate::{
    AppState,
    aggregator::{self, keys::resolve_provider_key},
    error::GatewayError,
    rate_limit::{AGGREGATOR_BYOK, AGGREGATOR_SHARED},
    utils::{GatewayJson, client_ip},
};

/// 聚合取数入口：限流 → Key 解析 → 端点扇出
#[axum::debug_handler]
pub async fn aggregate(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    GatewayJson(req): GatewayJson<DataRequest>,
) -> Result<Json<Value>, GatewayError> {
    if req.endpoints.is_empty() {
        return Err(GatewayError::Validation(
            "endpoints 不能为空".to_string(),
        ));
    }

    let resolved = resolve_provider_key(
        req.api_key.as_deref(),
        state.config.shared_coingecko_api_key.as_deref(),
    );

    // BYOK 请求套用更高的限流档
    let byok = resolved.as_ref().is_some_and(|r| !r.shared);
    let policy = if byok { AGGREGATOR_BYOK } else { AGGREGATOR_SHARED };

    let ip = client_ip(&headers, Some(addr));
    let decision = state.rate_limits.hit(&ip, &policy).await?;
    if !decision.allowed {
        return Err(GatewayError::RateLimited {
            retry_after_secs: decision.retry_after_secs,
        });
    }

    let envelope = aggregator::run(&state, &req, resolved.as_ref()).await?;

    // 用量记录是旁路任务，失败只打日志，绝不影响主响应
    spawn_usage_log(ip, req.endpoints.clone(), !byok);

    Ok(Json(envelope))
}

fn spawn_usage_log(ip: String, endpoints: Vec<String>, shared: bool) {
    tokio::spawn(async move {
        tracing::info!(
            target: "gateway::usage",
            ip = %ip,
            endpoints = ?endpoints,
            shared_key = shared,
            "聚合请求完成"
        );
    });
}
