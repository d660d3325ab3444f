// 聚合器：一次请求并发拉取多个上游端点
// 单个端点失败只产生对应的 <name>Error 字段，绝不拖垮同批的其他端点

pub mod keys;
pub mod registry;

use futures_util::future::join_all;
use serde_json::{Map, Value, json};
use std::time::Duration;

use crate::AppState;
use crate::cache::{CacheClass, build_cache_key};
use crate::error::GatewayError;
use crate::routes::data::model::DataRequest;
use keys::ResolvedKey;
use registry::Provider;

/// 执行一次端点扇出，返回响应信封。
/// 全部端点失败时整体视为上游失败，携带第一条错误；
/// 部分失败时正常返回，失败端点记入 `_partialErrors`
pub async fn run(
    state: &AppState,
    req: &DataRequest,
    resolved: Option<&ResolvedKey>,
) -> Result<Value, GatewayError> {
    // BYOK 分支不读写缓存，共享 Key（或无 Key 的免 Key 端点）允许缓存
    let cache_enabled = resolved.map(|r| r.shared).unwrap_or(true);

    let tasks = req.endpoints.iter().map(|name| async move {
        let outcome = fetch_endpoint(state, req, resolved, name, cache_enabled).await;
        (name.clone(), outcome)
    });
    // join_all 保持请求顺序，“第一条错误”即请求列表里最靠前的失败
    let results = join_all(tasks).await;

    let mut envelope = Map::new();
    let mut failed: Vec<String> = Vec::new();
    let mut first_error: Option<String> = None;
    let mut succeeded = 0usize;

    for (name, outcome) in results {
        match outcome {
            Ok(data) => {
                succeeded += 1;
                envelope.insert(name, data);
            }
            Err(msg) => {
                tracing::warn!("端点 {} 获取失败: {}", name, msg);
                if first_error.is_none() {
                    first_error = Some(msg.clone());
                }
                envelope.insert(format!("{}Error", name), Value::String(msg));
                failed.push(name);
            }
        }
    }

    if succeeded == 0 {
        if let Some(err) = first_error {
            return Err(GatewayError::Upstream(err));
        }
    }

    if !failed.is_empty() {
        envelope.insert("_partialErrors".to_string(), json!(failed));
    }
    if resolved.is_some_and(|r| r.shared) {
        envelope.insert("_usingSharedKey".to_string(), Value::Bool(true));
    }

    Ok(Value::Object(envelope))
}

/// 单端点取数：注册表查找 → 参数校验 → 缓存 → 上游请求 → 裁剪 → 回填缓存。
/// 错误以字符串返回，由调用方落到 `<name>Error` 字段
async fn fetch_endpoint(
    state: &AppState,
    req: &DataRequest,
    resolved: Option<&ResolvedKey>,
    name: &str,
    cache_enabled: bool,
) -> Result<Value, String> {
    let Some(desc) = registry::find(name) else {
        return Err("未知的数据端点".to_string());
    };

    for param in desc.required_params {
        if registry::param_str(&req.params, param).is_none() {
            return Err(format!("缺少必填参数 {}", param));
        }
    }

    match desc.provider {
        Provider::Alchemy => fetch_wallet_tokens(state, req).await,
        Provider::CoinGecko { needs_key } => {
            if needs_key && resolved.is_none() {
                return Err("缺少 API Key，且服务端未配置共享 Key".to_string());
            }

            let cacheable = cache_enabled && desc.cache_class.is_some();
            let cache_key = build_cache_key(name, &req.params);
            if cacheable {
                if let Some(hit) = state.cache.get(&cache_key).await {
                    return Ok(hit);
                }
            }

            let base = resolved
                .map(|r| r.base_url(&state.config))
                .unwrap_or(&state.config.coingecko_demo_url);
            let url = format!("{}{}", base, (desc.build_path)(&req.params));
            let mut request = state.http.get(&url);
            if let Some(r) = resolved {
                request = request.header(r.header_name(), &r.key);
            }

            let value = send_upstream(request, state.config.aggregator_timeout()).await?;
            let value = match desc.shape {
                Some(shape) => shape(value),
                None => value,
            };

            if cacheable {
                let ttl = desc
                    .cache_class
                    .map(|c| c.ttl())
                    .unwrap_or_else(CacheClass::default_ttl);
                state.cache.set(&cache_key, value.clone(), ttl).await;
            }
            Ok(value)
        }
    }
}

/// 钱包代币余额（Alchemy JSON-RPC）；凭证来自请求体，不走共享缓存
async fn fetch_wallet_tokens(state: &AppState, req: &DataRequest) -> Result<Value, String> {
    let key = req
        .alchemy_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| "缺少 alchemyKey".to_string())?;
    let wallet = req
        .wallet_address
        .as_deref()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .ok_or_else(|| "缺少 walletAddress".to_string())?;
    let chain = req
        .alchemy_chain
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("eth-mainnet");

    let url = format!(
        "{}/{}",
        state.config.alchemy_base_url.replace("{chain}", chain),
        key
    );
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "alchemy_getTokenBalances",
        "params": [wallet, "erc20"],
    });

    let value = send_upstream(
        state.http.post(&url).json(&body),
        state.config.aggregator_timeout(),
    )
    .await?;

    if let Some(err) = value.get("error") {
        let msg = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("未知错误");
        return Err(format!("Alchemy 调用失败: {}", msg));
    }
    Ok(value.get("result").cloned().unwrap_or(Value::Null))
}

/// 发送一个上游请求并把失败翻译成端点级错误文案。
/// 超时的文案与上游拒绝区分开；429 与 401/403 单独映射
async fn send_upstream(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<Value, String> {
    match tokio::time::timeout(timeout, request.send()).await {
        Err(_) => Err("上游请求超时".to_string()),
        Ok(Err(e)) => Err(format!("上游请求失败: {}", e)),
        Ok(Ok(resp)) => {
            let status = resp.status();
            match status.as_u16() {
                429 => Err("上游接口限流，请稍后重试".to_string()),
                401 | 403 => Err("API Key 无效或无权限".to_string()),
                code if !status.is_success() => Err(format!("上游请求失败（状态码 {}）", code)),
                _ => resp
                    .json::<Value>()
                    .await
                    .map_err(|e| format!("上游响应解析失败: {}", e)),
            }
        }
    }
}
