use axum::{Router, routing::post};

use crate::{AppState, middleware::log_errors, routes};

/// 组装网关路由：两个网关端点挂在配置的基础路径下，
/// 外层套错误日志中间件
pub fn create_router(state: AppState) -> Router {
    let gateway_routes = Router::new()
        .route("/data", post(routes::data::aggregate))
        .route("/exchange-balance", post(routes::exchange::exchange_balance));

    let router = Router::new()
        .nest(&state.config.api_base_uri.clone(), gateway_routes)
        .layer(axum::middleware::from_fn(log_errors));

    // 开发模式放开 CORS，生产由反向代理处理
    #[cfg(debug_assertions)]
    let router = router.layer(tower_http::cors::CorsLayer::permissive());

    router.with_state(state)
}
