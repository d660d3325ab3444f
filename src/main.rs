use std::net::{IpAddr, SocketAddr};

use gateway::{AppState, config::Config, router::create_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    if config.shared_coingecko_api_key.is_some() {
        tracing::info!("共享 CoinGecko Key 已配置，无 Key 请求将走共享分支");
    } else {
        tracing::warn!("未配置共享 CoinGecko Key，需要 Key 的端点只接受 BYOK 请求");
    }
    match &config.redis_url {
        Some(_) => tracing::info!("缓存与限流使用 Redis 存储"),
        None => tracing::info!("缓存与限流使用进程内存储（单实例模式）"),
    }

    // 设置应用状态（HTTP 客户端 + 缓存/限流存储）
    let state = AppState::new(config).expect("Failed to build application state");

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("server_host 无效，回退到双栈默认地址");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );

    let app = create_router(state);

    // 启动服务器
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
