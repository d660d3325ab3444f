use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// 网关错误分类：校验 / 鉴权 / 限流 / 上游失败 / 超时
#[derive(Debug, Clone)]
pub enum GatewayError {
    Validation(String),
    Auth(String),
    RateLimited { retry_after_secs: u64 },
    Upstream(String),
    Timeout(String),
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: i32,
    pub error: String,
}

impl GatewayError {
    /// 面向调用方的错误文案；上游透传的消息原样保留
    pub fn message(&self) -> String {
        match self {
            GatewayError::Validation(msg) => msg.clone(),
            GatewayError::Auth(msg) => msg.clone(),
            GatewayError::RateLimited { retry_after_secs } => {
                format!("请求过于频繁，请在{}秒后重试", retry_after_secs)
            }
            GatewayError::Upstream(msg) => msg.clone(),
            GatewayError::Timeout(msg) => msg.clone(),
            GatewayError::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        use crate::utils::error_codes;

        let (status, code) = match &self {
            GatewayError::Validation(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            // 凭证类错误发生在本地校验阶段，对外同样是 400，但错误码区分
            GatewayError::Auth(_) => (StatusCode::BAD_REQUEST, error_codes::AUTH_FAILED),
            GatewayError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, error_codes::RATE_LIMIT)
            }
            // 超时与上游失败在文案上区分，在状态码上统一为 502
            GatewayError::Upstream(_) | GatewayError::Timeout(_) => {
                (StatusCode::BAD_GATEWAY, error_codes::UPSTREAM_ERROR)
            }
            GatewayError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR)
            }
        };

        let body = Json(ErrorBody {
            code,
            error: self.message(),
        });

        (status, body).into_response()
    }
}
