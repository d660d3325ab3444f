use crate::config::Config;

/// 调用方自带 Key 的最小可信长度，短于此按未提供处理
const MIN_USER_KEY_LEN: usize = 16;

/// Demo Key 的结构特征：固定前缀 + 最小长度。
/// Key 档位只看字符串本身的形状，不查任何外部注册表
const DEMO_KEY_PREFIX: &str = "CG-";
const MIN_DEMO_KEY_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTier {
    Pro,
    Demo,
}

/// 一次请求内生效的上游凭证；不落盘，不跨请求保留
#[derive(Debug, Clone)]
pub struct ResolvedKey {
    pub key: String,
    pub tier: KeyTier,
    /// true 表示走共享 Key 分支：允许缓存、套用低档限流
    pub shared: bool,
}

impl ResolvedKey {
    /// 档位决定上游域名
    pub fn base_url<'a>(&self, config: &'a Config) -> &'a str {
        match self.tier {
            KeyTier::Demo => &config.coingecko_demo_url,
            KeyTier::Pro => &config.coingecko_pro_url,
        }
    }

    /// 档位决定鉴权头的名字
    pub fn header_name(&self) -> &'static str {
        match self.tier {
            KeyTier::Demo => "x-cg-demo-api-key",
            KeyTier::Pro => "x-cg-pro-api-key",
        }
    }
}

pub fn classify_tier(key: &str) -> KeyTier {
    if key.starts_with(DEMO_KEY_PREFIX) && key.len() >= MIN_DEMO_KEY_LEN {
        KeyTier::Demo
    } else {
        KeyTier::Pro
    }
}

/// 决定本次请求用哪个 Key：
/// 调用方 Key 足够长则走 BYOK 分支（不缓存、高档限流），
/// 否则落到服务端共享 Key；两者都没有时返回 None
pub fn resolve_provider_key(
    user_key: Option<&str>,
    shared_key: Option<&str>,
) -> Option<ResolvedKey> {
    if let Some(key) = user_key.map(str::trim).filter(|k| k.len() >= MIN_USER_KEY_LEN) {
        return Some(ResolvedKey {
            key: key.to_string(),
            tier: classify_tier(key),
            shared: false,
        });
    }

    shared_key.map(|key| ResolvedKey {
        key: key.to_string(),
        tier: classify_tier(key),
        shared: true,
    })
}
