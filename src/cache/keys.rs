use serde_json::{Map, Value};

/// 生成响应缓存键：`endpoint:k1=v1&k2=v2`
/// 参数先剔除 null，再按键名字典序排序，数组值用逗号拼接，
/// 因此语义相同但参数顺序不同的请求会命中同一个缓存槽
pub fn build_cache_key(endpoint: &str, params: &Map<String, Value>) -> String {
    let mut pairs: Vec<(&String, String)> = params
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k, render_value(v)))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let query = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}:{}", endpoint, query)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn key_is_invariant_under_param_reordering() {
        let a = build_cache_key("markets", &params(json!({"b": 2, "a": 1})));
        let b = build_cache_key("markets", &params(json!({"a": 1, "b": 2})));
        assert_eq!(a, b);
        assert_eq!(a, "markets:a=1&b=2");
    }

    #[test]
    fn null_params_are_dropped() {
        let key = build_cache_key("coin", &params(json!({"coinId": "bitcoin", "days": null})));
        assert_eq!(key, "coin:coinId=bitcoin");
    }

    #[test]
    fn array_values_join_with_comma() {
        let key = build_cache_key("markets", &params(json!({"ids": ["btc", "eth"]})));
        assert_eq!(key, "markets:ids=btc,eth");
    }
}
