use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;
use serde_json::Value;

use super::Exchange;

/// 所有交易所统一后的余额条目；free 与 locked 至少一个为正
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedBalance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

/// 把交易所原生报文归一成 `{asset, free, locked}` 列表。
/// 同一资产分散在多个账户桶时取和（不是覆盖），
/// 零余额过滤永远放在最后一步，对所有交易所一致
pub fn normalize(exchange: Exchange, raw: &Value) -> Vec<NormalizedBalance> {
    let mut acc: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();

    match exchange {
        // 扁平数组：{balances: [{asset, free, locked}]}
        Exchange::Binance => {
            for item in array_at(raw, &["balances"]) {
                add(
                    &mut acc,
                    item.get("asset"),
                    dec(item.get("free")),
                    dec(item.get("locked")),
                );
            }
        }
        // 货币对象列表：{data: [{balance: {amount, currency}}]}
        Exchange::Coinbase => {
            for item in array_at(raw, &["data"]) {
                let balance = item.get("balance");
                add(
                    &mut acc,
                    balance.and_then(|b| b.get("currency")),
                    dec(balance.and_then(|b| b.get("amount"))),
                    Decimal::ZERO,
                );
            }
        }
        // 资产到数量的映射：{result: {XXBT: "1.5", ...}}
        Exchange::Kraken => {
            if let Some(result) = raw.get("result").and_then(|r| r.as_object()) {
                for (asset, amount) in result {
                    let free = dec(Some(amount));
                    acc.entry(asset.clone())
                        .and_modify(|(f, _)| *f += free)
                        .or_insert((free, Decimal::ZERO));
                }
            }
        }
        // 按账户类型分桶：{data: [{currency, available, holds, type}]}
        Exchange::Kucoin => {
            for item in array_at(raw, &["data"]) {
                add(
                    &mut acc,
                    item.get("currency"),
                    dec(item.get("available")),
                    dec(item.get("holds")),
                );
            }
        }
        // 双层嵌套：{result: {list: [{coin: [{coin, walletBalance, locked}]}]}}
        Exchange::Bybit => {
            for account in array_at(raw, &["result", "list"]) {
                for item in array_at(account, &["coin"]) {
                    add(
                        &mut acc,
                        item.get("coin"),
                        dec(item.get("walletBalance")),
                        dec(item.get("locked")),
                    );
                }
            }
        }
        // 双层嵌套：{data: [{details: [{ccy, availBal, frozenBal}]}]}
        Exchange::Okx => {
            for account in array_at(raw, &["data"]) {
                for item in array_at(account, &["details"]) {
                    add(
                        &mut acc,
                        item.get("ccy"),
                        dec(item.get("availBal")),
                        dec(item.get("frozenBal")),
                    );
                }
            }
        }
    }

    acc.into_iter()
        .filter(|(_, (free, locked))| *free > Decimal::ZERO || *locked > Decimal::ZERO)
        .map(|(asset, (free, locked))| NormalizedBalance { asset, free, locked })
        .collect()
}

fn add(
    acc: &mut BTreeMap<String, (Decimal, Decimal)>,
    asset: Option<&Value>,
    free: Decimal,
    locked: Decimal,
) {
    let Some(asset) = asset.and_then(|a| a.as_str()).filter(|a| !a.is_empty()) else {
        return;
    };
    acc.entry(asset.to_string())
        .and_modify(|(f, l)| {
            *f += free;
            *l += locked;
        })
        .or_insert((free, locked));
}

/// 沿路径取数组，任一层缺失返回空切片
fn array_at<'a>(value: &'a Value, path: &[&str]) -> &'a [Value] {
    let mut current = value;
    for segment in path {
        match current.get(segment) {
            Some(next) => current = next,
            None => return &[],
        }
    }
    current.as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// 交易所的数量字段既可能是字符串也可能是数字
fn dec(value: Option<&Value>) -> Decimal {
    match value {
        Some(Value::String(s)) => Decimal::from_str(s.trim()).unwrap_or(Decimal::ZERO),
        Some(Value::Number(n)) => n
            .as_f64()
            .and_then(Decimal::from_f64)
            .unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn zero_balances_are_dropped() {
        let raw = json!({"balances": [
            {"asset": "BTC", "free": "0.5", "locked": "0"},
            {"asset": "DUST", "free": "0", "locked": "0"},
        ]});
        let out = normalize(Exchange::Binance, &raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].asset, "BTC");
        assert_eq!(out[0].free, d("0.5"));
    }

    #[test]
    fn kucoin_buckets_for_the_same_asset_are_summed() {
        let raw = json!({"data": [
            {"currency": "USDT", "available": "1.5", "holds": "0", "type": "main"},
            {"currency": "USDT", "available": "2.5", "holds": "0.1", "type": "trade"},
        ]});
        let out = normalize(Exchange::Kucoin, &raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].free, d("4.0"));
        assert_eq!(out[0].locked, d("0.1"));
    }

    #[test]
    fn kraken_map_shape_is_flattened() {
        let raw = json!({"error": [], "result": {"XXBT": "1.25", "ZUSD": "0"}});
        let out = normalize(Exchange::Kraken, &raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].asset, "XXBT");
        assert_eq!(out[0].free, d("1.25"));
        assert_eq!(out[0].locked, Decimal::ZERO);
    }

    #[test]
    fn bybit_nested_coin_lists_are_walked() {
        let raw = json!({"result": {"list": [
            {"coin": [
                {"coin": "ETH", "walletBalance": "2", "locked": "0.5"},
                {"coin": "OP", "walletBalance": "0", "locked": "0"},
            ]},
        ]}});
        let out = normalize(Exchange::Bybit, &raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].asset, "ETH");
        assert_eq!(out[0].locked, d("0.5"));
    }

    #[test]
    fn okx_details_are_walked_per_account() {
        let raw = json!({"code": "0", "data": [
            {"details": [{"ccy": "SOL", "availBal": "3", "frozenBal": "1"}]},
            {"details": [{"ccy": "SOL", "availBal": "2", "frozenBal": "0"}]},
        ]});
        let out = normalize(Exchange::Okx, &raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].free, d("5"));
        assert_eq!(out[0].locked, d("1"));
    }

    #[test]
    fn coinbase_amounts_have_no_locked_bucket() {
        let raw = json!({"data": [
            {"balance": {"amount": "10.5", "currency": "USDC"}},
            {"balance": {"amount": "0", "currency": "BTC"}},
        ]});
        let out = normalize(Exchange::Coinbase, &raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].asset, "USDC");
        assert_eq!(out[0].locked, Decimal::ZERO);
    }

    #[test]
    fn malformed_payload_yields_empty_list() {
        assert!(normalize(Exchange::Binance, &json!({"weird": true})).is_empty());
        assert!(normalize(Exchange::Bybit, &Value::Null).is_empty());
    }
}
