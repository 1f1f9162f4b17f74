//! Lenient field readers for supplier payloads.
//!
//! Supplier APIs are inconsistent about types (ids as numbers or strings,
//! prices as `"12.50"` or `12.5`, stock as `"7"`). These helpers never fail:
//! an unreadable value becomes `None` and the normalizer applies its default.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Non-blank string form of a scalar value.
#[must_use]
pub fn string_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[must_use]
pub fn decimal_of(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().replace(',', "."),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Non-negative integer; negative or fractional stock is floored to a
/// valid count.
#[must_use]
pub fn u32_of(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                return Some(u32::try_from(v).unwrap_or(u32::MAX));
            }
            if n.as_i64().is_some() {
                return Some(0);
            }
            n.as_f64().map(f64_to_count)
        }
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<u64>()
                .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(f64_to_count))
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn f64_to_count(v: f64) -> u32 {
    if v.is_finite() && v > 0.0 {
        v.floor().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Image-like lists: `["a", "b"]`, `[{"url": "a"}, {"src": "b"}]`, or a
/// single delimited string `"a;b"`.
#[must_use]
pub fn url_list_of(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(map) => ["url", "src", "imageUrl", "image"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(string_of)),
                other => string_of(other),
            })
            .collect(),
        Value::String(s) => s
            .split([';', ',', '|'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// Tag-like lists: a JSON array of strings or one comma-separated string.
#[must_use]
pub fn tag_list_of(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(string_of).collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(string_of))
}

pub(crate) fn opt_decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(decimal_of))
}

pub(crate) fn opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(u32_of))
}

pub(crate) fn url_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?
        .as_ref()
        .map(url_list_of)
        .unwrap_or_default())
}

pub(crate) fn tag_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?
        .as_ref()
        .map(tag_list_of)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn string_of_accepts_numbers_and_trims() {
        assert_eq!(string_of(&json!(123)).as_deref(), Some("123"));
        assert_eq!(string_of(&json!("  abc ")).as_deref(), Some("abc"));
        assert_eq!(string_of(&json!("   ")), None);
        assert_eq!(string_of(&json!(null)), None);
        assert_eq!(string_of(&json!({"id": 1})), None);
    }

    #[test]
    fn decimal_of_handles_strings_numbers_and_commas() {
        assert_eq!(decimal_of(&json!("12.50")), Some(Decimal::new(1250, 2)));
        assert_eq!(decimal_of(&json!(12.5)), Some(Decimal::new(125, 1)));
        assert_eq!(decimal_of(&json!("9,99")), Some(Decimal::new(999, 2)));
        assert_eq!(decimal_of(&json!("n/a")), None);
    }

    #[test]
    fn u32_of_clamps_negative_and_fractional_stock() {
        assert_eq!(u32_of(&json!(7)), Some(7));
        assert_eq!(u32_of(&json!("7")), Some(7));
        assert_eq!(u32_of(&json!(-3)), Some(0));
        assert_eq!(u32_of(&json!(4.9)), Some(4));
        assert_eq!(u32_of(&json!("lots")), None);
    }

    #[test]
    fn url_list_of_accepts_mixed_shapes() {
        assert_eq!(
            url_list_of(&json!(["a", {"url": "b"}, {"src": "c"}, 5])),
            vec!["a", "b", "c", "5"]
        );
        assert_eq!(url_list_of(&json!("a; b")), vec!["a", "b"]);
        assert!(url_list_of(&json!(null)).is_empty());
    }

    #[test]
    fn tag_list_of_splits_comma_strings() {
        assert_eq!(tag_list_of(&json!("red, blue,")), vec!["red", "blue"]);
        assert_eq!(tag_list_of(&json!(["x", "y"])), vec!["x", "y"]);
    }
}
