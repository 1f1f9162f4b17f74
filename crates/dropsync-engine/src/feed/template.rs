//! `{{field}}` substitution for feed titles and descriptions.

use std::sync::LazyLock;

use dropsync_core::NormalizedProduct;
use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").expect("valid regex")
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Value of one placeholder. Unknown fields render as an empty string;
/// `attributes.<key>` reads the product's open attribute map.
fn field_value(product: &NormalizedProduct, field: &str) -> String {
    match field {
        "title" => product.title.clone(),
        "description" => product.description.clone(),
        "brand" => product.brand.clone().unwrap_or_default(),
        "category" => product.category.clone(),
        "sku" => product.sku.clone(),
        "price" => product.price.round_dp(2).to_string(),
        "currency" => product.currency.clone(),
        "supplier" => product.supplier_name.clone(),
        other => other
            .strip_prefix("attributes.")
            .and_then(|key| product.attributes.get(key))
            .map(|value| match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                v => v.to_string(),
            })
            .unwrap_or_default(),
    }
}

/// Renders `template` for `product`, collapses runs of whitespace left by
/// empty fields, and caps the result at `max_chars` characters.
#[must_use]
pub fn render(template: &str, product: &NormalizedProduct, max_chars: usize) -> String {
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        field_value(product, &caps[1])
    });
    let collapsed = WHITESPACE.replace_all(rendered.trim(), " ");
    truncate_chars(&collapsed, max_chars)
}

/// Cuts at a character boundary, then drops trailing whitespace.
#[must_use]
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => value[..byte_idx].trim_end().to_string(),
        None => value.to_string(),
    }
}
