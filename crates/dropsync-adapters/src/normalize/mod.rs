//! Raw supplier records to canonical products and orders.
//!
//! Everything here is pure: no I/O, no clock, no randomness. Missing optional
//! fields fall back to safe defaults (`price = 0`, `stock = 0`, the
//! connector's default currency, [`DEFAULT_CATEGORY`]); a record with no
//! usable external id is rejected instead.

mod orders;
mod products;

use std::collections::BTreeMap;

use dropsync_core::{ConnectorType, DEFAULT_CATEGORY};
use serde_json::Value;
use thiserror::Error;

use crate::types::RawSupplierRecord;

pub use orders::normalize_order;
pub use products::normalize_product;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("{connector} record has no usable external id")]
    MissingExternalId { connector: ConnectorType },

    #[error("malformed supplier record{}: {reason}", hint.as_ref().map(|h| format!(" {h}")).unwrap_or_default())]
    Malformed { hint: Option<String>, reason: String },

    #[error("expected {expected} record, got {got}")]
    WrongKind {
        expected: &'static str,
        got: &'static str,
    },
}

impl RawSupplierRecord {
    /// Connector that produced this record, if it came from a typed adapter.
    #[must_use]
    pub fn connector(&self) -> Option<ConnectorType> {
        match self {
            Self::Shopify(_) => Some(ConnectorType::Shopify),
            Self::BigBuy(_) => Some(ConnectorType::BigBuy),
            Self::Cj(_) | Self::CjOrder(_) => Some(ConnectorType::CjDropshipping),
            Self::Matterhorn(_) => Some(ConnectorType::Matterhorn),
            Self::Generic(_) => Some(ConnectorType::GenericJson),
            Self::Unparseable { .. } => None,
        }
    }

    /// Short label used in logs and error details.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CjOrder(_) => "order",
            Self::Unparseable { .. } => "unparseable",
            _ => "product",
        }
    }

    /// Best-effort identifier for error messages, before normalization.
    #[must_use]
    pub fn id_hint(&self) -> Option<String> {
        match self {
            Self::Shopify(p) => p.id.clone(),
            Self::BigBuy(p) => p.id.clone(),
            Self::Cj(p) => p.id.clone().or_else(|| p.pid.clone()),
            Self::Matterhorn(p) => p.id.clone(),
            Self::Generic(map) => products::GENERIC_ID_KEYS
                .iter()
                .find_map(|k| map.get(*k).and_then(crate::loose::string_of)),
            Self::CjOrder(o) => o.order_id.clone(),
            Self::Unparseable { hint, .. } => hint.clone(),
        }
    }
}

/// Trimmed, non-empty copy of `value`.
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// First non-blank candidate.
fn first_non_blank<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates.into_iter().find_map(non_blank)
}

/// `<PREFIX>-<externalId>`, the SKU used when a supplier sends none.
fn fallback_sku(connector: ConnectorType, external_id: &str) -> String {
    format!("{}-{external_id}", connector.info().sku_prefix)
}

fn category_or_default(category: Option<String>) -> String {
    category.unwrap_or_else(|| DEFAULT_CATEGORY.to_owned())
}

/// Inserts `key` only when `value` carries information.
fn put_attr(attributes: &mut BTreeMap<String, Value>, key: &str, value: impl Into<Value>) {
    let value = value.into();
    let empty = match &value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    };
    if !empty {
        attributes.insert(key.to_owned(), value);
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
