use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical supplier order. `(external_order_id, supplier_name)` identifies
/// an order within one user's account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedOrder {
    pub external_order_id: String,
    pub supplier_name: String,
    /// Supplier status string, lowercased.
    pub status: String,
    pub currency: String,
    pub total_amount: Decimal,
    pub tracking_number: Option<String>,
    pub line_items: Vec<OrderLineItem>,
    pub placed_at: Option<DateTime<Utc>>,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// A persisted order row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub order: NormalizedOrder,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
