use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category assigned when a supplier record carries none.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Canonical product shape every supplier record is normalized into.
///
/// `(external_id, supplier_name)` identifies a catalog row within one user's
/// catalog. `sku` is advisory and may collide across suppliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedProduct {
    /// Supplier-assigned identifier, stable across syncs.
    pub external_id: String,
    pub sku: String,
    pub title: String,
    pub description: String,
    /// Selling price in `currency`.
    pub price: Decimal,
    pub cost_price: Option<Decimal>,
    /// ISO 4217 code.
    pub currency: String,
    pub stock_quantity: u32,
    pub category: String,
    pub brand: Option<String>,
    /// Ordered; the first entry is the primary image.
    pub image_urls: Vec<String>,
    /// Supplier-specific extras with no canonical field.
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub supplier_name: String,
}

impl NormalizedProduct {
    #[must_use]
    pub fn key(&self) -> CatalogKey {
        CatalogKey {
            supplier_name: self.supplier_name.clone(),
            external_id: self.external_id.clone(),
        }
    }
}

/// Identity of a catalog row inside one user's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CatalogKey {
    pub supplier_name: String,
    pub external_id: String,
}

impl std::fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.supplier_name, self.external_id)
    }
}

/// A persisted catalog row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub product: NormalizedProduct,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
