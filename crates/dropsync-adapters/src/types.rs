//! Supplier-native record shapes.
//!
//! Every field is optional and read leniently; structural surprises inside a
//! single record surface as [`RawSupplierRecord::Unparseable`] rather than
//! failing the page.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::loose;

/// A product or order exactly as a supplier returned it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSupplierRecord {
    Shopify(ShopifyProduct),
    BigBuy(BigBuyProduct),
    Cj(CjProduct),
    Matterhorn(MatterhornProduct),
    Generic(Map<String, Value>),
    CjOrder(CjOrder),
    /// The record did not have the expected structure at all.
    Unparseable {
        /// Best-effort id lifted from the payload, for error messages.
        hint: Option<String>,
        reason: String,
    },
}

impl RawSupplierRecord {
    /// Parses `value` into `T`, falling back to [`RawSupplierRecord::Unparseable`].
    pub(crate) fn parse<T, F>(value: Value, wrap: F) -> Self
    where
        T: DeserializeOwned,
        F: FnOnce(T) -> Self,
    {
        let hint = value
            .get("id")
            .or_else(|| value.get("orderId"))
            .and_then(loose::string_of);
        if !value.is_object() {
            return RawSupplierRecord::Unparseable {
                hint,
                reason: format!("expected a JSON object, got {}", json_kind(&value)),
            };
        }
        match serde_json::from_value::<T>(value) {
            Ok(parsed) => wrap(parsed),
            Err(e) => RawSupplierRecord::Unparseable {
                hint,
                reason: e.to_string(),
            },
        }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Shopify storefront `products.json`
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShopifyProduct {
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub handle: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub body_html: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub product_type: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub vendor: Option<String>,
    #[serde(default, deserialize_with = "loose::tag_list")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "loose::url_list")]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<ShopifyVariant>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShopifyVariant {
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "loose::opt_decimal")]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub available: Option<bool>,
    /// Only present on authenticated (Admin API) responses.
    #[serde(default, deserialize_with = "loose::opt_u32")]
    pub inventory_quantity: Option<u32>,
}

// ---------------------------------------------------------------------------
// BigBuy `rest/catalog/products.json`
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BigBuyProduct {
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_decimal")]
    pub retail_price: Option<Decimal>,
    #[serde(default, deserialize_with = "loose::opt_decimal")]
    pub wholesale_price: Option<Decimal>,
    #[serde(default, deserialize_with = "loose::opt_u32")]
    pub stock: Option<u32>,
    #[serde(default, deserialize_with = "loose::url_list")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_decimal")]
    pub weight: Option<Decimal>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub ean13: Option<String>,
    #[serde(default)]
    pub dimensions: Option<Value>,
    #[serde(default)]
    pub active: Option<Value>,
}

// ---------------------------------------------------------------------------
// CJ Dropshipping `product/listV2` and `shopping/order/list`
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CjProduct {
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub pid: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub product_sku: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub name_en: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub product_name_en: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_decimal")]
    pub sell_price: Option<Decimal>,
    #[serde(default, deserialize_with = "loose::opt_decimal")]
    pub now_price: Option<Decimal>,
    #[serde(default, deserialize_with = "loose::opt_decimal")]
    pub discount_price: Option<Decimal>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_u32")]
    pub warehouse_inventory_num: Option<u32>,
    #[serde(default, deserialize_with = "loose::opt_u32")]
    pub total_verified_inventory: Option<u32>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub big_image: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub category_name: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub one_category_name: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub two_category_name: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub three_category_name: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub product_type: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub supplier_name: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_u32")]
    pub listed_num: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CjOrder {
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub order_num: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub order_status: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_decimal")]
    pub order_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub track_number: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub logistic_name: Option<String>,
    /// `yyyy-MM-dd HH:mm:ss`, UTC.
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub create_date: Option<String>,
    #[serde(default)]
    pub product_list: Vec<CjOrderProduct>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CjOrderProduct {
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub vid: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_u32")]
    pub quantity: Option<u32>,
    #[serde(default, deserialize_with = "loose::opt_decimal")]
    pub sell_price: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Matterhorn `B2BAPI/ITEMS/`
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatterhornProduct {
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub name_without_number: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub description: Option<String>,
    /// Price per currency code, e.g. `{"EUR": "19.99"}`.
    #[serde(default)]
    pub prices: Map<String, Value>,
    #[serde(default, deserialize_with = "loose::opt_u32")]
    pub stock_total: Option<u32>,
    #[serde(default, deserialize_with = "loose::url_list")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub category_name: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub category_path: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    pub color: Option<String>,
    #[serde(default)]
    pub new_collection: Option<Value>,
    #[serde(default)]
    pub variants: Option<Value>,
}
