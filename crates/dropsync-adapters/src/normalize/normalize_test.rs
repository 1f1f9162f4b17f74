use rust_decimal::Decimal;
use serde_json::json;

use super::*;
use crate::types::{BigBuyProduct, CjOrder, CjProduct, MatterhornProduct, ShopifyProduct};

fn shopify(value: serde_json::Value) -> RawSupplierRecord {
    RawSupplierRecord::Shopify(serde_json::from_value::<ShopifyProduct>(value).unwrap())
}

fn generic(value: serde_json::Value) -> RawSupplierRecord {
    match value {
        serde_json::Value::Object(map) => RawSupplierRecord::Generic(map),
        other => panic!("expected object, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// Defaults and rejection
// ---------------------------------------------------------------------------

#[test]
fn sparse_record_gets_safe_defaults() {
    let product = normalize_product(&generic(json!({"id": "A1"})), "Acme").unwrap();
    assert_eq!(product.external_id, "A1");
    assert_eq!(product.sku, "SUP-A1");
    assert_eq!(product.price, Decimal::ZERO);
    assert_eq!(product.stock_quantity, 0);
    assert_eq!(product.currency, "USD");
    assert_eq!(product.category, DEFAULT_CATEGORY);
    assert_eq!(product.supplier_name, "Acme");
}

#[test]
fn missing_external_id_is_rejected() {
    let err = normalize_product(&generic(json!({"sku": "S1", "title": "Widget"})), "Acme")
        .unwrap_err();
    assert_eq!(
        err,
        NormalizeError::MissingExternalId {
            connector: ConnectorType::GenericJson
        }
    );
}

#[test]
fn blank_external_id_is_rejected() {
    let err = normalize_product(&generic(json!({"id": "   ", "sku": "S1"})), "Acme").unwrap_err();
    assert!(matches!(err, NormalizeError::MissingExternalId { .. }));
}

#[test]
fn unparseable_record_is_malformed() {
    let raw = RawSupplierRecord::Unparseable {
        hint: Some("77".to_owned()),
        reason: "invalid type".to_owned(),
    };
    let err = normalize_product(&raw, "Acme").unwrap_err();
    assert!(err.to_string().contains("77"));
    assert!(matches!(err, NormalizeError::Malformed { .. }));
}

#[test]
fn normalization_is_deterministic() {
    let raw = generic(json!({"id": 9, "title": "Lamp", "price": "19.90", "color": "red"}));
    assert_eq!(
        normalize_product(&raw, "Acme").unwrap(),
        normalize_product(&raw, "Acme").unwrap()
    );
}

// ---------------------------------------------------------------------------
// Per-supplier mappings
// ---------------------------------------------------------------------------

#[test]
fn shopify_uses_first_variant_and_sums_stock() {
    let raw = shopify(json!({
        "id": 1001,
        "title": "Tee",
        "body_html": "<p>Soft</p>",
        "product_type": "Shirts",
        "vendor": "Acme",
        "handle": "tee",
        "tags": ["summer"],
        "images": [{"src": "https://cdn.example.com/tee.jpg"}],
        "variants": [
            {"sku": "TEE-S", "price": "12.99", "compare_at_price": "15.00", "inventory_quantity": 3, "available": true},
            {"sku": "TEE-M", "price": "13.99", "inventory_quantity": 4}
        ]
    }));
    let product = normalize_product(&raw, "Acme Shopify").unwrap();
    assert_eq!(product.external_id, "1001");
    assert_eq!(product.sku, "TEE-S");
    assert_eq!(product.price, Decimal::new(1299, 2));
    assert_eq!(product.stock_quantity, 7);
    assert_eq!(product.category, "Shirts");
    assert_eq!(product.brand.as_deref(), Some("Acme"));
    assert_eq!(product.image_urls, vec!["https://cdn.example.com/tee.jpg"]);
    assert_eq!(product.attributes["compareAtPrice"], "15.00");
    assert_eq!(product.attributes["variantCount"], 2);
}

#[test]
fn shopify_without_variants_derives_sku() {
    let product = normalize_product(&shopify(json!({"id": 5, "title": "Gift"})), "S").unwrap();
    assert_eq!(product.sku, "SHOPIFY-5");
    assert_eq!(product.price, Decimal::ZERO);
}

#[test]
fn bigbuy_prefers_retail_price_and_keeps_wholesale_as_cost() {
    let raw = RawSupplierRecord::BigBuy(
        serde_json::from_value::<BigBuyProduct>(json!({
            "id": 42,
            "sku": "BB-42",
            "name": "Lamp",
            "retailPrice": 19.9,
            "wholesalePrice": "11,50",
            "stock": "8",
            "ean13": "8400000000000"
        }))
        .unwrap(),
    );
    let product = normalize_product(&raw, "BigBuy").unwrap();
    assert_eq!(product.price, Decimal::new(199, 1));
    assert_eq!(product.cost_price, Some(Decimal::new(1150, 2)));
    assert_eq!(product.stock_quantity, 8);
    assert_eq!(product.currency, "EUR");
    assert_eq!(product.attributes["ean13"], "8400000000000");
}

#[test]
fn cj_falls_back_across_alternate_fields() {
    let raw = RawSupplierRecord::Cj(
        serde_json::from_value::<CjProduct>(json!({
            "pid": "P-123",
            "productNameEn": "Phone Case",
            "nowPrice": "2.10",
            "threeCategoryName": "Cases",
            "categoryName": "Phones",
            "bigImage": "https://cj.example.com/case.jpg",
            "warehouseInventoryNum": 120
        }))
        .unwrap(),
    );
    let product = normalize_product(&raw, "CJ").unwrap();
    assert_eq!(product.external_id, "P-123");
    assert_eq!(product.sku, "CJ-P-123");
    assert_eq!(product.title, "Phone Case");
    assert_eq!(product.price, Decimal::new(210, 2));
    assert_eq!(product.cost_price, Some(Decimal::new(210, 2)));
    assert_eq!(product.category, "Cases");
    assert_eq!(product.stock_quantity, 120);
    assert_eq!(product.image_urls.len(), 1);
}

#[test]
fn matterhorn_reads_eur_price_and_derives_sku() {
    let raw = RawSupplierRecord::Matterhorn(
        serde_json::from_value::<MatterhornProduct>(json!({
            "id": 77,
            "name": "Dress 77",
            "name_without_number": "Dress",
            "prices": {"PLN": "99.00", "EUR": "22.50"},
            "stock_total": 4,
            "category_name": "Dresses"
        }))
        .unwrap(),
    );
    let product = normalize_product(&raw, "Matterhorn").unwrap();
    assert_eq!(product.sku, "MATTERHORN-77");
    assert_eq!(product.title, "Dress");
    assert_eq!(product.price, Decimal::new(2250, 2));
    assert_eq!(product.currency, "EUR");
    assert_eq!(product.attributes["fullName"], "Dress 77");
}

#[test]
fn matterhorn_without_eur_uses_first_priced_currency() {
    let raw = RawSupplierRecord::Matterhorn(
        serde_json::from_value::<MatterhornProduct>(json!({"id": 1, "prices": {"PLN": "99.00"}}))
            .unwrap(),
    );
    let product = normalize_product(&raw, "Matterhorn").unwrap();
    assert_eq!(product.currency, "PLN");
    assert_eq!(product.price, Decimal::new(9900, 2));
}

#[test]
fn generic_keeps_unknown_keys_as_attributes() {
    let raw = generic(json!({
        "externalId": "A1",
        "sku": "S1",
        "title": "Widget",
        "price": 10,
        "currency": "gbp",
        "images": "https://a.example.com/1.jpg;https://a.example.com/2.jpg",
        "material": "steel",
        "warranty": null
    }));
    let product = normalize_product(&raw, "Acme").unwrap();
    assert_eq!(product.currency, "GBP");
    assert_eq!(product.image_urls.len(), 2);
    assert_eq!(product.attributes.get("material"), Some(&json!("steel")));
    assert!(!product.attributes.contains_key("warranty"));
    assert!(!product.attributes.contains_key("price"));
}

#[test]
fn order_record_is_not_a_product() {
    let raw = RawSupplierRecord::CjOrder(
        serde_json::from_value::<CjOrder>(json!({"orderId": "O1"})).unwrap(),
    );
    assert!(matches!(
        normalize_product(&raw, "CJ"),
        Err(NormalizeError::WrongKind { .. })
    ));
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[test]
fn cj_order_normalizes_line_items_and_date() {
    let raw = RawSupplierRecord::CjOrder(
        serde_json::from_value::<CjOrder>(json!({
            "orderId": "O-9",
            "orderNum": "N-9",
            "orderStatus": "SHIPPED",
            "trackNumber": "TRK1",
            "createDate": "2024-03-01 10:20:30",
            "productList": [
                {"sku": "CJ-1", "quantity": 2, "sellPrice": "3.50"},
                {"vid": "V-2", "quantity": "1", "sellPrice": 1}
            ]
        }))
        .unwrap(),
    );
    let order = normalize_order(&raw, "CJ").unwrap();
    assert_eq!(order.external_order_id, "O-9");
    assert_eq!(order.status, "shipped");
    assert_eq!(order.currency, "USD");
    assert_eq!(order.total_amount, Decimal::new(800, 2));
    assert_eq!(order.line_items[1].sku, "V-2");
    assert_eq!(order.tracking_number.as_deref(), Some("TRK1"));
    assert_eq!(
        order.placed_at.map(|d| d.to_rfc3339()),
        Some("2024-03-01T10:20:30+00:00".to_owned())
    );
}

#[test]
fn order_without_id_is_rejected() {
    let raw = RawSupplierRecord::CjOrder(
        serde_json::from_value::<CjOrder>(json!({"orderStatus": "CREATED"})).unwrap(),
    );
    assert!(matches!(
        normalize_order(&raw, "CJ"),
        Err(NormalizeError::MissingExternalId { .. })
    ));
}

#[test]
fn product_record_is_not_an_order() {
    assert!(matches!(
        normalize_order(&generic(json!({"id": 1})), "Acme"),
        Err(NormalizeError::WrongKind { got: "product", .. })
    ));
}
