use std::collections::BTreeMap;

use dropsync_core::{ConnectorType, NormalizedProduct};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use super::{category_or_default, fallback_sku, first_non_blank, non_blank, put_attr, NormalizeError};
use crate::loose::{decimal_of, string_of, u32_of, url_list_of};
use crate::types::{BigBuyProduct, CjProduct, MatterhornProduct, RawSupplierRecord, ShopifyProduct};

pub(super) const GENERIC_ID_KEYS: &[&str] = &["externalId", "external_id", "id"];
const GENERIC_SKU_KEYS: &[&str] = &["sku", "SKU", "productSku"];
const GENERIC_TITLE_KEYS: &[&str] = &["title", "name", "productName"];
const GENERIC_DESCRIPTION_KEYS: &[&str] = &["description", "body", "body_html"];
const GENERIC_PRICE_KEYS: &[&str] = &["price", "retailPrice", "sale_price", "salePrice"];
const GENERIC_COST_KEYS: &[&str] = &["costPrice", "cost_price", "wholesalePrice", "cost"];
const GENERIC_STOCK_KEYS: &[&str] = &["stockQuantity", "stock_quantity", "stock", "quantity", "inventory"];
const GENERIC_CATEGORY_KEYS: &[&str] = &["category", "category_name", "categoryName"];
const GENERIC_BRAND_KEYS: &[&str] = &["brand", "vendor", "manufacturer"];
const GENERIC_IMAGE_KEYS: &[&str] = &["imageUrls", "image_urls", "images", "image"];
const GENERIC_CURRENCY_KEYS: &[&str] = &["currency"];

/// Maps one raw product record into the canonical shape.
///
/// # Errors
///
/// [`NormalizeError::MissingExternalId`] when the record has no usable id,
/// [`NormalizeError::Malformed`] for [`RawSupplierRecord::Unparseable`], and
/// [`NormalizeError::WrongKind`] for order records.
pub fn normalize_product(
    raw: &RawSupplierRecord,
    supplier_name: &str,
) -> Result<NormalizedProduct, NormalizeError> {
    match raw {
        RawSupplierRecord::Shopify(p) => shopify(p, supplier_name),
        RawSupplierRecord::BigBuy(p) => bigbuy(p, supplier_name),
        RawSupplierRecord::Cj(p) => cj(p, supplier_name),
        RawSupplierRecord::Matterhorn(p) => matterhorn(p, supplier_name),
        RawSupplierRecord::Generic(map) => generic(map, supplier_name),
        RawSupplierRecord::CjOrder(_) => Err(NormalizeError::WrongKind {
            expected: "product",
            got: "order",
        }),
        RawSupplierRecord::Unparseable { hint, reason } => Err(NormalizeError::Malformed {
            hint: hint.clone(),
            reason: reason.clone(),
        }),
    }
}

/// Skeleton with every default applied; callers overwrite what they know.
fn base_product(
    connector: ConnectorType,
    external_id: String,
    sku: Option<String>,
    supplier_name: &str,
) -> NormalizedProduct {
    let sku = sku.unwrap_or_else(|| fallback_sku(connector, &external_id));
    NormalizedProduct {
        title: external_id.clone(),
        external_id,
        sku,
        description: String::new(),
        price: Decimal::ZERO,
        cost_price: None,
        currency: connector.info().default_currency.to_owned(),
        stock_quantity: 0,
        category: category_or_default(None),
        brand: None,
        image_urls: Vec::new(),
        attributes: BTreeMap::new(),
        supplier_name: supplier_name.to_owned(),
    }
}

fn require_id(
    connector: ConnectorType,
    candidates: &[Option<&str>],
) -> Result<String, NormalizeError> {
    first_non_blank(candidates.iter().copied())
        .ok_or(NormalizeError::MissingExternalId { connector })
}

fn shopify(p: &ShopifyProduct, supplier_name: &str) -> Result<NormalizedProduct, NormalizeError> {
    let connector = ConnectorType::Shopify;
    let external_id = require_id(connector, &[p.id.as_deref()])?;
    let first = p.variants.first();
    let sku = first.and_then(|v| non_blank(v.sku.as_deref()));

    let mut product = base_product(connector, external_id, sku, supplier_name);
    if let Some(title) = non_blank(p.title.as_deref()) {
        product.title = title;
    }
    product.description = p.body_html.clone().unwrap_or_default();
    product.price = first.and_then(|v| v.price).unwrap_or(Decimal::ZERO);
    product.stock_quantity = p
        .variants
        .iter()
        .filter_map(|v| v.inventory_quantity)
        .fold(0u32, u32::saturating_add);
    product.category = category_or_default(non_blank(p.product_type.as_deref()));
    product.brand = non_blank(p.vendor.as_deref());
    product.image_urls.clone_from(&p.images);

    put_attr(&mut product.attributes, "handle", p.handle.clone());
    put_attr(&mut product.attributes, "tags", p.tags.clone());
    put_attr(
        &mut product.attributes,
        "compareAtPrice",
        first
            .and_then(|v| v.compare_at_price)
            .map(|d| Value::String(d.to_string())),
    );
    put_attr(
        &mut product.attributes,
        "available",
        Value::Bool(p.variants.iter().any(|v| v.available.unwrap_or(false))),
    );
    if p.variants.len() > 1 {
        put_attr(&mut product.attributes, "variantCount", p.variants.len());
    }
    Ok(product)
}

fn bigbuy(p: &BigBuyProduct, supplier_name: &str) -> Result<NormalizedProduct, NormalizeError> {
    let connector = ConnectorType::BigBuy;
    let external_id = require_id(connector, &[p.id.as_deref()])?;

    let mut product = base_product(
        connector,
        external_id,
        non_blank(p.sku.as_deref()),
        supplier_name,
    );
    if let Some(name) = non_blank(p.name.as_deref()) {
        product.title = name;
    }
    product.description = p.description.clone().unwrap_or_default();
    product.price = p
        .retail_price
        .or(p.wholesale_price)
        .unwrap_or(Decimal::ZERO);
    product.cost_price = p.wholesale_price;
    product.stock_quantity = p.stock.unwrap_or(0);
    product.category = category_or_default(non_blank(p.category.as_deref()));
    product.brand = non_blank(p.brand.as_deref());
    product.image_urls.clone_from(&p.images);

    put_attr(&mut product.attributes, "ean13", p.ean13.clone());
    put_attr(
        &mut product.attributes,
        "weight",
        p.weight.map(|w| Value::String(w.to_string())),
    );
    put_attr(&mut product.attributes, "dimensions", p.dimensions.clone());
    put_attr(&mut product.attributes, "active", p.active.clone());
    Ok(product)
}

fn cj(p: &CjProduct, supplier_name: &str) -> Result<NormalizedProduct, NormalizeError> {
    let connector = ConnectorType::CjDropshipping;
    let external_id = require_id(connector, &[p.id.as_deref(), p.pid.as_deref()])?;
    let sku = first_non_blank([p.sku.as_deref(), p.product_sku.as_deref()]);

    let mut product = base_product(connector, external_id, sku, supplier_name);
    if let Some(name) = first_non_blank([p.name_en.as_deref(), p.product_name_en.as_deref()]) {
        product.title = name;
    }
    product.description = p.description.clone().unwrap_or_default();
    product.price = p.sell_price.or(p.now_price).unwrap_or(Decimal::ZERO);
    product.cost_price = p.now_price.or(p.discount_price);
    if let Some(currency) = non_blank(p.currency.as_deref()) {
        product.currency = currency.to_ascii_uppercase();
    }
    product.stock_quantity = p
        .warehouse_inventory_num
        .or(p.total_verified_inventory)
        .unwrap_or(0);
    product.category = category_or_default(first_non_blank([
        p.three_category_name.as_deref(),
        p.category_name.as_deref(),
        p.two_category_name.as_deref(),
        p.one_category_name.as_deref(),
    ]));
    product.image_urls = non_blank(p.big_image.as_deref()).into_iter().collect();

    put_attr(&mut product.attributes, "categoryId", p.category_id.clone());
    put_attr(&mut product.attributes, "productType", p.product_type.clone());
    put_attr(&mut product.attributes, "upstreamSupplier", p.supplier_name.clone());
    put_attr(&mut product.attributes, "listedNum", p.listed_num);
    Ok(product)
}

fn matterhorn(
    p: &MatterhornProduct,
    supplier_name: &str,
) -> Result<NormalizedProduct, NormalizeError> {
    let connector = ConnectorType::Matterhorn;
    let external_id = require_id(connector, &[p.id.as_deref()])?;

    // Matterhorn item numbers are not SKUs; always derive.
    let mut product = base_product(connector, external_id, None, supplier_name);
    if let Some(name) = first_non_blank([p.name_without_number.as_deref(), p.name.as_deref()]) {
        product.title = name;
    }
    product.description = p.description.clone().unwrap_or_default();

    let default_currency = connector.info().default_currency;
    if let Some(price) = p.prices.get(default_currency).and_then(decimal_of) {
        product.price = price;
    } else if let Some((code, price)) = p
        .prices
        .iter()
        .find_map(|(code, v)| decimal_of(v).map(|d| (code, d)))
    {
        product.price = price;
        product.currency = code.to_ascii_uppercase();
    }
    product.stock_quantity = p.stock_total.unwrap_or(0);
    product.category = category_or_default(non_blank(p.category_name.as_deref()));
    product.brand = non_blank(p.brand.as_deref());
    product.image_urls.clone_from(&p.images);

    put_attr(&mut product.attributes, "categoryPath", p.category_path.clone());
    put_attr(&mut product.attributes, "color", p.color.clone());
    put_attr(&mut product.attributes, "newCollection", p.new_collection.clone());
    put_attr(&mut product.attributes, "variants", p.variants.clone());
    if p.name.as_deref() != p.name_without_number.as_deref() {
        put_attr(&mut product.attributes, "fullName", p.name.clone());
    }
    Ok(product)
}

/// First key in `keys` holding a value `read` accepts.
fn pick<T>(map: &Map<String, Value>, keys: &[&str], read: impl Fn(&Value) -> Option<T>) -> Option<T> {
    keys.iter().find_map(|k| map.get(*k).and_then(&read))
}

fn generic(
    map: &Map<String, Value>,
    supplier_name: &str,
) -> Result<NormalizedProduct, NormalizeError> {
    let connector = ConnectorType::GenericJson;
    let external_id = pick(map, GENERIC_ID_KEYS, string_of)
        .ok_or(NormalizeError::MissingExternalId { connector })?;
    let sku = pick(map, GENERIC_SKU_KEYS, string_of);

    let mut product = base_product(connector, external_id, sku, supplier_name);
    if let Some(title) = pick(map, GENERIC_TITLE_KEYS, string_of) {
        product.title = title;
    }
    product.description = pick(map, GENERIC_DESCRIPTION_KEYS, string_of).unwrap_or_default();
    product.price = pick(map, GENERIC_PRICE_KEYS, decimal_of).unwrap_or(Decimal::ZERO);
    product.cost_price = pick(map, GENERIC_COST_KEYS, decimal_of);
    if let Some(currency) = pick(map, GENERIC_CURRENCY_KEYS, string_of) {
        product.currency = currency.to_ascii_uppercase();
    }
    product.stock_quantity = pick(map, GENERIC_STOCK_KEYS, u32_of).unwrap_or(0);
    product.category = category_or_default(pick(map, GENERIC_CATEGORY_KEYS, string_of));
    product.brand = pick(map, GENERIC_BRAND_KEYS, string_of);
    product.image_urls = pick(map, GENERIC_IMAGE_KEYS, |v| {
        let urls = url_list_of(v);
        (!urls.is_empty()).then_some(urls)
    })
    .unwrap_or_default();

    let consumed: Vec<&str> = [
        GENERIC_ID_KEYS,
        GENERIC_SKU_KEYS,
        GENERIC_TITLE_KEYS,
        GENERIC_DESCRIPTION_KEYS,
        GENERIC_PRICE_KEYS,
        GENERIC_COST_KEYS,
        GENERIC_STOCK_KEYS,
        GENERIC_CATEGORY_KEYS,
        GENERIC_BRAND_KEYS,
        GENERIC_IMAGE_KEYS,
        GENERIC_CURRENCY_KEYS,
    ]
    .concat();
    for (key, value) in map {
        if !consumed.contains(&key.as_str()) {
            put_attr(&mut product.attributes, key, value.clone());
        }
    }
    Ok(product)
}
