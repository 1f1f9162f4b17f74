use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use dropsync_core::{ConnectorType, NormalizedOrder, OrderLineItem};
use rust_decimal::Decimal;

use super::{fallback_sku, first_non_blank, non_blank, put_attr, NormalizeError};
use crate::types::{CjOrder, RawSupplierRecord};

const CJ_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Maps one raw order record into the canonical shape.
///
/// # Errors
///
/// [`NormalizeError::MissingExternalId`] when the order has no id,
/// [`NormalizeError::Malformed`] for unparseable records, and
/// [`NormalizeError::WrongKind`] for product records.
pub fn normalize_order(
    raw: &RawSupplierRecord,
    supplier_name: &str,
) -> Result<NormalizedOrder, NormalizeError> {
    match raw {
        RawSupplierRecord::CjOrder(order) => cj_order(order, supplier_name),
        RawSupplierRecord::Unparseable { hint, reason } => Err(NormalizeError::Malformed {
            hint: hint.clone(),
            reason: reason.clone(),
        }),
        other => Err(NormalizeError::WrongKind {
            expected: "order",
            got: other.kind(),
        }),
    }
}

/// CJ dates are `yyyy-MM-dd HH:mm:ss` in UTC; RFC 3339 is accepted too.
fn parse_placed_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, CJ_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
}

fn cj_order(order: &CjOrder, supplier_name: &str) -> Result<NormalizedOrder, NormalizeError> {
    let connector = ConnectorType::CjDropshipping;
    let external_order_id = first_non_blank([order.order_id.as_deref(), order.order_num.as_deref()])
        .ok_or(NormalizeError::MissingExternalId { connector })?;

    let line_items: Vec<OrderLineItem> = order
        .product_list
        .iter()
        .map(|item| OrderLineItem {
            sku: first_non_blank([item.sku.as_deref(), item.vid.as_deref()])
                .unwrap_or_else(|| fallback_sku(connector, &external_order_id)),
            quantity: item.quantity.unwrap_or(1),
            unit_price: item.sell_price.unwrap_or(Decimal::ZERO),
        })
        .collect();

    let total_amount = order.order_amount.unwrap_or_else(|| {
        line_items
            .iter()
            .map(|li| li.unit_price * Decimal::from(li.quantity))
            .sum()
    });

    let mut attributes = BTreeMap::new();
    put_attr(&mut attributes, "orderNum", order.order_num.clone());
    put_attr(&mut attributes, "logisticName", order.logistic_name.clone());

    Ok(NormalizedOrder {
        external_order_id,
        supplier_name: supplier_name.to_owned(),
        status: non_blank(order.order_status.as_deref())
            .map_or_else(|| "unknown".to_owned(), |s| s.to_ascii_lowercase()),
        currency: non_blank(order.currency.as_deref())
            .map_or_else(|| connector.info().default_currency.to_owned(), |c| c.to_ascii_uppercase()),
        total_amount,
        tracking_number: non_blank(order.track_number.as_deref()),
        line_items,
        placed_at: order.create_date.as_deref().and_then(parse_placed_at),
        attributes,
    })
}
