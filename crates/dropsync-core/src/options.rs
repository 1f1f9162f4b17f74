use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::products::NormalizedProduct;

/// Pagination and scoping options handed to an adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
    /// Maximum number of records to return across all pages.
    pub limit: Option<u32>,
    /// 1-based page to start from.
    pub page: Option<u32>,
    /// Supplier-side category filter, passed through to the upstream API.
    pub category: Option<String>,
}

impl FetchOptions {
    #[must_use]
    pub fn start_page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Whether `collected` records already satisfy `limit`.
    #[must_use]
    pub fn limit_reached(&self, collected: usize) -> bool {
        self.limit
            .is_some_and(|limit| collected >= usize::try_from(limit).unwrap_or(usize::MAX))
    }
}

/// Post-normalization quality filters. A product failing any filter is
/// skipped: neither a success nor a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFilters {
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_stock: Option<u32>,
    /// Case-insensitive allow-list; empty means every category.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl ImportFilters {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min_price.is_none()
            && self.max_price.is_none()
            && self.min_stock.is_none()
            && self.categories.is_empty()
    }

    #[must_use]
    pub fn accepts(&self, product: &NormalizedProduct) -> bool {
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if self
            .min_stock
            .is_some_and(|min| product.stock_quantity < min)
        {
            return false;
        }
        self.categories.is_empty()
            || self
                .categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&product.category))
    }

    /// Checks the filter for internal contradictions.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the price range is inverted
    /// or a bound is negative.
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(format!("minPrice {min} is greater than maxPrice {max}"));
            }
        }
        if self
            .min_price
            .into_iter()
            .chain(self.max_price)
            .any(|p| p.is_sign_negative())
        {
            return Err("price bounds must not be negative".to_string());
        }
        Ok(())
    }
}
