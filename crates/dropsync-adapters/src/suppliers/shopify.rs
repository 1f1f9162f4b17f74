//! Shopify storefront `products.json`, paginated by `Link` header cursors.

use async_trait::async_trait;
use dropsync_core::{ConnectorType, FetchOptions, SupplierCredentials};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::Value;

use crate::adapter::{require_credential, AdapterSettings, SupplierAdapter};
use crate::error::AdapterError;
use crate::http::{SupplierHttp, MAX_PAGES};
use crate::pagination::extract_next_cursor;
use crate::types::RawSupplierRecord;

const SHOP_URL_KEYS: &[&str] = &["shopUrl", "endpoint"];
const MAX_PAGE_SIZE: u32 = 250;

#[derive(Deserialize)]
struct ProductsPage {
    products: Vec<Value>,
}

pub struct ShopifyAdapter {
    http: SupplierHttp,
}

impl ShopifyAdapter {
    /// # Errors
    ///
    /// Returns [`AdapterError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: &AdapterSettings) -> Result<Self, AdapterError> {
        Ok(Self {
            http: SupplierHttp::new(settings)?,
        })
    }

    fn products_url(
        shop_url: &str,
        limit: u32,
        page_info: Option<&str>,
    ) -> Result<reqwest::Url, AdapterError> {
        let origin = store_origin(shop_url)?;
        let mut url = reqwest::Url::parse(&format!("{origin}/products.json")).map_err(|e| {
            AdapterError::InvalidEndpoint {
                endpoint: shop_url.to_owned(),
                reason: e.to_string(),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        if let Some(cursor) = page_info {
            url.query_pairs_mut().append_pair("page_info", cursor);
        }
        Ok(url)
    }
}

/// Scheme + host of `shop_url`, so collection paths in the configured URL
/// don't leak into the products endpoint.
fn store_origin(shop_url: &str) -> Result<String, AdapterError> {
    reqwest::Url::parse(shop_url.trim())
        .map(|u| u.origin().ascii_serialization())
        .map_err(|e| AdapterError::InvalidEndpoint {
            endpoint: shop_url.to_owned(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl SupplierAdapter for ShopifyAdapter {
    fn connector(&self) -> ConnectorType {
        ConnectorType::Shopify
    }

    /// `options.page` is ignored: storefront pagination is cursor-only.
    /// `options.category` is matched locally against `product_type`.
    async fn fetch_products(
        &self,
        credentials: &SupplierCredentials,
        options: &FetchOptions,
    ) -> Result<Vec<RawSupplierRecord>, AdapterError> {
        let shop_url = require_credential(credentials, self.connector(), SHOP_URL_KEYS)?;
        let limit = super::page_size(options, MAX_PAGE_SIZE);

        let mut headers = HeaderMap::new();
        if let Some(token) = credentials.first_of(self.connector().info().credential_keys) {
            headers.insert(
                "X-Shopify-Access-Token",
                super::credential_header(self.connector(), token)?,
            );
        }

        let mut collected: Vec<Value> = Vec::new();
        let mut cursor: Option<String> = None;

        for page_count in 1..=MAX_PAGES + 1 {
            if page_count > MAX_PAGES {
                return Err(AdapterError::PaginationLimit {
                    endpoint: shop_url.to_owned(),
                    max_pages: MAX_PAGES,
                });
            }
            if page_count > 1 {
                self.http.page_delay().await;
            }

            let url = Self::products_url(shop_url, limit, cursor.as_deref())?;
            let page = self
                .http
                .get_json(&url, &headers, &format!("products page from {shop_url}"))
                .await?;
            let parsed: ProductsPage =
                serde_json::from_value(page.body).map_err(|e| AdapterError::Deserialize {
                    context: format!("products page from {shop_url}"),
                    source: e,
                })?;

            collected.extend(parsed.products.into_iter().filter(|p| {
                options.category.as_deref().is_none_or(|wanted| {
                    p.get("product_type")
                        .and_then(Value::as_str)
                        .is_some_and(|t| t.eq_ignore_ascii_case(wanted))
                })
            }));
            if options.limit_reached(collected.len()) {
                break;
            }

            cursor = extract_next_cursor(page.link.as_deref());
            if cursor.is_none() {
                break;
            }
        }

        if let Some(limit) = options.limit {
            collected.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(collected
            .into_iter()
            .map(|v| RawSupplierRecord::parse(v, RawSupplierRecord::Shopify))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn products_url_uses_store_origin() {
        let url = ShopifyAdapter::products_url(
            "https://shop.example.com/collections/all",
            250,
            Some("CURSOR"),
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://shop.example.com/products.json?limit=250&page_info=CURSOR"
        );
    }

    #[test]
    fn invalid_shop_url_is_reported() {
        assert!(matches!(
            store_origin("not a url"),
            Err(AdapterError::InvalidEndpoint { .. })
        ));
    }
}
