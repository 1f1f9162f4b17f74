//! One HTTP adapter per connector type.

mod bigbuy;
mod cj;
mod generic;
mod matterhorn;
mod shopify;

use std::future::Future;

use dropsync_core::{ConnectorType, FetchOptions, SupplierCredentials};
use reqwest::header::HeaderValue;
use serde_json::Value;

use crate::error::AdapterError;
use crate::http::{SupplierHttp, MAX_PAGES};

pub use bigbuy::BigBuyAdapter;
pub use cj::CjAdapter;
pub use generic::GenericJsonAdapter;
pub use matterhorn::MatterhornAdapter;
pub use shopify::ShopifyAdapter;

/// Credential key that overrides a connector's default base URL.
pub(crate) const ENDPOINT_KEY: &str = "endpoint";

/// Items returned by one numbered page.
pub(crate) struct PageItems {
    pub items: Vec<Value>,
    /// `false` when the supplier signalled this was the last page.
    pub has_more: bool,
}

/// Base URL from the `endpoint` credential, else `default`.
pub(crate) fn base_url(credentials: &SupplierCredentials, default: &str) -> String {
    credentials
        .get(ENDPOINT_KEY)
        .unwrap_or(default)
        .to_owned()
}

/// Header value carrying a credential.
pub(crate) fn credential_header(
    connector: ConnectorType,
    value: &str,
) -> Result<HeaderValue, AdapterError> {
    let mut header = HeaderValue::from_str(value).map_err(|e| AdapterError::InvalidCredential {
        connector: connector.to_string(),
        reason: format!("not usable as an HTTP header value: {e}"),
    })?;
    header.set_sensitive(true);
    Ok(header)
}

/// Page size to request: `preferred`, shrunk to `limit` when smaller.
pub(crate) fn page_size(options: &FetchOptions, preferred: u32) -> u32 {
    options.limit.map_or(preferred, |l| l.clamp(1, preferred))
}

/// Drives a page-numbered fetch from `options.start_page()` until a page
/// comes back empty, the supplier reports no more pages, or `options.limit`
/// is reached. Sleeps between pages; fails past [`MAX_PAGES`].
///
/// All-or-nothing: any page failure discards earlier pages.
pub(crate) async fn collect_numbered_pages<F, Fut>(
    http: &SupplierHttp,
    options: &FetchOptions,
    endpoint: &str,
    mut fetch_page: F,
) -> Result<Vec<Value>, AdapterError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PageItems, AdapterError>>,
{
    let mut collected: Vec<Value> = Vec::new();
    let mut page = options.start_page();
    let mut previous_first: Option<Value> = None;

    for page_count in 1..=MAX_PAGES + 1 {
        if page_count > MAX_PAGES {
            return Err(AdapterError::PaginationLimit {
                endpoint: endpoint.to_owned(),
                max_pages: MAX_PAGES,
            });
        }
        if page_count > 1 {
            http.page_delay().await;
        }

        let PageItems { items, has_more } = fetch_page(page).await?;
        if items.is_empty() {
            break;
        }
        // Suppliers that ignore the page parameter return page 1 forever.
        if previous_first.as_ref() == items.first() {
            tracing::warn!(endpoint, page, "supplier repeated the previous page; stopping");
            break;
        }
        previous_first = items.first().cloned();

        collected.extend(items);
        if options.limit_reached(collected.len()) {
            break;
        }
        if !has_more {
            break;
        }
        page += 1;
    }

    if let Some(limit) = options.limit {
        collected.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    }
    tracing::debug!(endpoint, records = collected.len(), "fetched supplier pages");
    Ok(collected)
}
