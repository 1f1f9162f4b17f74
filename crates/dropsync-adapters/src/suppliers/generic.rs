//! Any supplier exposing a JSON product list at one URL.
//!
//! The body may be a bare array or an object wrapping the array under
//! `products`, `data`, `items` or `results`. Pages are requested with
//! `page`/`limit` query parameters; servers that ignore them are detected
//! by the repeated-page guard.

use async_trait::async_trait;
use dropsync_core::{ConnectorType, FetchOptions, SupplierCredentials};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use serde_json::Value;

use super::{collect_numbered_pages, credential_header, page_size, PageItems};
use crate::adapter::{require_credential, AdapterSettings, SupplierAdapter};
use crate::error::AdapterError;
use crate::http::SupplierHttp;
use crate::types::{json_kind, RawSupplierRecord};

const ENDPOINT_KEYS: &[&str] = &["endpoint", "url"];
const WRAPPER_KEYS: &[&str] = &["products", "data", "items", "results"];
const MAX_PAGE_SIZE: u32 = 100;

pub struct GenericJsonAdapter {
    http: SupplierHttp,
}

impl GenericJsonAdapter {
    /// # Errors
    ///
    /// Returns [`AdapterError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: &AdapterSettings) -> Result<Self, AdapterError> {
        Ok(Self {
            http: SupplierHttp::new(settings)?,
        })
    }
}

/// The record array inside a page body.
fn extract_items(body: Value) -> Result<Vec<Value>, AdapterError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => WRAPPER_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| AdapterError::Upstream {
                supplier: "generic JSON feed".to_owned(),
                code: "unexpected_body".to_owned(),
                message: format!(
                    "no record array under any of: {}",
                    WRAPPER_KEYS.join(", ")
                ),
            }),
        other => Err(AdapterError::Upstream {
            supplier: "generic JSON feed".to_owned(),
            code: "unexpected_body".to_owned(),
            message: format!("expected an array or object, got {}", json_kind(&other)),
        }),
    }
}

#[async_trait]
impl SupplierAdapter for GenericJsonAdapter {
    fn connector(&self) -> ConnectorType {
        ConnectorType::GenericJson
    }

    async fn fetch_products(
        &self,
        credentials: &SupplierCredentials,
        options: &FetchOptions,
    ) -> Result<Vec<RawSupplierRecord>, AdapterError> {
        let raw_endpoint = require_credential(credentials, self.connector(), ENDPOINT_KEYS)?;
        let endpoint =
            reqwest::Url::parse(raw_endpoint).map_err(|e| AdapterError::InvalidEndpoint {
                endpoint: raw_endpoint.to_owned(),
                reason: e.to_string(),
            })?;

        let mut headers = HeaderMap::new();
        if let Some(key) = credentials.first_of(self.connector().info().credential_keys) {
            headers.insert(
                AUTHORIZATION,
                credential_header(self.connector(), &format!("Bearer {key}"))?,
            );
        }
        let size = page_size(options, MAX_PAGE_SIZE);

        let items = collect_numbered_pages(&self.http, options, endpoint.as_str(), |page| {
            let mut url = endpoint.clone();
            url.query_pairs_mut()
                .append_pair("page", &page.to_string())
                .append_pair("limit", &size.to_string());
            if let Some(category) = &options.category {
                url.query_pairs_mut().append_pair("category", category);
            }
            let headers = &headers;
            async move {
                let page = self.http.get_json(&url, headers, "generic feed page").await?;
                let items = extract_items(page.body)?;
                let has_more = items.len() >= usize::try_from(size).unwrap_or(usize::MAX);
                Ok(PageItems { items, has_more })
            }
        })
        .await?;

        Ok(items
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => RawSupplierRecord::Generic(map),
                other => RawSupplierRecord::Unparseable {
                    hint: None,
                    reason: format!("expected a JSON object, got {}", json_kind(&other)),
                },
            })
            .collect())
    }
}
