use async_trait::async_trait;
use dropsync_core::{ConnectorType, FetchOptions, SupplierCredentials};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use serde_json::Value;

use super::{base_url, collect_numbered_pages, credential_header, page_size, PageItems};
use crate::adapter::{require_credential, AdapterSettings, SupplierAdapter};
use crate::error::AdapterError;
use crate::http::{join_endpoint, SupplierHttp};
use crate::types::{json_kind, RawSupplierRecord};

const SANDBOX_BASE_URL: &str = "https://api.sandbox.bigbuy.eu";
const PRODUCTS_PATH: &str = "rest/catalog/products.json";
const MAX_PAGE_SIZE: u32 = 100;

pub struct BigBuyAdapter {
    http: SupplierHttp,
}

impl BigBuyAdapter {
    /// # Errors
    ///
    /// Returns [`AdapterError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: &AdapterSettings) -> Result<Self, AdapterError> {
        Ok(Self {
            http: SupplierHttp::new(settings)?,
        })
    }
}

#[async_trait]
impl SupplierAdapter for BigBuyAdapter {
    fn connector(&self) -> ConnectorType {
        ConnectorType::BigBuy
    }

    async fn fetch_products(
        &self,
        credentials: &SupplierCredentials,
        options: &FetchOptions,
    ) -> Result<Vec<RawSupplierRecord>, AdapterError> {
        let info = self.connector().info();
        let api_key = require_credential(credentials, self.connector(), info.credential_keys)?;
        let default_base = if credentials.flag("testMode") {
            SANDBOX_BASE_URL
        } else {
            info.base_url
        };
        let endpoint = join_endpoint(&base_url(credentials, default_base), PRODUCTS_PATH)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            credential_header(self.connector(), &format!("Bearer {api_key}"))?,
        );
        let size = page_size(options, MAX_PAGE_SIZE);

        let items = collect_numbered_pages(&self.http, options, endpoint.as_str(), |page| {
            let mut url = endpoint.clone();
            url.query_pairs_mut()
                .append_pair("page", &page.to_string())
                .append_pair("pageSize", &size.to_string());
            if let Some(category) = &options.category {
                url.query_pairs_mut().append_pair("category", category);
            }
            let headers = &headers;
            async move {
                let page = self
                    .http
                    .get_json(&url, headers, "BigBuy products page")
                    .await?;
                let items = match page.body {
                    Value::Array(items) => items,
                    other => {
                        return Err(AdapterError::Upstream {
                            supplier: "BigBuy".to_owned(),
                            code: "unexpected_body".to_owned(),
                            message: format!("expected a product array, got {}", json_kind(&other)),
                        })
                    }
                };
                let has_more = items.len() >= usize::try_from(size).unwrap_or(usize::MAX);
                Ok(PageItems { items, has_more })
            }
        })
        .await?;

        Ok(items
            .into_iter()
            .map(|v| RawSupplierRecord::parse(v, RawSupplierRecord::BigBuy))
            .collect())
    }
}
