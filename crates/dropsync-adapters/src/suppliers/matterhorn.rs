use async_trait::async_trait;
use dropsync_core::{ConnectorType, FetchOptions, SupplierCredentials};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use serde_json::Value;

use super::{base_url, collect_numbered_pages, credential_header, page_size, PageItems};
use crate::adapter::{require_credential, AdapterSettings, SupplierAdapter};
use crate::error::AdapterError;
use crate::http::{join_endpoint, SupplierHttp};
use crate::types::{json_kind, RawSupplierRecord};

const ITEMS_PATH: &str = "B2BAPI/ITEMS/";
const MAX_PAGE_SIZE: u32 = 100;

pub struct MatterhornAdapter {
    http: SupplierHttp,
}

impl MatterhornAdapter {
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
impl SupplierAdapter for MatterhornAdapter {
    fn connector(&self) -> ConnectorType {
        ConnectorType::Matterhorn
    }

    /// Pages until an empty page comes back. The API key goes in the
    /// `Authorization` header verbatim, without a scheme.
    async fn fetch_products(
        &self,
        credentials: &SupplierCredentials,
        options: &FetchOptions,
    ) -> Result<Vec<RawSupplierRecord>, AdapterError> {
        let info = self.connector().info();
        let api_key = require_credential(credentials, self.connector(), info.credential_keys)?;
        let endpoint = join_endpoint(&base_url(credentials, info.base_url), ITEMS_PATH)?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, credential_header(self.connector(), api_key)?);
        let size = page_size(options, MAX_PAGE_SIZE);

        let items = collect_numbered_pages(&self.http, options, endpoint.as_str(), |page| {
            let mut url = endpoint.clone();
            url.query_pairs_mut()
                .append_pair("page", &page.to_string())
                .append_pair("limit", &size.to_string());
            let headers = &headers;
            async move {
                let page = self
                    .http
                    .get_json(&url, headers, "Matterhorn items page")
                    .await?;
                match page.body {
                    Value::Array(items) => Ok(PageItems {
                        items,
                        has_more: true,
                    }),
                    other => Err(AdapterError::Upstream {
                        supplier: "Matterhorn".to_owned(),
                        code: "unexpected_body".to_owned(),
                        message: format!("expected an item array, got {}", json_kind(&other)),
                    }),
                }
            }
        })
        .await?;

        let wanted = options.category.as_deref();
        Ok(items
            .into_iter()
            .filter(|item| {
                wanted.is_none_or(|c| {
                    item.get("category_name")
                        .and_then(Value::as_str)
                        .is_some_and(|name| name.eq_ignore_ascii_case(c))
                })
            })
            .map(|v| RawSupplierRecord::parse(v, RawSupplierRecord::Matterhorn))
            .collect())
    }
}
