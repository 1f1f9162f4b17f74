//! CJ Dropshipping API v2.0: `product/listV2` and `shopping/order/list`.
//!
//! CJ answers 200 with a `{code, message, data}` envelope; any `code` other
//! than 200 is a supplier-level failure.

use async_trait::async_trait;
use dropsync_core::{ConnectorType, FetchOptions, SupplierCredentials};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::Value;

use super::{base_url, collect_numbered_pages, credential_header, page_size, PageItems};
use crate::adapter::{require_credential, AdapterSettings, SupplierAdapter};
use crate::error::AdapterError;
use crate::http::{join_endpoint, SupplierHttp};
use crate::loose;
use crate::types::RawSupplierRecord;

const PRODUCTS_PATH: &str = "product/listV2";
const ORDERS_PATH: &str = "shopping/order/list";
const MAX_PAGE_SIZE: u32 = 100;
const SUCCESS_CODE: &str = "200";

#[derive(Deserialize)]
struct Envelope {
    #[serde(default, deserialize_with = "loose::opt_string")]
    code: Option<String>,
    #[serde(default, deserialize_with = "loose::opt_string")]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ProductData {
    #[serde(default, deserialize_with = "loose::opt_u32")]
    total_pages: Option<u32>,
    #[serde(default)]
    content: Vec<ProductContent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductContent {
    #[serde(default)]
    product_list: Vec<Value>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct OrderData {
    #[serde(default, deserialize_with = "loose::opt_u32")]
    total: Option<u32>,
    #[serde(default)]
    list: Vec<Value>,
}

pub struct CjAdapter {
    http: SupplierHttp,
}

impl CjAdapter {
    /// # Errors
    ///
    /// Returns [`AdapterError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: &AdapterSettings) -> Result<Self, AdapterError> {
        Ok(Self {
            http: SupplierHttp::new(settings)?,
        })
    }

    fn auth_headers(&self, credentials: &SupplierCredentials) -> Result<HeaderMap, AdapterError> {
        let connector = self.connector();
        let token = require_credential(credentials, connector, connector.info().credential_keys)?;
        let mut headers = HeaderMap::new();
        headers.insert("CJ-Access-Token", credential_header(connector, token)?);
        Ok(headers)
    }

    /// Fetches one envelope and returns its `data`, decoded as `T`.
    async fn fetch_data<T>(
        &self,
        url: &reqwest::Url,
        headers: &HeaderMap,
        context: &str,
    ) -> Result<T, AdapterError>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let page = self.http.get_json(url, headers, context).await?;
        let envelope: Envelope =
            serde_json::from_value(page.body).map_err(|e| AdapterError::Deserialize {
                context: context.to_owned(),
                source: e,
            })?;

        let code = envelope.code.unwrap_or_default();
        if code != SUCCESS_CODE {
            return Err(AdapterError::Upstream {
                supplier: self.connector().info().name.to_owned(),
                code,
                message: envelope
                    .message
                    .unwrap_or_else(|| "Unknown error".to_owned()),
            });
        }

        match envelope.data {
            None | Some(Value::Null) => Ok(T::default()),
            Some(data) => serde_json::from_value(data).map_err(|e| AdapterError::Deserialize {
                context: context.to_owned(),
                source: e,
            }),
        }
    }
}

#[async_trait]
impl SupplierAdapter for CjAdapter {
    fn connector(&self) -> ConnectorType {
        ConnectorType::CjDropshipping
    }

    async fn fetch_products(
        &self,
        credentials: &SupplierCredentials,
        options: &FetchOptions,
    ) -> Result<Vec<RawSupplierRecord>, AdapterError> {
        let headers = self.auth_headers(credentials)?;
        let base = base_url(credentials, self.connector().info().base_url);
        let endpoint = join_endpoint(&base, PRODUCTS_PATH)?;
        let size = page_size(options, MAX_PAGE_SIZE);

        let items = collect_numbered_pages(&self.http, options, endpoint.as_str(), |page| {
            let mut url = endpoint.clone();
            url.query_pairs_mut()
                .append_pair("page", &page.to_string())
                .append_pair("size", &size.to_string())
                .append_pair("features", "enable_description,enable_category");
            if let Some(category) = &options.category {
                url.query_pairs_mut().append_pair("categoryId", category);
            }
            let headers = &headers;
            async move {
                let data: ProductData = self
                    .fetch_data(&url, headers, "CJ product page")
                    .await?;
                let total_pages = data.total_pages.unwrap_or(1);
                let items: Vec<Value> = data
                    .content
                    .into_iter()
                    .flat_map(|c| c.product_list)
                    .collect();
                Ok(PageItems {
                    items,
                    has_more: page < total_pages,
                })
            }
        })
        .await?;

        Ok(items
            .into_iter()
            .map(|v| RawSupplierRecord::parse(v, RawSupplierRecord::Cj))
            .collect())
    }

    async fn fetch_orders(
        &self,
        credentials: &SupplierCredentials,
        options: &FetchOptions,
    ) -> Result<Vec<RawSupplierRecord>, AdapterError> {
        let headers = self.auth_headers(credentials)?;
        let base = base_url(credentials, self.connector().info().base_url);
        let endpoint = join_endpoint(&base, ORDERS_PATH)?;
        let size = page_size(options, MAX_PAGE_SIZE);

        let items = collect_numbered_pages(&self.http, options, endpoint.as_str(), |page| {
            let mut url = endpoint.clone();
            url.query_pairs_mut()
                .append_pair("pageNum", &page.to_string())
                .append_pair("pageSize", &size.to_string());
            let headers = &headers;
            async move {
                let data: OrderData = self.fetch_data(&url, headers, "CJ order page").await?;
                let seen = u64::from(page) * u64::from(size);
                let has_more = data.total.is_some_and(|total| seen < u64::from(total));
                Ok(PageItems {
                    items: data.list,
                    has_more,
                })
            }
        })
        .await?;

        Ok(items
            .into_iter()
            .map(|v| RawSupplierRecord::parse(v, RawSupplierRecord::CjOrder))
            .collect())
    }
}
