//! Shared HTTP plumbing for supplier adapters: one `reqwest::Client`, status
//! mapping, retries and the inter-page delay.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::adapter::AdapterSettings;
use crate::error::AdapterError;
use crate::rate_limit::retry_with_backoff;

/// Upper bound on pages fetched in one run. Each page may additionally be
/// retried `max_retries` times.
pub(crate) const MAX_PAGES: usize = 200;

/// Longest upstream error body quoted in an error message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// A parsed JSON page plus its `Link` header, if present.
pub(crate) struct JsonPage {
    pub body: Value,
    pub link: Option<String>,
}

pub(crate) struct SupplierHttp {
    client: Client,
    max_retries: u32,
    backoff_base_secs: u64,
    inter_page_delay: Duration,
}

impl SupplierHttp {
    /// # Errors
    ///
    /// Returns [`AdapterError::Http`] if the `reqwest::Client` cannot be built.
    pub(crate) fn new(settings: &AdapterSettings) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            max_retries: settings.max_retries,
            backoff_base_secs: settings.retry_backoff_base_secs,
            inter_page_delay: Duration::from_millis(settings.inter_page_delay_ms),
        })
    }

    /// GETs `url` and parses the body as JSON, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::RateLimited`] on 429 after retries are exhausted.
    /// - [`AdapterError::Unauthorized`] on 401/403 (not retried).
    /// - [`AdapterError::NotFound`] on 404 (not retried).
    /// - [`AdapterError::UnexpectedStatus`] on any other non-2xx (5xx retried).
    /// - [`AdapterError::Http`] on network failure after retries.
    /// - [`AdapterError::Deserialize`] when the body is not JSON.
    pub(crate) async fn get_json(
        &self,
        url: &reqwest::Url,
        headers: &HeaderMap,
        context: &str,
    ) -> Result<JsonPage, AdapterError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, move || async move {
            let response = self
                .client
                .get(url.clone())
                .headers(headers.clone())
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(AdapterError::RateLimited {
                    domain: url.host_str().unwrap_or_default().to_owned(),
                    retry_after_secs,
                });
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(AdapterError::Unauthorized {
                    status: status.as_u16(),
                    url: redact_query(url),
                });
            }

            if status == StatusCode::NOT_FOUND {
                return Err(AdapterError::NotFound {
                    url: redact_query(url),
                });
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AdapterError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: redact_query(url),
                    message: truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS),
                });
            }

            let link = response
                .headers()
                .get(reqwest::header::LINK)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);

            let text = response.text().await?;
            let body =
                serde_json::from_str::<Value>(&text).map_err(|e| AdapterError::Deserialize {
                    context: context.to_owned(),
                    source: e,
                })?;

            Ok(JsonPage { body, link })
        })
        .await
    }

    /// Sleeps between page requests. Never called before the first page.
    pub(crate) async fn page_delay(&self) {
        if !self.inter_page_delay.is_zero() {
            tokio::time::sleep(self.inter_page_delay).await;
        }
    }
}

/// Parses `base` and appends `path`, keeping any path prefix already in
/// `base` (e.g. `https://host/api2.0/v1` + `product/listV2`).
pub(crate) fn join_endpoint(base: &str, path: &str) -> Result<reqwest::Url, AdapterError> {
    let joined = format!(
        "{}/{}",
        base.trim().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    reqwest::Url::parse(&joined).map_err(|e| AdapterError::InvalidEndpoint {
        endpoint: base.to_owned(),
        reason: e.to_string(),
    })
}

/// URL without its query string, so API keys passed as parameters never
/// end up in error messages or logs.
fn redact_query(url: &reqwest::Url) -> String {
    let mut clean = url.clone();
    clean.set_query(None);
    clean.to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_endpoint_keeps_path_prefix() {
        let url = join_endpoint("https://api.example.com/api2.0/v1/", "/product/listV2").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api2.0/v1/product/listV2");
    }

    #[test]
    fn join_endpoint_rejects_garbage() {
        assert!(matches!(
            join_endpoint("not a url", "x"),
            Err(AdapterError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn redact_query_drops_parameters() {
        let url = reqwest::Url::parse("https://api.example.com/items?apiKey=secret&page=2").unwrap();
        assert_eq!(redact_query(&url), "https://api.example.com/items");
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
