use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dropsync_core::{AppConfig, ConnectorType, FetchOptions, SupplierCredentials};

use crate::error::AdapterError;
use crate::suppliers::{
    BigBuyAdapter, CjAdapter, GenericJsonAdapter, MatterhornAdapter, ShopifyAdapter,
};
use crate::types::RawSupplierRecord;

/// Per-supplier fetch capability.
///
/// A malformed individual record never fails the call; it comes back as
/// [`RawSupplierRecord::Unparseable`]. Network, auth and upstream failures
/// fail the whole call with one [`AdapterError`].
#[async_trait]
pub trait SupplierAdapter: Send + Sync {
    fn connector(&self) -> ConnectorType;

    async fn fetch_products(
        &self,
        credentials: &SupplierCredentials,
        options: &FetchOptions,
    ) -> Result<Vec<RawSupplierRecord>, AdapterError>;

    async fn fetch_orders(
        &self,
        _credentials: &SupplierCredentials,
        _options: &FetchOptions,
    ) -> Result<Vec<RawSupplierRecord>, AdapterError> {
        Err(AdapterError::Unsupported {
            connector: self.connector().to_string(),
            operation: "order sync",
        })
    }
}

/// HTTP behaviour shared by all adapters.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub inter_page_delay_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
}

impl AdapterSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            request_timeout_secs: config.adapter_request_timeout_secs,
            user_agent: config.adapter_user_agent.clone(),
            inter_page_delay_ms: config.adapter_inter_page_delay_ms,
            max_retries: config.adapter_max_retries,
            retry_backoff_base_secs: config.adapter_retry_backoff_base_secs,
        }
    }
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            user_agent: "dropsync/0.1 (catalog-sync)".to_owned(),
            inter_page_delay_ms: 250,
            max_retries: 3,
            retry_backoff_base_secs: 2,
        }
    }
}

/// Adapters keyed by connector type.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ConnectorType, Arc<dyn SupplierAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in HTTP adapter for every connector.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Http`] if an HTTP client cannot be built.
    pub fn with_defaults(settings: &AdapterSettings) -> Result<Self, AdapterError> {
        let mut registry = Self::new();
        registry.register(Arc::new(ShopifyAdapter::new(settings)?));
        registry.register(Arc::new(BigBuyAdapter::new(settings)?));
        registry.register(Arc::new(CjAdapter::new(settings)?));
        registry.register(Arc::new(MatterhornAdapter::new(settings)?));
        registry.register(Arc::new(GenericJsonAdapter::new(settings)?));
        Ok(registry)
    }

    /// Registers `adapter`, replacing any previous adapter for its connector.
    pub fn register(&mut self, adapter: Arc<dyn SupplierAdapter>) {
        self.adapters.insert(adapter.connector(), adapter);
    }

    #[must_use]
    pub fn get(&self, connector: ConnectorType) -> Option<Arc<dyn SupplierAdapter>> {
        self.adapters.get(&connector).cloned()
    }

    #[must_use]
    pub fn connectors(&self) -> Vec<ConnectorType> {
        let mut connectors: Vec<_> = self.adapters.keys().copied().collect();
        connectors.sort_by_key(|c| c.as_str());
        connectors
    }
}

/// Looks up the first credential among `keys`.
///
/// # Errors
///
/// Returns [`AdapterError::MissingCredential`] naming every accepted key.
pub(crate) fn require_credential<'a>(
    credentials: &'a SupplierCredentials,
    connector: ConnectorType,
    keys: &[&str],
) -> Result<&'a str, AdapterError> {
    credentials
        .first_of(keys)
        .ok_or_else(|| AdapterError::MissingCredential {
            connector: connector.to_string(),
            expected: keys.join(" | "),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl SupplierAdapter for Fixed {
        fn connector(&self) -> ConnectorType {
            ConnectorType::GenericJson
        }

        async fn fetch_products(
            &self,
            _credentials: &SupplierCredentials,
            _options: &FetchOptions,
        ) -> Result<Vec<RawSupplierRecord>, AdapterError> {
            Ok(vec![])
        }
    }

    #[test]
    fn register_replaces_existing_connector() {
        let mut registry = AdapterRegistry::with_defaults(&AdapterSettings::default()).unwrap();
        assert_eq!(registry.connectors().len(), ConnectorType::ALL.len());
        registry.register(Arc::new(Fixed));
        assert_eq!(registry.connectors().len(), ConnectorType::ALL.len());
        assert!(registry.get(ConnectorType::GenericJson).is_some());
    }

    #[test]
    fn empty_registry_has_no_adapters() {
        assert!(AdapterRegistry::new()
            .get(ConnectorType::Shopify)
            .is_none());
    }

    #[tokio::test]
    async fn default_fetch_orders_is_unsupported() {
        let err = Fixed
            .fetch_orders(&SupplierCredentials::new(), &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Unsupported { .. }));
    }

    #[test]
    fn require_credential_lists_accepted_keys() {
        let err = require_credential(
            &SupplierCredentials::new(),
            ConnectorType::CjDropshipping,
            &["accessToken", "apiKey"],
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing credential for cjdropshipping: expected one of accessToken | apiKey"
        );
    }
}
