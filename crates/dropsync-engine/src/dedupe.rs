//! Insert-or-update resolution against the catalog.
//!
//! The identity of a catalog row is `(user, supplier_name, external_id)`.
//! When that key is unknown, a row of the same supplier carrying the same
//! SKU is adopted instead of inserting a second row for the same item. SKUs
//! are never compared across suppliers.
//!
//! Adoption is limited by the batch being synced: a row whose own external
//! id is still present in the batch is never taken over, and a SKU carried
//! by more than one external id in the batch adopts nothing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dropsync_core::{
    CatalogStore, NormalizedOrder, NormalizedProduct, OrderStore, StoreError, UpsertAction,
    UpsertOutcome,
};
use uuid::Uuid;

/// External ids and SKUs of one supplier response.
#[derive(Debug, Clone, Default)]
pub struct BatchKeys {
    external_ids: HashSet<String>,
    shared_skus: HashSet<String>,
}

impl BatchKeys {
    #[must_use]
    pub fn from_products<'a>(products: impl IntoIterator<Item = &'a NormalizedProduct>) -> Self {
        let mut owners: HashMap<&str, &str> = HashMap::new();
        let mut keys = Self::default();
        for product in products {
            keys.external_ids.insert(product.external_id.clone());
            match owners.get(product.sku.as_str()) {
                Some(owner) if *owner != product.external_id => {
                    keys.shared_skus.insert(product.sku.clone());
                }
                Some(_) => {}
                None => {
                    owners.insert(&product.sku, &product.external_id);
                }
            }
        }
        keys
    }

    /// Whether `product` may take over the row currently keyed by
    /// `row_external_id`.
    fn may_adopt(&self, product: &NormalizedProduct, row_external_id: &str) -> bool {
        !self.external_ids.contains(row_external_id) && !self.shared_skus.contains(&product.sku)
    }
}

/// What [`Deduplicator::resolve`] decided for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Insert,
    Update(Uuid),
}

impl Resolution {
    #[must_use]
    pub fn action(self) -> UpsertAction {
        match self {
            Resolution::Insert => UpsertAction::Inserted,
            Resolution::Update(_) => UpsertAction::Updated,
        }
    }

    #[must_use]
    pub fn catalog_id(self) -> Option<Uuid> {
        match self {
            Resolution::Insert => None,
            Resolution::Update(id) => Some(id),
        }
    }
}

#[derive(Clone)]
pub struct Deduplicator {
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
}

impl Deduplicator {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogStore>, orders: Arc<dyn OrderStore>) -> Self {
        Self { catalog, orders }
    }

    /// Looks up the row `product` corresponds to, without writing. `batch`
    /// holds the keys of the response `product` came from.
    ///
    /// # Errors
    ///
    /// Propagates catalog store failures.
    pub async fn resolve(
        &self,
        user_id: Uuid,
        product: &NormalizedProduct,
        batch: &BatchKeys,
    ) -> Result<Resolution, StoreError> {
        if let Some(entry) = self
            .catalog
            .find_by_external_id(user_id, &product.supplier_name, &product.external_id)
            .await?
        {
            return Ok(Resolution::Update(entry.id));
        }

        if let Some(entry) = self
            .catalog
            .find_by_sku(user_id, &product.supplier_name, &product.sku)
            .await?
            .filter(|entry| batch.may_adopt(product, &entry.product.external_id))
        {
            tracing::debug!(
                supplier = %product.supplier_name,
                sku = %product.sku,
                from = %entry.product.external_id,
                to = %product.external_id,
                "adopting catalog row by sku"
            );
            return Ok(Resolution::Update(entry.id));
        }

        Ok(Resolution::Insert)
    }

    /// Resolves and writes `product`. Every mutable field of an existing row
    /// is overwritten; its id and creation time are kept.
    ///
    /// # Errors
    ///
    /// Propagates catalog store failures, including [`StoreError::Conflict`]
    /// when an adopted row cannot take over the new key.
    pub async fn upsert_product(
        &self,
        user_id: Uuid,
        product: &NormalizedProduct,
        batch: &BatchKeys,
    ) -> Result<UpsertOutcome, StoreError> {
        match self.resolve(user_id, product, batch).await? {
            Resolution::Update(id) => match self.catalog.update(user_id, id, product).await {
                Ok(()) => Ok(UpsertOutcome {
                    id,
                    action: UpsertAction::Updated,
                }),
                // The row vanished between lookup and write.
                Err(StoreError::NotFound(_)) => self.catalog.insert(user_id, product).await,
                Err(e) => Err(e),
            },
            Resolution::Insert => self.catalog.insert(user_id, product).await,
        }
    }

    /// Orders carry no SKU identity; the store upserts them by
    /// `(user, supplier_name, external_order_id)` directly.
    ///
    /// # Errors
    ///
    /// Propagates order store failures.
    pub async fn upsert_order(
        &self,
        user_id: Uuid,
        order: &NormalizedOrder,
    ) -> Result<UpsertOutcome, StoreError> {
        self.orders.upsert_order(user_id, order).await
    }
}
