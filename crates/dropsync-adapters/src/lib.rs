//! Supplier HTTP adapters and the pure normalizer that maps their raw
//! records into canonical products and orders.

pub mod adapter;
pub mod error;
mod http;
pub mod loose;
pub mod normalize;
pub mod pagination;
mod rate_limit;
pub mod suppliers;
pub mod types;

pub use adapter::{AdapterRegistry, AdapterSettings, SupplierAdapter};
pub use error::AdapterError;
pub use normalize::{normalize_order, normalize_product, NormalizeError};
pub use suppliers::{
    BigBuyAdapter, CjAdapter, GenericJsonAdapter, MatterhornAdapter, ShopifyAdapter,
};
pub use types::RawSupplierRecord;
