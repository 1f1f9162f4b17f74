//! Canonical types, configuration and store contracts shared by every
//! dropsync crate.

use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod connectors;
pub mod credentials;
pub mod feeds;
pub mod options;
pub mod orders;
pub mod products;
pub mod store;
pub mod suppliers;
pub mod sync_job;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use connectors::{connector_catalog, AuthType, ConnectorInfo, ConnectorType};
pub use credentials::{SupplierConnection, SupplierCredentials};
pub use feeds::{CategoryMapping, Feed, FeedGenerationRun, FeedItem, FeedRunTotals};
pub use options::{FetchOptions, ImportFilters};
pub use orders::{NormalizedOrder, OrderLineItem, SupplierOrder};
pub use products::{CatalogEntry, CatalogKey, NormalizedProduct, DEFAULT_CATEGORY};
pub use store::{
    ActivityEntry, ActivityLog, CatalogStore, CredentialStore, FeedStore, JobStore, OrderStore,
    StoreError, Stores, SupplierAnalytics, UpsertAction, UpsertOutcome,
};
pub use suppliers::{load_suppliers, SupplierSeed, SuppliersFile};
pub use sync_job::{JobProgress, JobStatus, NewSyncJob, SyncJob, SyncKind, SyncSummary};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown connector type: {0}")]
    UnknownConnector(String),
    #[error("unknown job status: {0}")]
    UnknownJobStatus(String),
    #[error("unknown sync kind: {0}")]
    UnknownSyncKind(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read suppliers file {path}: {source}")]
    SuppliersFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse suppliers file: {0}")]
    SuppliersFileParse(#[from] serde_yaml::Error),
    #[error("suppliers file validation failed: {0}")]
    Validation(String),
}
