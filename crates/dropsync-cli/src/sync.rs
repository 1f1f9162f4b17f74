//! `sync` command handlers.
//!
//! A CLI run goes through the same orchestrator as the HTTP trigger, against
//! the Postgres stores. Ctrl-C and the configured run timeout both cancel the
//! run; the job is then finalized as `cancelled` with its partial counts.

use std::sync::Arc;

use clap::{Args, Subcommand};
use dropsync_adapters::{AdapterRegistry, AdapterSettings};
use dropsync_core::{
    AppConfig, ConnectorType, FetchOptions, ImportFilters, Stores, SupplierCredentials,
    SyncSummary,
};
use dropsync_db::PgStore;
use dropsync_engine::{SyncOrchestrator, SyncRequest, SyncSettings};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Sub-commands available under `sync`.
#[derive(Debug, Subcommand)]
pub enum SyncCommands {
    /// Import the supplier's product catalog
    Products {
        #[command(flatten)]
        target: SyncTarget,
        /// Skip products cheaper than this
        #[arg(long)]
        min_price: Option<Decimal>,
        /// Skip products more expensive than this
        #[arg(long)]
        max_price: Option<Decimal>,
        /// Skip products with less stock than this
        #[arg(long)]
        min_stock: Option<u32>,
        /// Only import these categories (repeatable)
        #[arg(long = "only-category")]
        only_categories: Vec<String>,
    },
    /// Import the supplier's orders (CJ Dropshipping only)
    Orders {
        #[command(flatten)]
        target: SyncTarget,
    },
}

/// Arguments shared by every sync kind.
#[derive(Debug, Args)]
pub struct SyncTarget {
    /// Supplier connection id
    pub supplier: String,
    /// Connector type; defaults to the stored connection's
    #[arg(long)]
    pub connector: Option<ConnectorType>,
    /// Display name recorded on catalog entries
    #[arg(long)]
    pub supplier_name: Option<String>,
    /// Inline credential as KEY=VALUE, overriding the stored ones (repeatable)
    #[arg(long = "credential", value_parser = parse_key_val)]
    pub credentials: Vec<(String, String)>,
    /// Maximum number of records to fetch
    #[arg(long)]
    pub limit: Option<u32>,
    /// First page to fetch
    #[arg(long)]
    pub page: Option<u32>,
    /// Supplier-side category filter
    #[arg(long)]
    pub category: Option<String>,
}

pub(crate) fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty credential key in '{raw}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

impl SyncTarget {
    fn into_request(self, request: SyncRequest) -> SyncRequest {
        let credentials = (!self.credentials.is_empty()).then(|| {
            self.credentials
                .into_iter()
                .fold(SupplierCredentials::new(), |creds, (k, v)| creds.with(k, v))
        });
        SyncRequest {
            connector: self.connector,
            supplier_name: self.supplier_name,
            credentials,
            options: FetchOptions {
                limit: self.limit,
                page: self.page,
                category: self.category,
            },
            ..request
        }
    }
}

pub(crate) fn build_request(user: Uuid, command: SyncCommands) -> SyncRequest {
    match command {
        SyncCommands::Products {
            target,
            min_price,
            max_price,
            min_stock,
            only_categories,
        } => {
            let base = SyncRequest::products(user, target.supplier.clone());
            SyncRequest {
                filters: ImportFilters {
                    min_price,
                    max_price,
                    min_stock,
                    categories: only_categories,
                },
                ..target.into_request(base)
            }
        }
        SyncCommands::Orders { target } => {
            let base = SyncRequest::orders(user, target.supplier.clone());
            target.into_request(base)
        }
    }
}

fn print_summary(summary: &SyncSummary) {
    println!(
        "{} sync {} (job {})",
        summary.kind, summary.status, summary.job_id
    );
    println!(
        "  total {}  imported {} ({} new, {} updated)  failed {}  skipped {}",
        summary.total,
        summary.imported,
        summary.inserted,
        summary.updated,
        summary.failed,
        summary.skipped
    );
    for error in &summary.errors {
        println!("  error: {error}");
    }
}

/// Cancels `cancel` on Ctrl-C or when `timeout` elapses, whichever is first.
fn spawn_cancel_watch(
    cancel: CancellationToken,
    timeout: Option<std::time::Duration>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let deadline = async {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupt received, cancelling sync");
            }
            () = deadline => {
                tracing::warn!("sync run timed out, cancelling");
            }
        }
        cancel.cancel();
    })
}

/// # Errors
///
/// Returns an error if the adapters cannot be built or the run fails
/// fatally. Per-record failures are printed in the summary.
pub(crate) async fn run_sync(
    pool: sqlx::PgPool,
    config: &AppConfig,
    user: Uuid,
    command: SyncCommands,
) -> anyhow::Result<()> {
    let stores = Stores::from_backend(Arc::new(PgStore::new(pool)));
    let adapters = AdapterRegistry::with_defaults(&AdapterSettings::from_app_config(config))?;
    let orchestrator =
        SyncOrchestrator::new(adapters, stores, SyncSettings::from_app_config(config));

    let request = build_request(user, command);
    let cancel = CancellationToken::new();
    let watch = spawn_cancel_watch(cancel.clone(), orchestrator.settings().timeout);

    let result = orchestrator.run_with_cancel(request, &cancel).await;
    watch.abort();

    let summary = result?;
    print_summary(&summary);
    Ok(())
}
