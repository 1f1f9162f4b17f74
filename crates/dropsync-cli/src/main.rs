mod feed;
mod jobs;
mod sync;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::feed::FeedCommands;
use crate::jobs::JobsCommands;
use crate::sync::SyncCommands;

#[derive(Debug, Parser)]
#[command(name = "dropsync-cli")]
#[command(about = "dropsync supplier catalog sync command line interface")]
struct Cli {
    /// User every command acts on behalf of
    #[arg(long, global = true, env = "DROPSYNC_USER_ID")]
    user: Option<Uuid>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Pull products or orders from a supplier
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Inspect sync jobs
    Jobs {
        #[command(subcommand)]
        command: JobsCommands,
    },
    /// Manage and generate platform feeds
    Feed {
        #[command(subcommand)]
        command: FeedCommands,
    },
    /// List supported supplier connectors
    Connectors,
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Upsert supplier connections from the suppliers file
    Seed,
}

fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

fn require_user(user: Option<Uuid>) -> anyhow::Result<Uuid> {
    user.ok_or_else(|| anyhow::anyhow!("--user (or DROPSYNC_USER_ID) is required for this command"))
}

fn print_connectors() {
    println!(
        "{:<16} {:<22} {:<13} {:>8} {:<7}",
        "CONNECTOR", "NAME", "AUTH", "REQ/MIN", "ORDERS"
    );
    for info in dropsync_core::connector_catalog() {
        let auth = serde_json::to_value(info.auth_type)
            .ok()
            .and_then(|v| v.as_str().map(ToOwned::to_owned))
            .unwrap_or_default();
        println!(
            "{:<16} {:<22} {:<13} {:>8} {:<7}",
            info.connector.as_str(),
            info.name,
            auth,
            info.rate_limit_per_minute,
            if info.supports_orders { "yes" } else { "no" }
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("dropsync-cli: run with --help for available commands");
        return Ok(());
    };

    if matches!(command, Commands::Connectors) {
        init_tracing("warn")?;
        print_connectors();
        return Ok(());
    }

    let config = dropsync_core::load_app_config()?;
    init_tracing(&config.log_level)?;
    let pool_config = dropsync_db::PoolConfig::from_app_config(&config);
    let pool = dropsync_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                dropsync_db::ping(&pool).await?;
                println!("database ok");
            }
            DbCommands::Migrate => {
                let applied = dropsync_db::run_migrations(&pool).await?;
                println!("applied {applied} migration(s)");
            }
            DbCommands::Seed => {
                let user = require_user(cli.user)?;
                seed_suppliers(&pool, &config, user).await?;
            }
        },
        Commands::Sync { command } => {
            let user = require_user(cli.user)?;
            sync::run_sync(pool, &config, user, command).await?;
        }
        Commands::Jobs { command } => {
            let user = require_user(cli.user)?;
            jobs::run_jobs(pool, user, command).await?;
        }
        Commands::Feed { command } => {
            let user = require_user(cli.user)?;
            feed::run_feed(pool, user, command).await?;
        }
        Commands::Connectors => print_connectors(),
    }

    Ok(())
}

/// Upsert every connection described in the suppliers file for `user`.
///
/// `env:VAR` credential references are resolved from the process
/// environment; a missing variable fails the whole seed before any write.
async fn seed_suppliers(
    pool: &sqlx::PgPool,
    config: &dropsync_core::AppConfig,
    user: Uuid,
) -> anyhow::Result<()> {
    let file = dropsync_core::load_suppliers(&config.suppliers_path)?;
    let connections = file
        .suppliers
        .iter()
        .map(|seed| {
            Ok(dropsync_core::SupplierConnection {
                supplier_id: seed.id.clone(),
                name: seed.name.clone(),
                connector: seed.connector,
                credentials: seed.resolve_credentials(|var| std::env::var(var))?,
            })
        })
        .collect::<Result<Vec<_>, dropsync_core::ConfigError>>()?;

    let count = dropsync_db::seed_supplier_connections(pool, user, &connections).await?;
    tracing::info!(user_id = %user, count, "supplier connections seeded");
    println!(
        "seeded {count} supplier connection(s) from {}",
        config.suppliers_path.display()
    );
    Ok(())
}
