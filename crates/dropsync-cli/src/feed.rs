//! `feed` command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use dropsync_core::{CategoryMapping, Stores};
use dropsync_db::{NewFeed, PgStore};
use dropsync_engine::FeedGenerator;
use uuid::Uuid;

/// Sub-commands available under `feed`.
#[derive(Debug, Subcommand)]
pub enum FeedCommands {
    /// Create a feed definition
    Create {
        /// Feed name
        name: String,
        /// Target platform
        #[arg(long, default_value = "google_shopping")]
        platform: String,
        /// Title template with {{field}} placeholders
        #[arg(long, default_value = "{{brand}} {{title}}")]
        title_template: String,
        /// Description template with {{field}} placeholders
        #[arg(long, default_value = "{{description}}")]
        description_template: String,
        #[arg(long, default_value = "150")]
        max_title_length: u32,
        #[arg(long, default_value = "5000")]
        max_description_length: u32,
    },
    /// Map a supplier category onto the platform taxonomy
    Map {
        feed_id: Uuid,
        /// Supplier category, matched case-insensitively
        source: String,
        /// Platform category path
        target: String,
    },
    /// Regenerate every item of a feed from the catalog
    Generate { feed_id: Uuid },
    /// Write the feed as RSS XML
    Export {
        feed_id: Uuid,
        /// Output file; stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

/// # Errors
///
/// Returns an error if the feed does not belong to `user` or a store call
/// fails. Per-product generation failures are counted, not returned.
pub(crate) async fn run_feed(
    pool: sqlx::PgPool,
    user: Uuid,
    command: FeedCommands,
) -> anyhow::Result<()> {
    match command {
        FeedCommands::Create {
            name,
            platform,
            title_template,
            description_template,
            max_title_length,
            max_description_length,
        } => {
            let feed = dropsync_db::create_feed(
                &pool,
                user,
                &NewFeed {
                    name: &name,
                    platform: &platform,
                    title_template: &title_template,
                    description_template: &description_template,
                    max_title_length,
                    max_description_length,
                },
            )
            .await?;
            println!("created feed {} ({})", feed.id, feed.name);
        }
        FeedCommands::Map {
            feed_id,
            source,
            target,
        } => {
            dropsync_db::get_feed(&pool, user, feed_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("feed {feed_id} not found"))?;
            dropsync_db::upsert_category_mapping(
                &pool,
                feed_id,
                &CategoryMapping {
                    source_category: source.clone(),
                    target_category: target.clone(),
                },
            )
            .await?;
            println!("mapped '{source}' -> '{target}'");
        }
        FeedCommands::Generate { feed_id } => {
            let run = generator(pool).generate(user, feed_id).await?;
            println!(
                "feed run {} {}: {} of {} products generated, {} failed, avg score {:.2}",
                run.id,
                run.status,
                run.generated_items,
                run.total_products,
                run.failed_items,
                run.avg_seo_score
            );
        }
        FeedCommands::Export { feed_id, output } => {
            let xml = generator(pool).export(user, feed_id).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, xml).await?;
                    println!("wrote {}", path.display());
                }
                None => println!("{xml}"),
            }
        }
    }
    Ok(())
}

fn generator(pool: sqlx::PgPool) -> FeedGenerator {
    let stores = Stores::from_backend(Arc::new(PgStore::new(pool)));
    FeedGenerator::new(stores.catalog, stores.feeds)
}
