//! `jobs` command handlers: read-only views of sync jobs.

use clap::Subcommand;
use dropsync_core::SyncJob;
use uuid::Uuid;

/// Sub-commands available under `jobs`.
#[derive(Debug, Subcommand)]
pub enum JobsCommands {
    /// Show the most recent sync jobs
    List {
        /// Maximum number of jobs to show
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Show one job with its error details
    Show {
        /// Job id
        job_id: Uuid,
    },
}

fn job_line(job: &SyncJob) -> String {
    let p = &job.progress;
    format!(
        "{}  {:<9} {:<8} {:<20} {}/{} ok, {} failed, {} skipped  {}",
        job.id,
        job.status.as_str(),
        job.kind.as_str(),
        job.supplier_id,
        p.succeeded,
        p.total,
        p.failed,
        p.skipped,
        job.started_at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// # Errors
///
/// Returns an error if the query fails or the job does not exist.
pub(crate) async fn run_jobs(
    pool: sqlx::PgPool,
    user: Uuid,
    command: JobsCommands,
) -> anyhow::Result<()> {
    match command {
        JobsCommands::List { limit } => {
            let jobs = dropsync_db::list_sync_jobs(&pool, user, limit).await?;
            if jobs.is_empty() {
                println!("no sync jobs");
            }
            for job in &jobs {
                println!("{}", job_line(job));
            }
        }
        JobsCommands::Show { job_id } => {
            let job = dropsync_db::get_sync_job(&pool, user, job_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("sync job {job_id} not found"))?;
            println!("{}", job_line(&job));
            println!(
                "  supplier {} ({}, {})",
                job.supplier_name, job.supplier_id, job.connector
            );
            if let Some(done) = job.completed_at {
                let secs = (done - job.started_at).num_seconds();
                println!(
                    "  finished {} after {secs}s",
                    done.format("%Y-%m-%d %H:%M:%S")
                );
            }
            for detail in &job.error_details {
                println!("  error: {detail}");
            }
        }
    }
    Ok(())
}
