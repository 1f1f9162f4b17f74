use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub suppliers_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub adapter_request_timeout_secs: u64,
    pub adapter_user_agent: String,
    pub adapter_inter_page_delay_ms: u64,
    pub adapter_max_retries: u32,
    pub adapter_retry_backoff_base_secs: u64,
    /// Bounded worker pool size for per-record processing, always within `1..=16`.
    pub sync_workers: usize,
    /// Number of processed records between intermediate job-progress writes.
    pub sync_progress_batch: usize,
    /// Maximum number of per-record messages kept in a job's `error_details`.
    pub sync_error_detail_cap: usize,
    /// Wall-clock limit for a single sync run; `0` disables the limit.
    pub sync_timeout_secs: u64,
}

impl AppConfig {
    /// The run timeout as a [`Duration`], or `None` when disabled.
    #[must_use]
    pub fn sync_timeout(&self) -> Option<Duration> {
        (self.sync_timeout_secs > 0).then(|| Duration::from_secs(self.sync_timeout_secs))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("suppliers_path", &self.suppliers_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "adapter_request_timeout_secs",
                &self.adapter_request_timeout_secs,
            )
            .field("adapter_user_agent", &self.adapter_user_agent)
            .field(
                "adapter_inter_page_delay_ms",
                &self.adapter_inter_page_delay_ms,
            )
            .field("adapter_max_retries", &self.adapter_max_retries)
            .field(
                "adapter_retry_backoff_base_secs",
                &self.adapter_retry_backoff_base_secs,
            )
            .field("sync_workers", &self.sync_workers)
            .field("sync_progress_batch", &self.sync_progress_batch)
            .field("sync_error_detail_cap", &self.sync_error_detail_cap)
            .field("sync_timeout_secs", &self.sync_timeout_secs)
            .finish()
    }
}
