use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Upper bound on the per-run worker pool.
pub const MAX_SYNC_WORKERS: usize = 16;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("DROPSYNC_ENV", "development"))?;

    let bind_addr = parse_addr("DROPSYNC_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("DROPSYNC_LOG_LEVEL", "info");
    let suppliers_path = PathBuf::from(or_default(
        "DROPSYNC_SUPPLIERS_PATH",
        "./config/suppliers.yaml",
    ));

    let db_max_connections = parse_u32("DROPSYNC_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("DROPSYNC_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("DROPSYNC_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let adapter_request_timeout_secs = parse_u64("DROPSYNC_ADAPTER_REQUEST_TIMEOUT_SECS", "30")?;
    let adapter_user_agent = or_default(
        "DROPSYNC_ADAPTER_USER_AGENT",
        "dropsync/0.1 (catalog-sync)",
    );
    let adapter_inter_page_delay_ms = parse_u64("DROPSYNC_ADAPTER_INTER_PAGE_DELAY_MS", "250")?;
    let adapter_max_retries = parse_u32("DROPSYNC_ADAPTER_MAX_RETRIES", "3")?;
    let adapter_retry_backoff_base_secs =
        parse_u64("DROPSYNC_ADAPTER_RETRY_BACKOFF_BASE_SECS", "2")?;

    let sync_workers = parse_usize("DROPSYNC_SYNC_WORKERS", "4")?.clamp(1, MAX_SYNC_WORKERS);
    let sync_progress_batch = parse_usize("DROPSYNC_SYNC_PROGRESS_BATCH", "25")?;
    if sync_progress_batch == 0 {
        return Err(invalid(
            "DROPSYNC_SYNC_PROGRESS_BATCH",
            "must be at least 1".to_string(),
        ));
    }
    let sync_error_detail_cap = parse_usize("DROPSYNC_SYNC_ERROR_DETAIL_CAP", "50")?;
    let sync_timeout_secs = parse_u64("DROPSYNC_SYNC_TIMEOUT_SECS", "900")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        suppliers_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        adapter_request_timeout_secs,
        adapter_user_agent,
        adapter_inter_page_delay_ms,
        adapter_max_retries,
        adapter_retry_backoff_base_secs,
        sync_workers,
        sync_progress_batch,
        sync_error_detail_cap,
        sync_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "DROPSYNC_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
