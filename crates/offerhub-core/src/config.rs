use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if any env var value fails to parse.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files; useful for
/// testing or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if any env var value fails to parse.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup instead of
/// `set_var`/`remove_var`.
///
/// Every variable has a default matching the documented behavior of the
/// pipeline, so an empty environment yields a fully working configuration.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    use rust_decimal::Decimal;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_decimal = |var: &str, default: &str| -> Result<Decimal, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<Decimal>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let env = parse_environment(&or_default("OFFERHUB_ENV", "development"));

    let bind_addr = parse_addr("OFFERHUB_BIND_ADDR", "0.0.0.0:8080")?;
    let log_level = or_default("OFFERHUB_LOG_LEVEL", "info");
    let vendors_path = PathBuf::from(or_default("OFFERHUB_VENDORS_PATH", "./config/vendors.yaml"));
    let user_agent = or_default("OFFERHUB_USER_AGENT", "offerhub/0.1 (+vendor-aggregation)");

    let vendor_timeout_secs = parse_u64("OFFERHUB_VENDOR_TIMEOUT_SECS", "2")?;
    let max_retries = parse_u32("OFFERHUB_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("OFFERHUB_RETRY_BACKOFF_BASE_MS", "100")?;

    let freshness_window_secs = parse_u64("OFFERHUB_FRESHNESS_WINDOW_SECS", "600")?;
    let price_premium_threshold = parse_decimal("OFFERHUB_PRICE_PREMIUM_THRESHOLD", "0.10")?;

    let circuit_failure_threshold = parse_u32("OFFERHUB_CIRCUIT_FAILURE_THRESHOLD", "3")?;
    let circuit_cooldown_secs = parse_u64("OFFERHUB_CIRCUIT_COOLDOWN_SECS", "30")?;

    let cache_ttl_secs = parse_u64("OFFERHUB_CACHE_TTL_SECS", "120")?;
    let circuit_state_ttl_secs = parse_u64("OFFERHUB_CIRCUIT_STATE_TTL_SECS", "3600")?;
    let perf_stats_ttl_secs = parse_u64("OFFERHUB_PERF_STATS_TTL_SECS", "86400")?;
    let popularity_ttl_secs = parse_u64("OFFERHUB_POPULARITY_TTL_SECS", "86400")?;

    let rate_limit_requests = parse_u32("OFFERHUB_RATE_LIMIT_REQUESTS", "60")?;
    let rate_limit_window_secs = parse_u64("OFFERHUB_RATE_LIMIT_WINDOW_SECS", "60")?;

    let prewarm_top_n = parse_usize("OFFERHUB_PREWARM_TOP_N", "10")?;
    let prewarm_cron = or_default("OFFERHUB_PREWARM_CRON", "0 */5 * * * *");
    let perf_log_cron = or_default("OFFERHUB_PERF_LOG_CRON", "0 */5 * * * *");
    let store_sweep_cron = or_default("OFFERHUB_STORE_SWEEP_CRON", "0 * * * * *");
    let default_popular_skus = parse_sku_list(&or_default(
        "OFFERHUB_DEFAULT_POPULAR_SKUS",
        "ABC123,XYZ789,DEF456,GHI012,JKL345",
    ));

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        vendors_path,
        user_agent,
        vendor_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
        freshness_window_secs,
        price_premium_threshold,
        circuit_failure_threshold,
        circuit_cooldown_secs,
        cache_ttl_secs,
        circuit_state_ttl_secs,
        perf_stats_ttl_secs,
        popularity_ttl_secs,
        rate_limit_requests,
        rate_limit_window_secs,
        prewarm_top_n,
        prewarm_cron,
        perf_log_cron,
        store_sweep_cron,
        default_popular_skus,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

/// Split a comma-separated SKU list, dropping empty segments and surrounding
/// whitespace.
fn parse_sku_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
