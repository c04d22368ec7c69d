use std::net::SocketAddr;
use std::path::PathBuf;

use rust_decimal::Decimal;

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

/// Process-wide configuration, assembled from environment variables by
/// [`crate::config::load_app_config`]. Spec'd defaults live there; nothing in
/// the pipeline hardcodes a tunable.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// YAML vendor roster location.
    pub vendors_path: PathBuf,
    pub user_agent: String,

    /// Per-attempt vendor call timeout, enforced by the HTTP client.
    pub vendor_timeout_secs: u64,
    /// Retries after the first attempt, so `max_retries + 1` attempts total.
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,

    /// Maximum age of vendor data still considered valid for selection.
    pub freshness_window_secs: u64,
    /// Relative price premium a higher-stock offer must exceed to win,
    /// e.g. `0.10` for 10%.
    pub price_premium_threshold: Decimal,

    pub circuit_failure_threshold: u32,
    pub circuit_cooldown_secs: u64,

    pub cache_ttl_secs: u64,
    pub circuit_state_ttl_secs: u64,
    pub perf_stats_ttl_secs: u64,
    pub popularity_ttl_secs: u64,

    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,

    pub prewarm_top_n: usize,
    pub prewarm_cron: String,
    pub perf_log_cron: String,
    pub store_sweep_cron: String,
    /// Seed SKUs the prewarm job warms before any popularity data exists.
    pub default_popular_skus: Vec<String>,
}
