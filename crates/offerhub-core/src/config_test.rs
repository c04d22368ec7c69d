use std::collections::HashMap;
use std::env::VarError;

use rust_decimal::Decimal;

use super::*;
use crate::ConfigError;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn empty_env_yields_documented_defaults() {
    let map: HashMap<&str, &str> = HashMap::new();
    let config = build_app_config(lookup_from_map(&map)).unwrap();

    assert_eq!(config.env, Environment::Development);
    assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
    assert_eq!(config.log_level, "info");
    assert_eq!(config.vendors_path.to_string_lossy(), "./config/vendors.yaml");

    assert_eq!(config.vendor_timeout_secs, 2);
    assert_eq!(config.max_retries, 2);
    assert_eq!(config.retry_backoff_base_ms, 100);

    assert_eq!(config.freshness_window_secs, 600);
    assert_eq!(
        config.price_premium_threshold,
        Decimal::new(10, 2) // 0.10
    );

    assert_eq!(config.circuit_failure_threshold, 3);
    assert_eq!(config.circuit_cooldown_secs, 30);

    assert_eq!(config.cache_ttl_secs, 120);
    assert_eq!(config.circuit_state_ttl_secs, 3600);
    assert_eq!(config.perf_stats_ttl_secs, 86_400);
    assert_eq!(config.popularity_ttl_secs, 86_400);

    assert_eq!(config.rate_limit_requests, 60);
    assert_eq!(config.rate_limit_window_secs, 60);

    assert_eq!(config.prewarm_top_n, 10);
    assert_eq!(config.prewarm_cron, "0 */5 * * * *");
    assert_eq!(
        config.default_popular_skus,
        vec!["ABC123", "XYZ789", "DEF456", "GHI012", "JKL345"]
    );
}

#[test]
fn overrides_are_honored() {
    let mut map = HashMap::new();
    map.insert("OFFERHUB_ENV", "production");
    map.insert("OFFERHUB_BIND_ADDR", "127.0.0.1:9999");
    map.insert("OFFERHUB_MAX_RETRIES", "5");
    map.insert("OFFERHUB_PRICE_PREMIUM_THRESHOLD", "0.25");
    map.insert("OFFERHUB_CIRCUIT_FAILURE_THRESHOLD", "7");
    map.insert("OFFERHUB_DEFAULT_POPULAR_SKUS", "AAA111, BBB222");

    let config = build_app_config(lookup_from_map(&map)).unwrap();

    assert_eq!(config.env, Environment::Production);
    assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9999");
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.price_premium_threshold, Decimal::new(25, 2));
    assert_eq!(config.circuit_failure_threshold, 7);
    assert_eq!(config.default_popular_skus, vec!["AAA111", "BBB222"]);
}

#[test]
fn invalid_bind_addr_is_rejected() {
    let mut map = HashMap::new();
    map.insert("OFFERHUB_BIND_ADDR", "not-an-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "OFFERHUB_BIND_ADDR"),
        "expected InvalidEnvVar(OFFERHUB_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn invalid_retry_count_is_rejected() {
    let mut map = HashMap::new();
    map.insert("OFFERHUB_MAX_RETRIES", "two");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "OFFERHUB_MAX_RETRIES"),
        "expected InvalidEnvVar(OFFERHUB_MAX_RETRIES), got: {result:?}"
    );
}

#[test]
fn invalid_premium_threshold_is_rejected() {
    let mut map = HashMap::new();
    map.insert("OFFERHUB_PRICE_PREMIUM_THRESHOLD", "ten percent");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "OFFERHUB_PRICE_PREMIUM_THRESHOLD"),
        "expected InvalidEnvVar(OFFERHUB_PRICE_PREMIUM_THRESHOLD), got: {result:?}"
    );
}

#[test]
fn parse_environment_production() {
    assert_eq!(parse_environment("production"), Environment::Production);
}

#[test]
fn parse_environment_test() {
    assert_eq!(parse_environment("test"), Environment::Test);
}

#[test]
fn parse_environment_unknown_defaults_to_development() {
    assert_eq!(parse_environment("staging"), Environment::Development);
}

#[test]
fn sku_list_drops_empty_segments() {
    assert_eq!(
        parse_sku_list("ABC123,, DEF456 ,"),
        vec!["ABC123", "DEF456"]
    );
}

#[test]
fn sku_list_of_empty_string_is_empty() {
    assert!(parse_sku_list("").is_empty());
}
