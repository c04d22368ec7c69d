mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use offerhub_core::{load_app_config, load_roster};
use offerhub_engine::ProductService;
use offerhub_store::{
    KeyValueStore, MemoryStore, PerformanceTracker, PopularityTracker, ResultCache,
};
use offerhub_vendors::{
    build_http_client, CircuitBreaker, CircuitBreakerConfig, FanOutAggregator, HttpTransport,
    RetryPolicy, VendorPipeline,
};

use crate::{api::AppState, middleware::RateLimitState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let roster = load_roster(&config.vendors_path)?;
    tracing::info!(
        env = %config.env,
        vendors = roster.vendors.len(),
        addr = %config.bind_addr,
        "starting offerhub"
    );

    let client = build_http_client(
        Duration::from_secs(config.vendor_timeout_secs),
        &config.user_agent,
    )?;
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

    let retry = RetryPolicy {
        max_retries: config.max_retries,
        backoff_base_ms: config.retry_backoff_base_ms,
    };
    let breaker_config = CircuitBreakerConfig::new(
        config.circuit_failure_threshold,
        Duration::from_secs(config.circuit_cooldown_secs),
        Duration::from_secs(config.circuit_state_ttl_secs),
    );
    let perf = PerformanceTracker::new(
        Arc::clone(&store),
        Duration::from_secs(config.perf_stats_ttl_secs),
    );

    let pipelines = roster
        .vendors
        .iter()
        .map(|vendor| {
            VendorPipeline::new(
                vendor.clone(),
                Arc::new(HttpTransport::new(client.clone(), &vendor.base_url)),
                CircuitBreaker::new(&vendor.id, breaker_config, Arc::clone(&store)),
                retry,
                perf.clone(),
            )
        })
        .collect();
    let aggregator =
        FanOutAggregator::new(pipelines, Duration::from_secs(config.freshness_window_secs));

    let cache = ResultCache::new(Arc::clone(&store), Duration::from_secs(config.cache_ttl_secs));
    let popularity = PopularityTracker::new(
        Arc::clone(&store),
        Duration::from_secs(config.popularity_ttl_secs),
    );
    let service = Arc::new(ProductService::new(
        aggregator,
        cache,
        popularity,
        perf,
        config.price_premium_threshold,
    ));

    let _scheduler =
        scheduler::build_scheduler(Arc::clone(&config), Arc::clone(&service), Arc::clone(&store))
            .await?;

    let rate_limit = RateLimitState::new(
        config.rate_limit_requests,
        Duration::from_secs(config.rate_limit_window_secs),
    );
    let state = AppState {
        service,
        vendor_count: roster.vendors.len(),
    };
    let app = api::build_app(state, rate_limit);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
