//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring maintenance jobs: cache prewarming, vendor performance
//! logging, and expired-key sweeping.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use offerhub_core::AppConfig;
use offerhub_engine::ProductService;
use offerhub_store::KeyValueStore;

/// Builds and starts the background job scheduler.
///
/// Registers all recurring jobs and starts the scheduler. Returns the
/// running [`JobScheduler`] handle, which must be kept alive for the
/// lifetime of the process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    config: Arc<AppConfig>,
    service: Arc<ProductService>,
    store: Arc<dyn KeyValueStore>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_prewarm_job(&scheduler, Arc::clone(&service), Arc::clone(&config)).await?;
    register_performance_log_job(&scheduler, &config.perf_log_cron, service).await?;
    register_store_sweep_job(&scheduler, &config.store_sweep_cron, store).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the periodic cache prewarm job.
///
/// Each run takes the most requested SKUs and warms any that are no longer
/// cached, so popular lookups keep answering from cache even after their
/// TTL lapses.
async fn register_prewarm_job(
    scheduler: &JobScheduler,
    service: Arc<ProductService>,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let cron = config.prewarm_cron.clone();
    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let service = Arc::clone(&service);
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting prewarm pass");
            run_prewarm(&service, &config).await;
            tracing::info!("scheduler: prewarm pass complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Register the job that logs one telemetry line per vendor.
async fn register_performance_log_job(
    scheduler: &JobScheduler,
    cron: &str,
    service: Arc<ProductService>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let service = Arc::clone(&service);
        Box::pin(async move {
            run_performance_log(&service).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Register the job that drops expired keys from the store.
async fn register_store_sweep_job(
    scheduler: &JobScheduler,
    cron: &str,
    store: Arc<dyn KeyValueStore>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let store = Arc::clone(&store);
        Box::pin(async move {
            run_store_sweep(store.as_ref()).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Warm the cache for the SKUs most worth keeping hot.
///
/// Before any popularity data exists the configured seed list stands in for
/// the ranking. Warming never counts as demand, so the job cannot feed the
/// ranking it reads from.
async fn run_prewarm(service: &ProductService, config: &AppConfig) {
    let ranked = service.top_skus(config.prewarm_top_n).await;
    let skus = if ranked.is_empty() {
        tracing::debug!("scheduler: no popularity data yet; warming the seed list");
        config.default_popular_skus.clone()
    } else {
        ranked
    };

    let mut warmed = 0_usize;
    let mut skipped = 0_usize;
    for sku in &skus {
        if service.prewarm_sku(sku).await {
            warmed += 1;
        } else {
            skipped += 1;
        }
    }

    tracing::info!(warmed, skipped, "scheduler: prewarm pass finished");
}

/// Emit one structured log line per roster vendor.
async fn run_performance_log(service: &ProductService) {
    let mut rows: Vec<_> = service.performance_snapshot().await.into_iter().collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    for (vendor_id, stats) in rows {
        tracing::info!(
            vendor_id = %vendor_id,
            total_calls = stats.total_calls,
            successes = stats.successes,
            failures = stats.failures,
            success_rate_percent = stats.success_rate_percent(),
            avg_latency_ms = stats.avg_latency_ms,
            "scheduler: vendor performance"
        );
    }
}

/// Drop expired entries so idle key families do not accumulate.
async fn run_store_sweep(store: &dyn KeyValueStore) {
    match store.sweep().await {
        Ok(removed) if removed > 0 => {
            tracing::info!(removed, "scheduler: store sweep dropped expired keys");
        }
        Ok(_) => {}
        Err(error) => {
            tracing::warn!(error = %error, "scheduler: store sweep failed");
        }
    }
}
