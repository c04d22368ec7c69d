use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use offerhub_core::{CircuitPhase, CircuitState};
use offerhub_store::{keys, KeyValueStore};
use tokio::sync::Mutex;

use crate::error::VendorError;

/// Breaker tunables, all driven by configuration rather than literals.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    failure_threshold: u32,
    cooldown: chrono::Duration,
    state_ttl: chrono::Duration,
    store_ttl: Duration,
}

impl CircuitBreakerConfig {
    #[must_use]
    pub fn new(failure_threshold: u32, cooldown: Duration, state_ttl: Duration) -> Self {
        CircuitBreakerConfig {
            failure_threshold,
            cooldown: chrono::Duration::from_std(cooldown).unwrap_or(chrono::Duration::MAX),
            state_ttl: chrono::Duration::from_std(state_ttl).unwrap_or(chrono::Duration::MAX),
            store_ttl: state_ttl,
        }
    }

    #[must_use]
    pub fn from_secs(failure_threshold: u32, cooldown_secs: u64, state_ttl_secs: u64) -> Self {
        CircuitBreakerConfig::new(
            failure_threshold,
            Duration::from_secs(cooldown_secs),
            Duration::from_secs(state_ttl_secs),
        )
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        CircuitBreakerConfig::from_secs(3, 30, 3600)
    }
}

/// Per-vendor failure isolation over closed, open, and half-open phases.
///
/// The state behind the mutex is authoritative; the persisted
/// `circuit:{vendor}` record is a write-through mirror kept for the admin
/// surface and for anyone inspecting the store directly. A record whose last
/// failure is older than the state TTL reads as fresh closed, matching the
/// mirror's expiry.
pub struct CircuitBreaker {
    vendor_id: String,
    config: CircuitBreakerConfig,
    state: Mutex<CircuitState>,
    store: Arc<dyn KeyValueStore>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(
        vendor_id: &str,
        config: CircuitBreakerConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        CircuitBreaker {
            vendor_id: vendor_id.to_string(),
            config,
            state: Mutex::new(CircuitState::fresh(vendor_id)),
            store,
        }
    }

    #[must_use]
    pub fn vendor_id(&self) -> &str {
        &self.vendor_id
    }

    /// Run `operation` if the circuit admits it, recording the outcome.
    ///
    /// # Errors
    ///
    /// [`VendorError::CircuitOpen`] when the call is short-circuited without
    /// touching the vendor; otherwise whatever `operation` returns.
    pub async fn call<T, F, Fut>(&self, operation: F) -> Result<T, VendorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, VendorError>>,
    {
        if !self.admit(Utc::now()).await {
            return Err(VendorError::CircuitOpen {
                vendor_id: self.vendor_id.clone(),
            });
        }
        let result = operation().await;
        match &result {
            Ok(_) => self.on_success().await,
            Err(_) => self.on_failure(Utc::now()).await,
        }
        result
    }

    /// Current state as reported outward, stale records reading as fresh.
    pub async fn snapshot(&self) -> CircuitState {
        let mut state = self.state.lock().await;
        self.reset_if_stale(&mut state, Utc::now());
        state.clone()
    }

    /// Decide whether a call may proceed. An open circuit whose cooldown has
    /// elapsed grants exactly one half-open probe; `reopen_at` is re-armed at
    /// that moment so a probe that never reports back cannot wedge the
    /// breaker.
    async fn admit(&self, now: DateTime<Utc>) -> bool {
        let mirror = {
            let mut state = self.state.lock().await;
            self.reset_if_stale(&mut state, now);
            match state.state {
                CircuitPhase::Closed => return true,
                CircuitPhase::Open | CircuitPhase::HalfOpen => {
                    if state.reopen_at.is_some_and(|reopen_at| now < reopen_at) {
                        return false;
                    }
                    state.state = CircuitPhase::HalfOpen;
                    state.reopen_at = Some(self.reopen_deadline(now));
                    tracing::info!(
                        vendor_id = %self.vendor_id,
                        "circuit half-open; granting probe call"
                    );
                    state.clone()
                }
            }
        };
        self.persist(&mirror).await;
        true
    }

    async fn on_success(&self) {
        let mirror = {
            let mut state = self.state.lock().await;
            if state.state == CircuitPhase::Closed && state.consecutive_failures == 0 {
                return;
            }
            tracing::info!(
                vendor_id = %self.vendor_id,
                from = %state.state,
                "circuit closed after successful call"
            );
            *state = CircuitState::fresh(&self.vendor_id);
            state.clone()
        };
        self.persist(&mirror).await;
    }

    async fn on_failure(&self, now: DateTime<Utc>) {
        let mirror = {
            let mut state = self.state.lock().await;
            state.consecutive_failures += 1;
            state.last_failure_at = Some(now);
            if state.consecutive_failures >= self.config.failure_threshold {
                if state.state != CircuitPhase::Open {
                    tracing::warn!(
                        vendor_id = %self.vendor_id,
                        consecutive_failures = state.consecutive_failures,
                        cooldown_secs = self.config.cooldown.num_seconds(),
                        "circuit opened"
                    );
                }
                state.state = CircuitPhase::Open;
                state.reopen_at = Some(self.reopen_deadline(now));
            }
            state.clone()
        };
        self.persist(&mirror).await;
    }

    fn reset_if_stale(&self, state: &mut CircuitState, now: DateTime<Utc>) {
        if let Some(last_failure_at) = state.last_failure_at {
            if now.signed_duration_since(last_failure_at) > self.config.state_ttl {
                *state = CircuitState::fresh(&self.vendor_id);
            }
        }
    }

    fn reopen_deadline(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.config.cooldown)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Mirror the given state into the store. The in-process copy stays
    /// authoritative, so a store failure only costs visibility.
    async fn persist(&self, state: &CircuitState) {
        let raw = match serde_json::to_string(state) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(
                    vendor_id = %self.vendor_id,
                    error = %error,
                    "could not serialize circuit state; skipping mirror write"
                );
                return;
            }
        };
        if let Err(error) = self
            .store
            .set(&keys::circuit(&self.vendor_id), raw, self.config.store_ttl)
            .await
        {
            tracing::warn!(
                vendor_id = %self.vendor_id,
                error = %error,
                "could not mirror circuit state; continuing in-process"
            );
        }
    }
}
