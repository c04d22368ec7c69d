use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Header carrying the client identity the rate limiter keys on.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: u32,
}

/// Fixed-window limiter keyed by API key, for simple per-client protection.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: u32,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, RateLimitWindow>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one request against `api_key`'s window and says whether it is
    /// still under the limit. The window restarts once its duration elapses.
    async fn admit(&self, api_key: &str) -> bool {
        let mut windows = self.windows.lock().await;
        let window = windows
            .entry(api_key.to_owned())
            .or_insert_with(|| RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            });

        if window.started_at.elapsed() >= self.window {
            window.started_at = Instant::now();
            window.count = 0;
        }

        if window.count >= self.max_requests {
            return false;
        }

        window.count += 1;
        true
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing a per-API-key request budget per window.
///
/// Requests without an `x-api-key` header are anonymous and pass through
/// uncounted; the API has no authentication, so the limiter only shapes
/// traffic from clients that identify themselves.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(api_key) = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
    else {
        return next.run(req).await;
    };

    if rate_limit.admit(&api_key).await {
        return next.run(req).await;
    }

    let req_id = req
        .extensions()
        .get::<RequestId>()
        .map_or_else(|| Uuid::new_v4().to_string(), |id| id.0.clone());
    tracing::warn!(request_id = %req_id, "rate limit exceeded");
    ApiError::new(req_id, "rate_limited", "rate limit exceeded").into_response()
}
