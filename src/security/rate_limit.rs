use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Mutex;
use std::time::Instant;

use crate::AppState;
use crate::config::ResilienceConfig;
use crate::openai::types::ErrorResponse;

/// Simple Token Bucket Rate Limiter
///
/// Global rather than per-client: the bucket holds `requests` tokens and
/// refills at `requests / window_secs` per second.
#[derive(Debug)]
pub struct SimpleRateLimiter {
    // (last_update, tokens)
    state: Mutex<(Instant, f32)>,
    rate_per_sec: f32,
    burst_size: f32,
}

impl SimpleRateLimiter {
    pub fn new(rate_per_sec: f32, burst_size: f32) -> Self {
        Self {
            state: Mutex::new((Instant::now(), burst_size)),
            rate_per_sec,
            burst_size,
        }
    }

    /// Limiter allowing `requests` per `window_secs`, bursting up to `requests`.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_config(config: &ResilienceConfig) -> Self {
        let window = config.window_secs.max(1) as f32;
        let burst = config.requests.max(1) as f32;
        Self::new(burst / window, burst)
    }

    pub fn check(&self) -> bool {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let (last_update, tokens) = *guard;
        let now = Instant::now();
        let elapsed = now.duration_since(last_update).as_secs_f32();

        let new_tokens = (tokens + elapsed * self.rate_per_sec).min(self.burst_size);

        if new_tokens >= 1.0 {
            *guard = (now, new_tokens - 1.0);
            true
        } else {
            // Record the refill even when denying.
            *guard = (now, new_tokens);
            false
        }
    }
}

/// Middleware to enforce rate limits
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if state.config.resilience.rate_limit_enabled && !state.rate_limiter.check() {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse::rate_limited("Rate limit exceeded")),
        )
            .into_response();
    }
    next.run(req).await
}
