//! OpenAI-compatible chat completions backed by a local AI CLI.
//!
//! Every request is flattened into one prompt, handed to the CLI as a
//! subprocess, and the trimmed stdout is wrapped in an OpenAI-shaped
//! response. Streaming is emulated by replaying the finished answer as
//! SSE chunks.
//!
//! # Modules
//!
//! - [`prompt`]: message flattening, model mapping, temperature hints
//! - [`cli`]: discovery, identity, invocation and failure classification
//! - [`completion`]: response assembly and token estimates
//! - [`stream`]: SSE chunk replay
//! - [`gateway`]: the request pipeline shared by handlers
//! - [`openai`]: wire types and `/v1` handlers
//! - [`server`]: router, health, metrics and graceful shutdown

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod cli;
pub mod completion;
pub mod config;
pub mod gateway;
pub mod openai;
pub mod prompt;
pub mod security;
pub mod server;
pub mod stream;
pub mod telemetry;

use crate::config::AppConfig;
use crate::gateway::Gateway;
use crate::security::rate_limit::SimpleRateLimiter;

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Request pipeline bound to the discovered CLI.
    pub gateway: Arc<Gateway>,
    /// Global Rate Limiter
    pub rate_limiter: Arc<SimpleRateLimiter>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
    /// Prometheus recorder handle, absent when no recorder was installed.
    pub metrics: Option<PrometheusHandle>,
    /// Process start, reported as uptime on `/metrics`.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        gateway: Arc<Gateway>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            gateway,
            rate_limiter: Arc::new(SimpleRateLimiter::from_config(&config.resilience)),
            config,
            metrics,
            started_at: Instant::now(),
        }
    }
}
