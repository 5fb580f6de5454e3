use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::cli::CliStatus;
use crate::config::AppConfig;
use crate::gateway::Gateway;
use crate::openai::{routes, types::ErrorResponse};
use crate::security::{auth::api_key_middleware, rate_limit::rate_limit_middleware};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the application router.
///
/// `/v1/*` sits behind the API-key guard; `/`, `/health` and `/metrics` are
/// open. Everything passes the rate limiter.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/v1/models", get(routes::list_models))
        .route("/v1/models/{model_id}", get(routes::get_model))
        .route("/v1/chat/completions", post(routes::chat_completions))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .merge(api)
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Axum server and serve until Ctrl-C / SIGTERM.
pub async fn start_server(
    config: Arc<AppConfig>,
    gateway: Arc<Gateway>,
    metrics: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    let state = AppState::new(Arc::clone(&config), gateway, metrics);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        auth_required = config.security.auth_required(),
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(name: "server.stopped", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - Liveness banner.
async fn root() -> Json<Value> {
    Json(json!({
        "message": "CLI chat gateway is running",
        "version": VERSION,
        "status": "healthy",
    }))
}

/// GET /health - Probe the CLI and report configuration.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let cli = state.gateway.health().await;
    let status = match cli.status {
        CliStatus::Healthy => "healthy",
        CliStatus::Degraded => "degraded",
        CliStatus::Unhealthy => "unhealthy",
    };

    let resilience = &state.config.resilience;
    Json(json!({
        "status": status,
        "timestamp": Utc::now().to_rfc3339(),
        "version": VERSION,
        "cli": cli,
        "config": {
            "auth_required": state.config.security.auth_required(),
            "rate_limiting": {
                "enabled": resilience.rate_limit_enabled,
                "requests": resilience.requests,
                "window": resilience.window_secs,
            }
        }
    }))
}

/// GET /metrics - Prometheus text exposition.
async fn metrics(State(state): State<AppState>) -> String {
    let healthy = state.gateway.health().await.is_healthy();

    let mut body = state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default();

    let _ = writeln!(body, "# TYPE gateway_cli_healthy gauge");
    let _ = writeln!(body, "gateway_cli_healthy {}", u8::from(healthy));
    let _ = writeln!(body, "# TYPE gateway_uptime_seconds gauge");
    let _ = writeln!(
        body,
        "gateway_uptime_seconds {}",
        state.started_at.elapsed().as_secs()
    );
    body
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::not_found(format!("Not found: {}", uri.path()))),
    )
}
