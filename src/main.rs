//! CLI chat gateway server
//!
//! Entry point: load configuration, bind the CLI, serve the OpenAI API.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use cli_chat_gateway::cli::{CliError, TokioLauncher};
use cli_chat_gateway::config::AppConfig;
use cli_chat_gateway::gateway::{Gateway, scratch_dir};
use cli_chat_gateway::{server, telemetry};
use dotenvy::dotenv;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    telemetry::init();

    let config = Arc::new(AppConfig::load().context("Failed to load configuration")?);
    info!(
        name: "config.loaded",
        host = %config.server.host,
        port = config.server.port,
        default_model = %config.cli.default_model,
        timeout_secs = config.cli.timeout_secs,
        "Configuration loaded"
    );

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics recorder unavailable: {e}");
            None
        }
    };

    let scratch = scratch_dir().context("Failed to create scratch directory")?;

    let gateway = match Gateway::initialize(&config, Arc::new(TokioLauncher), scratch.path()).await
    {
        Ok(gateway) => Arc::new(gateway),
        Err(e @ CliError::ExecutableNotFound { .. }) => {
            error!(name: "cli.missing", "{e}");
            error!("Install the CLI: npm install -g @anthropic-ai/claude-code");
            error!("Then log in once: claude auth login");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    server::start_server(Arc::clone(&config), gateway, metrics).await?;

    scratch
        .close()
        .context("Failed to remove scratch directory")?;
    info!(name: "scratch.removed", "Scratch directory removed");
    Ok(())
}
