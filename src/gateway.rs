//! The request pipeline, wired once at startup.
//!
//! [`Gateway`] owns everything a request needs (the bound CLI invoker, the
//! model mapping, the streaming cadence) and is shared read-only across
//! handlers through `Arc`.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tracing::info;

use crate::cli::{self, CliError, CliInvoker, HealthReport, Launcher};
use crate::completion;
use crate::config::AppConfig;
use crate::openai::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::prompt::{ModelMapper, apply_temperature, build_prompt};

/// Prompt and CLI model derived from one request.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPrompt {
    pub prompt: String,
    pub model: String,
}

#[derive(Debug)]
pub struct Gateway {
    invoker: CliInvoker,
    models: ModelMapper,
    frame_delay: Duration,
}

impl Gateway {
    pub fn new(invoker: CliInvoker, models: ModelMapper, frame_delay: Duration) -> Self {
        Self {
            invoker,
            models,
            frame_delay,
        }
    }

    /// Discover the CLI, check its login, and build the gateway.
    ///
    /// Fails only if no CLI candidate works.
    pub async fn initialize(
        config: &AppConfig,
        launcher: Arc<dyn Launcher>,
        workdir: &Path,
    ) -> Result<Self, CliError> {
        let candidates = cli::discovery::candidates(config.cli.command.as_deref());
        let command = cli::discovery::discover(launcher.as_ref(), &candidates).await?;
        cli::discovery::verify_authentication(launcher.as_ref(), &command).await;

        let invoker = CliInvoker::new(
            command,
            Duration::from_secs(config.cli.timeout_secs),
            workdir,
            launcher,
        );

        Ok(Self::new(
            invoker,
            ModelMapper::new(config.cli.default_model.clone()),
            Duration::from_millis(config.stream.frame_delay_ms),
        ))
    }

    /// Flatten the messages, apply the temperature hint, and map the model.
    pub fn prepare(&self, request: &ChatCompletionRequest) -> PreparedPrompt {
        let prompt = apply_temperature(build_prompt(&request.messages), request.temperature());
        PreparedPrompt {
            prompt,
            model: self.models.map(&request.model).to_string(),
        }
    }

    /// Run one non-streaming completion.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, CliError> {
        let PreparedPrompt { prompt, model } = self.prepare(request);
        info!(
            name: "completion.started",
            model = %model,
            prompt_length = prompt.len(),
            "Processing request"
        );

        let started = Instant::now();
        let result = self.invoker.invoke(&prompt, &model).await;
        metrics::histogram!("gateway_completion_seconds").record(started.elapsed().as_secs_f64());

        match result {
            Ok(content) => {
                let response = completion::assemble(&request.model, &prompt, content);
                metrics::counter!("gateway_completions_total", "outcome" => "success").increment(1);
                info!(
                    name: "completion.finished",
                    total_tokens = response.usage.total_tokens,
                    "Completion successful"
                );
                Ok(response)
            }
            Err(e) => {
                metrics::counter!("gateway_completions_total", "outcome" => e.kind()).increment(1);
                Err(e)
            }
        }
    }

    /// Probe the CLI for the health endpoint.
    pub async fn health(&self) -> HealthReport {
        cli::health::probe(&self.invoker).await
    }

    pub fn models(&self) -> &ModelMapper {
        &self.models
    }

    pub fn invoker(&self) -> &CliInvoker {
        &self.invoker
    }

    /// Delay between simulated stream frames.
    pub fn frame_delay(&self) -> Duration {
        self.frame_delay
    }
}

/// Scratch directory used as the CLI's working directory.
///
/// The caller owns the returned guard and should `close()` it on shutdown.
pub fn scratch_dir() -> io::Result<TempDir> {
    tempfile::Builder::new().prefix("cli-chat-gateway-").tempdir()
}
