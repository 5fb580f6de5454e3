use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use super::discovery::CliCommand;
use super::error::{CliError, classify};
use super::process::Launcher;

/// Per-request CLI execution.
///
/// Holds the command bound at startup, the timeout, and the scratch directory
/// every run uses as its working directory. Immutable once built.
#[derive(Debug, Clone)]
pub struct CliInvoker {
    command: CliCommand,
    timeout: Duration,
    workdir: PathBuf,
    launcher: Arc<dyn Launcher>,
}

impl CliInvoker {
    pub fn new(
        command: CliCommand,
        timeout: Duration,
        workdir: impl Into<PathBuf>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        Self {
            command,
            timeout,
            workdir: workdir.into(),
            launcher,
        }
    }

    /// Arguments for one non-interactive completion; the prompt goes last.
    pub fn completion_args(model: &str, prompt: &str) -> [String; 4] {
        [
            "--print".to_string(),
            "--model".to_string(),
            model.to_string(),
            prompt.to_string(),
        ]
    }

    /// Run the CLI on `prompt` with `model` and return its trimmed stdout.
    pub async fn invoke(&self, prompt: &str, model: &str) -> Result<String, CliError> {
        debug!(model = %model, prompt_length = prompt.len(), "Executing CLI command");
        let started = Instant::now();

        let output = self
            .command
            .run(
                self.launcher.as_ref(),
                Self::completion_args(model, prompt),
                Some(&self.workdir),
                self.timeout,
            )
            .await;

        let result = output.and_then(|output| {
            if !output.success {
                error!(
                    name: "cli.failed",
                    code = ?output.code,
                    stderr = %output.stderr.trim(),
                    "CLI exited with failure"
                );
            }
            classify(&output)
        });

        match &result {
            Ok(text) => debug!(
                response_length = text.len(),
                elapsed_ms = started.elapsed().as_millis(),
                "CLI response received"
            ),
            Err(e) => error!(
                name: "cli.invocation.error",
                kind = e.kind(),
                error = %e,
                "CLI invocation failed"
            ),
        }

        result
    }

    pub fn command(&self) -> &CliCommand {
        &self.command
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn launcher(&self) -> &dyn Launcher {
        self.launcher.as_ref()
    }
}
