//! CLI failure taxonomy and stderr classification.

use std::time::Duration;

use super::process::ProcessOutput;

/// Errors that can occur while running the CLI.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// No candidate command answered `--version`. Fatal at startup.
    #[error("CLI executable not found (tried: {tried}). Install it with: npm install -g @anthropic-ai/claude-code")]
    ExecutableNotFound { tried: String },

    /// The CLI reported missing credentials.
    #[error("CLI not authenticated. Please run: claude auth login")]
    AuthenticationFailure,

    /// The CLI rejected the model or the account cannot use it.
    #[error("Invalid model or model access error: {0}")]
    ModelFailure(String),

    /// The CLI did not finish within the configured timeout.
    #[error("CLI timed out after {timeout:?}")]
    InvocationTimeout { timeout: Duration },

    /// Zero exit status but nothing on stdout.
    #[error("Empty response from CLI")]
    EmptyResponse,

    /// Any other non-zero exit, with the raw stderr.
    #[error("CLI failed: {0}")]
    GenericExecutionFailure(String),

    /// The process could not be spawned or its pipes could not be read.
    #[error("Failed to run CLI: {0}")]
    Spawn(#[from] std::io::Error),
}

impl CliError {
    /// Short stable label, used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExecutableNotFound { .. } => "executable_not_found",
            Self::AuthenticationFailure => "authentication",
            Self::ModelFailure(_) => "model",
            Self::InvocationTimeout { .. } => "timeout",
            Self::EmptyResponse => "empty_response",
            Self::GenericExecutionFailure(_) => "execution",
            Self::Spawn(_) => "spawn",
        }
    }
}

/// Classify the stderr of a failed run.
pub fn classify_stderr(stderr: &str) -> CliError {
    let stderr = stderr.trim();
    let lower = stderr.to_lowercase();

    if lower.contains("not authenticated") {
        CliError::AuthenticationFailure
    } else if lower.contains("model") {
        CliError::ModelFailure(stderr.to_string())
    } else {
        CliError::GenericExecutionFailure(stderr.to_string())
    }
}

/// Turn a finished run into the completion text or a classified failure.
pub fn classify(output: &ProcessOutput) -> Result<String, CliError> {
    if !output.success {
        return Err(classify_stderr(&output.stderr));
    }

    let text = output.stdout.trim();
    if text.is_empty() {
        return Err(CliError::EmptyResponse);
    }
    Ok(text.to_string())
}
