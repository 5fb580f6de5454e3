//! Locating a working CLI and checking its login state.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::error::CliError;
use super::process::{self, Launcher, ProcessOutput};

/// Command forms tried in order when no command is configured.
pub const DEFAULT_CANDIDATES: &[&str] = &["claude", "claude-code", "npx @anthropic-ai/claude-code"];

/// Timeout for each `--version` probe during discovery.
pub const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the `auth whoami` probe.
pub const IDENTITY_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// A CLI invocation prefix: program plus any leading arguments
/// (`npx @anthropic-ai/claude-code` is program `npx` with one argument).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCommand {
    program: String,
    args: Vec<String>,
}

impl CliCommand {
    /// Split a whitespace-separated command line. Blank input is `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Leading arguments followed by `extra`.
    pub fn args_with<I, S>(&self, extra: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args
            .iter()
            .cloned()
            .chain(extra.into_iter().map(Into::into))
            .collect()
    }

    /// Run this command with `extra` arguments appended.
    pub async fn run<I, S>(
        &self,
        launcher: &dyn Launcher,
        extra: I,
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Result<ProcessOutput, CliError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = self.args_with(extra);
        process::run(launcher, &self.program, &args, cwd, timeout).await
    }
}

impl fmt::Display for CliCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Candidate list: the configured command first (if any), then the defaults.
pub fn candidates(configured: Option<&str>) -> Vec<CliCommand> {
    configured
        .into_iter()
        .chain(DEFAULT_CANDIDATES.iter().copied())
        .filter_map(CliCommand::parse)
        .fold(Vec::new(), |mut acc, cmd| {
            if !acc.contains(&cmd) {
                acc.push(cmd);
            }
            acc
        })
}

/// Return the first candidate that answers `--version` successfully.
pub async fn discover(
    launcher: &dyn Launcher,
    candidates: &[CliCommand],
) -> Result<CliCommand, CliError> {
    for candidate in candidates {
        match candidate
            .run(launcher, ["--version"], None, VERSION_PROBE_TIMEOUT)
            .await
        {
            Ok(output) if output.success => {
                info!(
                    name: "cli.discovered",
                    command = %candidate,
                    version = %output.stdout.trim(),
                    "Found CLI"
                );
                return Ok(candidate.clone());
            }
            Ok(output) => {
                debug!(command = %candidate, code = ?output.code, "CLI candidate exited with failure");
            }
            Err(e) => {
                debug!(command = %candidate, error = %e, "CLI candidate unavailable");
            }
        }
    }

    Err(CliError::ExecutableNotFound {
        tried: candidates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Outcome of the `auth whoami` probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated { user: String },
    Unauthenticated { reason: String },
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// Ask the CLI who it is logged in as. Never fails; problems become
/// [`Identity::Unauthenticated`].
pub async fn check_identity(launcher: &dyn Launcher, command: &CliCommand) -> Identity {
    match command
        .run(launcher, ["auth", "whoami"], None, IDENTITY_PROBE_TIMEOUT)
        .await
    {
        Ok(output) if output.success => Identity::Authenticated {
            user: output.stdout.trim().to_string(),
        },
        Ok(output) => {
            let reason = output.stderr.trim();
            Identity::Unauthenticated {
                reason: if reason.is_empty() {
                    "Authentication failed".to_string()
                } else {
                    reason.to_string()
                },
            }
        }
        Err(e) => Identity::Unauthenticated {
            reason: e.to_string(),
        },
    }
}

/// Startup identity check. Logs the result; an unauthenticated CLI only
/// degrades the service.
pub async fn verify_authentication(launcher: &dyn Launcher, command: &CliCommand) -> Identity {
    let identity = check_identity(launcher, command).await;
    match &identity {
        Identity::Authenticated { user } => {
            info!(name: "cli.authenticated", user = %user, "CLI authenticated");
        }
        Identity::Unauthenticated { reason } => {
            warn!(name: "cli.unauthenticated", reason = %reason, "CLI not authenticated");
            warn!("Starting in degraded mode; authentication errors will surface on requests");
        }
    }
    identity
}
