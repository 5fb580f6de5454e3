//! Liveness and login state of the bound CLI, for the health endpoint.

use std::time::Duration;

use serde::Serialize;

use super::discovery::{Identity, check_identity};
use super::invoker::CliInvoker;

/// Timeout for the `--version` check on each health probe.
pub const HEALTH_VERSION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CliStatus {
    /// Version and identity probes both succeeded.
    Healthy,
    /// The CLI runs but is not logged in.
    Degraded,
    /// The CLI does not run.
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: CliStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == CliStatus::Healthy
    }
}

/// Probe the CLI: `--version`, then `auth whoami`.
pub async fn probe(invoker: &CliInvoker) -> HealthReport {
    let command = invoker.command();
    let launcher = invoker.launcher();

    let version = match command
        .run(launcher, ["--version"], None, HEALTH_VERSION_TIMEOUT)
        .await
    {
        Ok(output) if output.success => output.stdout.trim().to_string(),
        Ok(_) => {
            return HealthReport {
                status: CliStatus::Unhealthy,
                authenticated: None,
                user: None,
                version: None,
                command: command.to_string(),
                error: Some("CLI not working".to_string()),
            };
        }
        Err(e) => {
            return HealthReport {
                status: CliStatus::Unhealthy,
                authenticated: None,
                user: None,
                version: None,
                command: command.to_string(),
                error: Some(e.to_string()),
            };
        }
    };

    match check_identity(launcher, command).await {
        Identity::Authenticated { user } => HealthReport {
            status: CliStatus::Healthy,
            authenticated: Some(true),
            user: Some(user),
            version: Some(version),
            command: command.to_string(),
            error: None,
        },
        Identity::Unauthenticated { reason } => HealthReport {
            status: CliStatus::Degraded,
            authenticated: Some(false),
            user: None,
            version: Some(version),
            command: command.to_string(),
            error: Some(reason),
        },
    }
}
