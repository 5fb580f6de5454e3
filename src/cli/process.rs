//! Child process launching.
//!
//! [`Launcher`] is the seam between the gateway and the operating system: the
//! production [`TokioLauncher`] spawns real processes, tests substitute a
//! scripted one. Every run goes through [`run`], which owns the timeout and
//! kills the child when it expires.

use std::fmt;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use super::error::CliError;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// A spawned process that can be awaited or killed.
#[async_trait]
pub trait ChildProcess: Send {
    /// Wait for exit while draining stdout and stderr.
    ///
    /// Must be cancel-safe with respect to [`ChildProcess::kill`]: dropping the
    /// returned future leaves the process killable.
    async fn wait_with_output(&mut self) -> io::Result<ProcessOutput>;

    /// Terminate the process and reap it.
    async fn kill(&mut self) -> io::Result<()>;
}

/// Spawns child processes.
pub trait Launcher: Send + Sync + fmt::Debug {
    fn launch(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> io::Result<Box<dyn ChildProcess>>;
}

/// Launcher backed by `tokio::process`.
///
/// On unix each child leads its own process group, and killing it signals
/// the whole group, so wrappers such as `npx` do not leave the real CLI
/// behind. Children are also spawned with `kill_on_drop`, and dropping a
/// running child signals its group, so a request future that is dropped
/// mid-run (client disconnect, server shutdown) takes its processes down
/// with it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioLauncher;

impl Launcher for TokioLauncher {
    fn launch(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> io::Result<Box<dyn ChildProcess>> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        Ok(Box::new(TokioChild {
            child,
            stdout,
            stderr,
        }))
    }
}

struct TokioChild {
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl TokioChild {
    /// SIGKILL the child's process group. No-op once the child has been reaped.
    #[cfg(unix)]
    fn kill_group(&self) {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        let Some(pgid) = self.child.id().and_then(|id| i32::try_from(id).ok()) else {
            return;
        };
        if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            tracing::debug!(pgid, error = %e, "Failed to signal CLI process group");
        }
    }
}

#[cfg(unix)]
impl Drop for TokioChild {
    fn drop(&mut self) {
        self.kill_group();
    }
}

#[async_trait]
impl ChildProcess for TokioChild {
    async fn wait_with_output(&mut self) -> io::Result<ProcessOutput> {
        let stdout = self.stdout.take();
        let stderr = self.stderr.take();

        let mut out = Vec::new();
        let mut err = Vec::new();

        let read_out = async {
            if let Some(mut pipe) = stdout {
                pipe.read_to_end(&mut out).await?;
            }
            Ok::<_, io::Error>(())
        };
        let read_err = async {
            if let Some(mut pipe) = stderr {
                pipe.read_to_end(&mut err).await?;
            }
            Ok::<_, io::Error>(())
        };

        let (status, read_out, read_err) = tokio::join!(self.child.wait(), read_out, read_err);
        let status = status?;
        read_out?;
        read_err?;

        Ok(ProcessOutput {
            success: status.success(),
            code: status.code(),
            stdout: String::from_utf8_lossy(&out).into_owned(),
            stderr: String::from_utf8_lossy(&err).into_owned(),
        })
    }

    async fn kill(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        self.kill_group();
        self.child.kill().await
    }
}

/// Run `program args...` to completion, killing it if `timeout` elapses.
pub async fn run(
    launcher: &dyn Launcher,
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<ProcessOutput, CliError> {
    let mut child = launcher.launch(program, args, cwd)?;

    let waited = tokio::time::timeout(timeout, child.wait_with_output()).await;
    match waited {
        Ok(output) => Ok(output?),
        Err(_) => {
            if let Err(e) = child.kill().await {
                tracing::warn!(
                    name: "cli.kill.failed",
                    program = %program,
                    error = %e,
                    "Failed to kill timed out CLI process"
                );
            }
            Err(CliError::InvocationTimeout { timeout })
        }
    }
}
