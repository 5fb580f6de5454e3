//! Scripted CLI used by the integration tests.

#![allow(dead_code)]

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cli_chat_gateway::cli::{ChildProcess, CliCommand, CliInvoker, Launcher, ProcessOutput};
use cli_chat_gateway::config::{
    AppConfig, CliConfig, ResilienceConfig, SecurityConfig, ServerConfig, StreamConfig,
};
use cli_chat_gateway::gateway::Gateway;
use cli_chat_gateway::prompt::ModelMapper;
use cli_chat_gateway::prompt::models::DEFAULT_CLI_MODEL;

/// What a scripted process does once launched.
#[derive(Debug, Clone)]
pub enum Step {
    Exit(ProcessOutput),
    /// Never exits on its own.
    Hang,
    /// The program does not exist.
    Missing,
}

pub fn ok(stdout: &str) -> Step {
    Step::Exit(ProcessOutput {
        success: true,
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    })
}

pub fn fail(code: i32, stderr: &str) -> Step {
    Step::Exit(ProcessOutput {
        success: false,
        code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    })
}

type Script = dyn Fn(&str, &[String]) -> Step + Send + Sync;

pub struct ScriptedLauncher {
    script: Box<Script>,
    calls: Mutex<Vec<Vec<String>>>,
    kills: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
}

impl fmt::Debug for ScriptedLauncher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedLauncher")
            .field("kills", &self.kills)
            .field("drops", &self.drops)
            .finish()
    }
}

impl ScriptedLauncher {
    pub fn new(script: impl Fn(&str, &[String]) -> Step + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
            kills: Arc::new(AtomicUsize::new(0)),
            drops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A logged-in `claude` whose completions behave like `completion`.
    pub fn logged_in(completion: Step) -> Self {
        Self::new(move |program, args| {
            if program != "claude" {
                return Step::Missing;
            }
            match args.first().map(String::as_str) {
                Some("--version") => ok("1.0.0 (Claude Code)\n"),
                Some("auth") => ok("dev@example.com\n"),
                _ => completion.clone(),
            }
        })
    }

    /// Every launch as `[program, args...]`.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Completion launches only (those carrying `--print`).
    pub fn completion_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|call| call.iter().any(|a| a == "--print"))
            .collect()
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    /// Children released without an explicit kill: finished runs and cancelled requests.
    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

impl Launcher for ScriptedLauncher {
    fn launch(
        &self,
        program: &str,
        args: &[String],
        _cwd: Option<&Path>,
    ) -> io::Result<Box<dyn ChildProcess>> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().cloned());
        self.calls.lock().unwrap().push(call);

        match (self.script)(program, args) {
            Step::Missing => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{program}: command not found"),
            )),
            step => Ok(Box::new(ScriptedChild {
                step,
                kills: Arc::clone(&self.kills),
                drops: Arc::clone(&self.drops),
                killed: false,
            })),
        }
    }
}

struct ScriptedChild {
    step: Step,
    kills: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
    killed: bool,
}

impl Drop for ScriptedChild {
    fn drop(&mut self) {
        if !self.killed {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl ChildProcess for ScriptedChild {
    async fn wait_with_output(&mut self) -> io::Result<ProcessOutput> {
        match &self.step {
            Step::Exit(output) => Ok(output.clone()),
            _ => std::future::pending().await,
        }
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.killed = true;
        self.kills.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn test_config(api_keys: &[&str]) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        security: SecurityConfig {
            api_keys: api_keys.iter().map(ToString::to_string).collect(),
        },
        cli: CliConfig {
            timeout_secs: 60,
            default_model: DEFAULT_CLI_MODEL.to_string(),
            command: None,
        },
        stream: StreamConfig { frame_delay_ms: 0 },
        resilience: ResilienceConfig {
            rate_limit_enabled: false,
            requests: 100,
            window_secs: 60,
        },
    }
}

/// Gateway bound to `claude` through `launcher`, without startup probes.
pub fn gateway(launcher: Arc<ScriptedLauncher>, timeout: Duration) -> Gateway {
    let command = CliCommand::parse("claude").unwrap();
    let invoker = CliInvoker::new(command, timeout, std::env::temp_dir(), launcher);
    Gateway::new(invoker, ModelMapper::new(DEFAULT_CLI_MODEL), Duration::ZERO)
}
