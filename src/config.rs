use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::prompt::models::DEFAULT_CLI_MODEL;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Comma-separated API keys accepted as bearer tokens
    #[arg(long, env = "VALID_API_KEYS")]
    pub api_keys: Option<String>,

    /// Seconds before a CLI invocation is killed
    #[arg(long, env = "CLAUDE_CLI_TIMEOUT")]
    pub cli_timeout: Option<u64>,

    /// Model used for unrecognized model names
    #[arg(long, env = "CLAUDE_MODEL_DEFAULT")]
    pub default_model: Option<String>,

    /// CLI command to try before the built-in candidates
    #[arg(long, env = "CLI_COMMAND")]
    pub cli_command: Option<String>,

    /// Enable rate limiting
    #[arg(long, env = "RATE_LIMIT_ENABLED")]
    pub rate_limit_enabled: Option<bool>,

    /// Requests allowed per rate-limit window
    #[arg(long, env = "RATE_LIMIT_REQUESTS")]
    pub rate_limit_requests: Option<u32>,

    /// Rate-limit window in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW")]
    pub rate_limit_window: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub cli: CliConfig,
    pub stream: StreamConfig,
    pub resilience: ResilienceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    #[serde(default)]
    pub api_keys: Vec<String>,
}

impl SecurityConfig {
    /// Bearer auth is enforced only when at least one key is configured.
    pub fn auth_required(&self) -> bool {
        !self.api_keys.is_empty()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CliConfig {
    pub timeout_secs: u64,
    pub default_model: String,
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    pub frame_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub rate_limit_enabled: bool,
    pub requests: u32,
    pub window_secs: u64,
}

/// Split a comma-separated key list, dropping blanks.
pub fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Priority: CLI flag > CLI env var > `GATEWAY_*` env > config file > defaults.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 8000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("cli.timeout_secs", 60)?
            .set_default("cli.default_model", DEFAULT_CLI_MODEL)?
            .set_default("stream.frame_delay_ms", 30)?
            .set_default("resilience.rate_limit_enabled", false)?
            .set_default("resilience.requests", 100)?
            .set_default("resilience.window_secs", 60)?;

        // Explicit file must exist; the cwd fallback is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // E.g. GATEWAY_SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("security.api_keys"),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(keys) = cli.api_keys {
            builder = builder.set_override("security.api_keys", parse_api_keys(&keys))?;
        }
        if let Some(timeout) = cli.cli_timeout {
            builder = builder.set_override("cli.timeout_secs", timeout)?;
        }
        if let Some(model) = cli.default_model {
            builder = builder.set_override("cli.default_model", model)?;
        }
        if let Some(command) = cli.cli_command {
            builder = builder.set_override("cli.command", command)?;
        }
        if let Some(enabled) = cli.rate_limit_enabled {
            builder = builder.set_override("resilience.rate_limit_enabled", enabled)?;
        }
        if let Some(requests) = cli.rate_limit_requests {
            builder = builder.set_override("resilience.requests", requests)?;
        }
        if let Some(window) = cli.rate_limit_window {
            builder = builder.set_override("resilience.window_secs", window)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}
