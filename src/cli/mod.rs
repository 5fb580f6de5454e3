//! External CLI integration.
//!
//! Text generation is delegated to a command-line tool run once per request:
//!
//! ```text
//! <command> --print --model <model> <prompt>
//! ```
//!
//! # Lifecycle
//!
//! 1. [`discovery::discover`] probes the candidate commands with `--version`
//!    at startup and binds the first that works. None working is fatal.
//! 2. [`discovery::verify_authentication`] runs `auth whoami`; failure only
//!    degrades the service.
//! 3. [`CliInvoker::invoke`] runs one completion with a timeout, killing the
//!    child if it expires, and classifies failures from stderr.
//! 4. [`health::probe`] repeats the version and identity checks on demand.

pub mod discovery;
pub mod error;
pub mod health;
pub mod invoker;
pub mod process;

pub use discovery::{CliCommand, Identity};
pub use error::{CliError, classify, classify_stderr};
pub use health::{CliStatus, HealthReport};
pub use invoker::CliInvoker;
pub use process::{ChildProcess, Launcher, ProcessOutput, TokioLauncher};
