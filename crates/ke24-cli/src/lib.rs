//! The `ke24` command line tool.
//!
//! Thin glue around `ke24-control`: parse flags, find and load the
//! configuration, set up logging, build the registry over real serial
//! ports, then resolve and execute the requested actions in order.

pub mod args;

use std::path::PathBuf;

use ke24_control::{execute, resolve, Config, ControlError, Mode, Registry, ResolvedAction};
use ke24_protocol::{KeClient, SerialTransport};
use thiserror::Error;
use tracing::info;

pub use args::{command, parse, ParsedArgs, UsageError};

/// Default configuration locations, searched after any `-c` paths.
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["~/.config/ke24.conf", "/etc/ke24.conf"];

/// Failures of a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    /// No configuration file was found anywhere.
    #[error("no configuration file found (searched {0:?})")]
    ConfigNotFound(Vec<PathBuf>),

    /// Anything from configuration loading to action execution.
    #[error(transparent)]
    Control(#[from] ControlError),
}

/// Expand a leading `~/` against `$HOME`.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// Find the first existing configuration file.
///
/// `-c` paths are searched before the defaults, in the order given.
pub fn find_config(extra: &[PathBuf]) -> Result<PathBuf, RunError> {
    let mut candidates: Vec<PathBuf> = extra.to_vec();
    candidates.extend(DEFAULT_CONFIG_PATHS.iter().map(|p| expand_tilde(p)));

    candidates
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or(RunError::ConfigNotFound(candidates))
}

/// Initialize logging at the effective verbosity.
///
/// `RUST_LOG` still takes precedence when set.
fn init_logging(mode: Mode) {
    let default = match mode {
        Mode::Quiet => "warn",
        Mode::Verbose => "info",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Execute one invocation end to end.
pub fn run(parsed: &ParsedArgs) -> Result<(), RunError> {
    let config_path = find_config(&parsed.configs)?;
    let config = Config::load(&config_path)?;

    init_logging(parsed.mode.unwrap_or(config.mode));
    info!(path = %config_path.display(), "loaded configuration");

    let mut registry = Registry::build(&config, &mut |port| {
        let transport = SerialTransport::open(&port.path, port.baud)?;
        Ok(KeClient::new(Box::new(transport)))
    })?;

    // Resolve everything before touching any relay: an ambiguous or
    // malformed request must not leave earlier actions half-applied.
    let actions: Vec<ResolvedAction> = parsed
        .actions
        .iter()
        .map(|request| resolve(&registry, request))
        .collect::<Result<_, _>>()?;

    for action in &actions {
        let outcome = execute(&mut registry, action)?;
        println!("{}", outcome);
    }

    Ok(())
}
