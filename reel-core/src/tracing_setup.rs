//! Tracing setup for Reel
//!
//! Console output follows the level the operator asked for, while a
//! per-run log file under `logs/` captures Reel's own events down to
//! trace so that truncated transfers and client aborts can be diagnosed
//! after the fact. Dependencies are kept quieter on both outputs.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::{ReelError, Result};

/// Name of the debug log written on every run, overwriting the previous one.
pub const LAST_RUN_LOG: &str = "reel-last-run.log";

/// Targets whose events describe request handling and byte transfer.
const REEL_TARGETS: [&str; 4] = ["reel_core", "reel_web", "reel_cli", "tower_http"];

/// Filter directives that apply `level` to Reel and request spans, keeping
/// dependencies such as hyper at `warn`.
pub fn console_directives(level: Level) -> String {
    scoped_directives(Level::WARN, level)
}

/// Filter directives for the per-run file: every transfer chunk at trace,
/// dependencies at info.
pub fn file_directives() -> String {
    scoped_directives(Level::INFO, Level::TRACE)
}

fn scoped_directives(default: Level, reel: Level) -> String {
    let default = default.to_string().to_lowercase();
    let reel = reel.to_string().to_lowercase();
    let mut directives = default;
    for target in REEL_TARGETS {
        directives.push_str(&format!(",{target}={reel}"));
    }
    directives
}

/// Installs the global subscriber and returns the path of the per-run log.
///
/// The console shows Reel events at `console_level`; `RUST_LOG`, when set,
/// replaces that filter. The file in `logs_dir` (default `./logs`) keeps
/// per-chunk transfer tracing so truncated bodies and client aborts can be
/// matched to their requests afterwards.
///
/// # Errors
///
/// - `ReelError::Io` - If the logs directory or log file cannot be created
/// - `ReelError::Configuration` - If a global subscriber is already installed
pub fn init_tracing(console_level: Level, logs_dir: Option<&Path>) -> Result<PathBuf> {
    let logs_path = logs_dir.unwrap_or_else(|| Path::new("logs"));
    create_dir_all(logs_path)?;

    let log_file_path = logs_path.join(LAST_RUN_LOG);
    let log_file = File::create(&log_file_path)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_directives(console_level)));

    let console_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(EnvFilter::new(file_directives()));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ReelError::Configuration {
            reason: format!("tracing already initialized: {e}"),
        })?;

    tracing::debug!(
        "Console at {}, full transfer log in {}",
        console_level,
        log_file_path.display()
    );

    Ok(log_file_path)
}

/// CLI log levels for user control
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Informational, warning, and error messages
    Info,
    /// Debug, informational, warning, and error messages
    Debug,
    /// All messages including per-chunk transfer tracing
    Trace,
}

impl CliLogLevel {
    /// Converts CLI log level to tracing Level enum.
    ///
    /// # Examples
    /// ```
    /// use reel_core::tracing_setup::CliLogLevel;
    ///
    /// let level = CliLogLevel::Warn.as_tracing_level();
    /// assert_eq!(level, tracing::Level::WARN);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

impl std::fmt::Display for CliLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CliLogLevel::Error => "error",
            CliLogLevel::Warn => "warn",
            CliLogLevel::Info => "info",
            CliLogLevel::Debug => "debug",
            CliLogLevel::Trace => "trace",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(CliLogLevel::Error.as_tracing_level(), Level::ERROR);
        assert_eq!(CliLogLevel::Trace.as_tracing_level(), Level::TRACE);
        assert_eq!(CliLogLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn test_console_directives_scope_level_to_reel() {
        let directives = console_directives(Level::DEBUG);
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("reel_core=debug"));
        assert!(directives.contains("tower_http=debug"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_file_directives_trace_transfers() {
        let directives = file_directives();
        assert!(directives.starts_with("info,"));
        assert!(directives.contains("reel_core=trace"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
