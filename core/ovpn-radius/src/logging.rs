//! Log setup for the hook binary.
//!
//! OpenVPN discards hook stdout, so once the configuration names a log file
//! all output is appended there through a non-blocking writer. The returned
//! guard must outlive every log call; dropping it flushes pending lines.

use std::env;
use std::path::Path;

use ovpn_radius_core::{RadiusError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEBUG_ENV: &str = "OVPN_RADIUS_DEBUG_LOG";

fn filter() -> EnvFilter {
    let debug_enabled = env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Logs to `log_file`, appending.
pub fn init_file(log_file: &Path) -> Result<WorkerGuard> {
    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent).map_err(|source| RadiusError::LogInit {
            path: log_file.to_path_buf(),
            source,
        })?;
    }
    let file = fs_err::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|source| RadiusError::LogInit {
            path: log_file.to_path_buf(),
            source,
        })?;

    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(guard)
}

/// Fallback when no log file is available yet.
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .init();
}
