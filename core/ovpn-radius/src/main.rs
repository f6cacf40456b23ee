//! ovpn-radius: OpenVPN hook binary delegating AAA to a RADIUS server.
//!
//! Each OpenVPN script hook runs this binary once:
//!
//! ```text
//! auth-user-pass-verify "/usr/bin/ovpn-radius auth" via-file
//! client-connect        "/usr/bin/ovpn-radius acct"
//! client-disconnect     "/usr/bin/ovpn-radius stop"
//! ```
//!
//! ## Subcommands
//!
//! - `auth <FILE>`: verify credentials and record the session
//! - `acct`: send accounting Start + Interim-Update
//! - `stop`: send accounting Stop and drop the session
//! - `env`: log the hook environment (wiring diagnostics)
//! - `list`: print stored sessions
//!
//! The exit status is 0 on success, otherwise the code of the failure class
//! (see `RadiusError::exit_code`).

mod commands;
mod logging;

use clap::{Parser, Subcommand};
use ovpn_radius_core::config::DEFAULT_CONFIG_PATH;
use ovpn_radius_core::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ovpn-radius")]
#[command(about = "OpenVPN RADIUS authentication and accounting hook")]
#[command(version)]
struct Cli {
    /// Plugin configuration file
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate the user named in OpenVPN's credentials file
    Auth {
        /// Two-line file (username, password) written by OpenVPN
        #[arg(value_name = "FILE")]
        credentials: PathBuf,
    },

    /// Start accounting for a connected client (client-connect)
    Acct,

    /// Stop accounting for a disconnected client (client-disconnect)
    Stop,

    /// Log the hook environment, omitting password material
    Env,

    /// Print all stored sessions
    List,
}

fn main() {
    let cli = Cli::parse();
    let code = run(cli);
    std::process::exit(code);
}

// Owns the log guard so pending lines are flushed before `exit`.
fn run(cli: Cli) -> i32 {
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            logging::init_stderr();
            tracing::error!(error = %err, path = %cli.config.display(), "Failed to load configuration");
            return err.exit_code();
        }
    };

    let _logging_guard = match logging::init_file(&config.log_file) {
        Ok(guard) => guard,
        Err(err) => {
            logging::init_stderr();
            tracing::error!(error = %err, "Failed to initialize logging");
            return err.exit_code();
        }
    };

    tracing::info!(
        command = cli.command.name(),
        pid = std::process::id(),
        "ovpn-radius started"
    );

    match commands::dispatch(cli.command, &config) {
        Ok(()) => {
            tracing::info!("ovpn-radius finished");
            0
        }
        Err(err) => {
            let code = err.exit_code();
            tracing::error!(error = %err, exit_code = code, "ovpn-radius failed");
            code
        }
    }
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Auth { .. } => "auth",
            Commands::Acct => "acct",
            Commands::Stop => "stop",
            Commands::Env => "env",
            Commands::List => "list",
        }
    }
}
