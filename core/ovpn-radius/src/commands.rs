//! Subcommand handlers. Each one opens what it needs, runs a single phase,
//! and releases everything on return.

use std::env;
use std::path::Path;

use ovpn_radius_core::{
    AcctSessionId, AuthOutcome, Config, Credentials, IdentityContext, Radclient, Result,
    SessionLifecycle, SessionState, SessionStore,
};

use crate::Commands;

pub fn dispatch(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Auth { credentials } => authenticate(config, &credentials),
        Commands::Acct => accounting_start(config),
        Commands::Stop => accounting_stop(config),
        Commands::Env => {
            log_environment();
            Ok(())
        }
        Commands::List => list_sessions(config),
    }
}

fn authenticate(config: &Config, credentials_path: &Path) -> Result<()> {
    tracing::info!(path = %credentials_path.display(), "Reading credentials");
    let credentials = Credentials::from_file(credentials_path)?;

    let store = SessionStore::open_with_config(config)?;
    let transport = Radclient::new(&config.radclient_path);
    let outcome = SessionLifecycle::new(config, &store, &transport)
        .authenticate(&credentials, &IdentityContext::from_env())?;

    if let AuthOutcome::Recorded(record) = outcome {
        tracing::debug!(key = %record.key, "Authentication phase complete");
    }
    Ok(())
}

fn accounting_start(config: &Config) -> Result<()> {
    let store = SessionStore::open_with_config(config)?;
    let transport = Radclient::new(&config.radclient_path);
    SessionLifecycle::new(config, &store, &transport)
        .accounting_start(&IdentityContext::from_env(), AcctSessionId::random())?;
    Ok(())
}

fn accounting_stop(config: &Config) -> Result<()> {
    let store = SessionStore::open_with_config(config)?;
    let transport = Radclient::new(&config.radclient_path);
    let state = SessionLifecycle::new(config, &store, &transport)
        .accounting_stop(&IdentityContext::from_env(), AcctSessionId::random())?;
    tracing::debug!(state = state.as_str(), "Accounting phase complete");
    Ok(())
}

fn list_sessions(config: &Config) -> Result<()> {
    let store = SessionStore::open_with_config(config)?;
    let records = store.list_all()?;
    tracing::info!(count = records.len(), "Listing sessions");

    for record in &records {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            record.key,
            record.principal,
            record.endpoint.as_deref().unwrap_or("-"),
            SessionState::of(Some(record)).as_str(),
            record.created_at
        );
    }
    Ok(())
}

fn log_environment() {
    let mut vars: Vec<(String, String)> = env::vars_os()
        .map(|(name, value)| {
            (
                name.to_string_lossy().into_owned(),
                value.to_string_lossy().into_owned(),
            )
        })
        .filter(|(name, value)| !mentions_password(name) && !mentions_password(value))
        .collect();
    vars.sort();

    for (name, value) in &vars {
        tracing::info!("env: {}={}", name, value);
    }
    tracing::info!(count = vars.len(), "Environment logged");
}

fn mentions_password(text: &str) -> bool {
    text.to_lowercase().contains("password")
}
