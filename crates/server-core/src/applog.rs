use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::{Context, Result};

/// Route all tracing output to the configured app log as JSON lines:
/// level, timestamp, message, and span fields (the server's root span
/// carries `Hostname`).
///
/// Failure to open the app log is fatal at startup, like a bad config.
pub fn init(app_log_path: &str) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(app_log_path)
        .with_context(|| format!("failed opening app log {}", app_log_path))?;

    tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed installing tracing subscriber: {}", err))?;

    Ok(())
}

pub fn server_hostname() -> String {
    hostname::get()
        .ok()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "bastion-server".to_string())
}
