use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::info;

use crate::config::AgentConfig;

/// Check-in writes are bounded so a wedged server cannot hold the agent's
/// startup hostage.
pub const CHECKIN_WRITE_TIMEOUT_SECS: u64 = 30;

/// The newline-terminated JSON frame an agent sends the control plane on
/// startup. The server keys its registry on `ComputerName`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    #[serde(rename = "ComputerName")]
    pub computer_name: String,
    #[serde(rename = "AgentHost")]
    pub agent_host: String,
    #[serde(rename = "AgentPort")]
    pub agent_port: String,
}

impl AgentInfo {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            computer_name: local_computer_name(),
            agent_host: config.agent_host.clone(),
            agent_port: config.agent_port.clone(),
        }
    }
}

/// Announce this agent to the control plane: one JSON line over TCP, then
/// close. The server dials back the advertised `AgentHost:AgentPort` for
/// the gRPC session.
pub async fn check_in(config: &AgentConfig) -> Result<()> {
    let info = AgentInfo::from_config(config);
    check_in_at(&config.server_addr(), &info).await
}

pub async fn check_in_at(server_addr: &str, info: &AgentInfo) -> Result<()> {
    let mut stream = TcpStream::connect(server_addr)
        .await
        .with_context(|| format!("failed connecting to control plane at {}", server_addr))?;

    let mut frame = serde_json::to_string(info).context("failed encoding check-in frame")?;
    frame.push('\n');

    tokio::time::timeout(
        Duration::from_secs(CHECKIN_WRITE_TIMEOUT_SECS),
        stream.write_all(frame.as_bytes()),
    )
    .await
    .context("check-in write timed out")?
    .context("check-in write failed")?;

    info!(server = %server_addr, computer_name = %info.computer_name, "checked in");
    Ok(())
}

fn local_computer_name() -> String {
    hostname::get()
        .ok()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "bastion-agent".to_string())
}
