use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const AGENT_CONFIG_CANDIDATES: [&str; 3] = [
    "/etc/bastion/agent.conf",
    "./configs/agent.conf",
    "./agent.conf",
];

/// Agent-side settings, persisted as a JSON file with a single-element
/// `AgentConfig` array. A missing or malformed file is fatal at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Interface name of the adapter that carries the host's internet
    /// traffic; the target of `disable`/`enable` actions.
    #[serde(rename = "AdapterInternet")]
    pub adapter_internet: String,
    #[serde(rename = "ServerHost")]
    pub server_host: String,
    #[serde(rename = "ServerPort")]
    pub server_port: String,
    #[serde(rename = "AgentHost")]
    pub agent_host: String,
    #[serde(rename = "AgentPort")]
    pub agent_port: String,
}

#[derive(Debug, Deserialize)]
struct AgentConfigFile {
    #[serde(rename = "AgentConfig")]
    agent_config: Vec<AgentConfig>,
}

impl AgentConfig {
    pub fn load() -> Result<Self> {
        let path = resolve_config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading agent config {}", path.display()))?;
        let file: AgentConfigFile = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing agent config {}", path.display()))?;

        file.agent_config
            .into_iter()
            .next()
            .with_context(|| format!("agent config {} has an empty AgentConfig array", path.display()))
    }

    /// Address the control plane listens on, for check-in.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Address this agent serves its `Manager` service on.
    pub fn agent_addr(&self) -> String {
        format!("{}:{}", self.agent_host, self.agent_port)
    }
}

fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(p) = std::env::var("BASTION_AGENT_CONFIG") {
        let p = p.trim();
        if !p.is_empty() {
            let path = PathBuf::from(p);
            if !path.exists() {
                anyhow::bail!(
                    "configured BASTION_AGENT_CONFIG does not exist: {}",
                    path.display()
                );
            }
            return Ok(path);
        }
    }

    for candidate in AGENT_CONFIG_CANDIDATES {
        let p = Path::new(candidate);
        if p.exists() {
            return Ok(p.to_path_buf());
        }
    }

    anyhow::bail!(
        "no agent config found; set BASTION_AGENT_CONFIG or provide one of {:?}",
        AGENT_CONFIG_CANDIDATES
    )
}

#[cfg(test)]
mod tests;
