use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const SERVER_CONFIG_CANDIDATES: [&str; 3] = [
    "/etc/bastion/server.conf",
    "./configs/server.conf",
    "./server.conf",
];

/// Control-plane settings, persisted as a JSON file with a single-element
/// `ServerConfig` array. A missing or malformed file is fatal at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Parent of the per-agent download directories.
    #[serde(rename = "ParentDirPath")]
    pub parent_dir_path: String,
    #[serde(rename = "ResultLogPath")]
    pub result_log_path: String,
    #[serde(rename = "RuleFilePath")]
    pub rule_file_path: String,
    #[serde(rename = "AppLogPath")]
    pub app_log_path: String,
    #[serde(rename = "AgentsConfPath")]
    pub agents_conf_path: String,
    /// Peer host of the telemetry source; connections from it are
    /// telemetry sessions, everything else is an agent check-in.
    #[serde(rename = "SplunkHost")]
    pub splunk_host: String,
    #[serde(rename = "ServerHost")]
    pub server_host: String,
    #[serde(rename = "ServerPort")]
    pub server_port: String,
}

#[derive(Debug, Deserialize)]
struct ServerConfigFile {
    #[serde(rename = "ServerConfig")]
    server_config: Vec<ServerConfig>,
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        let path = resolve_config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading server config {}", path.display()))?;
        let file: ServerConfigFile = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing server config {}", path.display()))?;

        file.server_config.into_iter().next().with_context(|| {
            format!(
                "server config {} has an empty ServerConfig array",
                path.display()
            )
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(p) = std::env::var("BASTION_SERVER_CONFIG") {
        let p = p.trim();
        if !p.is_empty() {
            let path = PathBuf::from(p);
            if !path.exists() {
                anyhow::bail!(
                    "configured BASTION_SERVER_CONFIG does not exist: {}",
                    path.display()
                );
            }
            return Ok(path);
        }
    }

    for candidate in SERVER_CONFIG_CANDIDATES {
        let p = Path::new(candidate);
        if p.exists() {
            return Ok(p.to_path_buf());
        }
    }

    anyhow::bail!(
        "no server config found; set BASTION_SERVER_CONFIG or provide one of {:?}",
        SERVER_CONFIG_CANDIDATES
    )
}
