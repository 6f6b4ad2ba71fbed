use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use agent_rpc::AgentConn;

/// Persisted identity of one endpoint agent. `ComputerName` is the
/// primary key; host and port may change across check-ins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    #[serde(rename = "ComputerName")]
    pub computer_name: String,
    #[serde(rename = "AgentHost")]
    pub agent_host: String,
    #[serde(rename = "AgentPort")]
    pub agent_port: String,
}

/// What a check-in did to the stored descriptor list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInChange {
    Unchanged,
    Updated,
    Added,
}

/// Host-identity keyed connection pool, backed by the agents file
/// (JSON-lines of descriptors). Descriptors are never evicted; a dial
/// failure only leaves the connection slot empty until the agent checks
/// in again.
#[derive(Debug)]
pub struct AgentRegistry {
    descriptors: Vec<AgentDescriptor>,
    conns: HashMap<String, AgentConn>,
    path: PathBuf,
}

impl AgentRegistry {
    /// Read the agents file. Connections are dialed separately with
    /// [`AgentRegistry::dial_all`] so startup keeps going when endpoints
    /// are unreachable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut descriptors = Vec::new();

        match fs::read_to_string(&path) {
            Ok(contents) => {
                for (idx, line) in contents.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<AgentDescriptor>(line) {
                        Ok(descriptor) => descriptors.push(descriptor),
                        Err(err) => {
                            warn!(
                                file = %path.display(),
                                line = idx + 1,
                                error = %err,
                                "skipping unparseable agent descriptor"
                            );
                        }
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                error!(file = %path.display(), error = %err, "failed reading agents file");
            }
        }

        info!(file = %path.display(), count = descriptors.len(), "loaded agent descriptors");
        Self {
            descriptors,
            conns: HashMap::new(),
            path,
        }
    }

    /// Dial every stored descriptor. Failures are logged and leave the
    /// entry without a connection.
    pub async fn dial_all(&mut self) {
        for descriptor in self.descriptors.clone() {
            self.dial_and_install(&descriptor).await;
        }
    }

    pub fn descriptors(&self) -> &[AgentDescriptor] {
        &self.descriptors
    }

    pub fn lookup(&self, computer_name: &str) -> Option<AgentConn> {
        self.conns.get(computer_name).cloned()
    }

    /// Record a check-in: a known agent with a changed address updates its
    /// descriptor and rewrites the agents file; an unknown agent is
    /// appended to memory and file. The (possibly new) address is then
    /// dialed and the stored connection replaced.
    pub async fn check_in(&mut self, descriptor: AgentDescriptor) -> CheckInChange {
        let change = self.apply_check_in(descriptor.clone());
        self.dial_and_install(&descriptor).await;
        change
    }

    /// The persistence half of a check-in, kept synchronous so the
    /// descriptor/file invariant is testable without live endpoints.
    pub fn apply_check_in(&mut self, descriptor: AgentDescriptor) -> CheckInChange {
        if let Some(stored) = self
            .descriptors
            .iter_mut()
            .find(|stored| stored.computer_name == descriptor.computer_name)
        {
            if stored.agent_host == descriptor.agent_host
                && stored.agent_port == descriptor.agent_port
            {
                return CheckInChange::Unchanged;
            }

            stored.agent_host = descriptor.agent_host.clone();
            stored.agent_port = descriptor.agent_port.clone();
            if let Err(err) = rewrite_json_lines(&self.path, &self.descriptors) {
                error!(file = %self.path.display(), error = %err, "failed rewriting agents file");
            } else {
                info!(computer_name = %descriptor.computer_name, "updated agent descriptor");
            }
            return CheckInChange::Updated;
        }

        self.descriptors.push(descriptor.clone());
        if let Err(err) = append_json_line(&self.path, &descriptor) {
            error!(file = %self.path.display(), error = %err, "failed appending agent descriptor");
        } else {
            info!(computer_name = %descriptor.computer_name, "added agent descriptor");
        }
        CheckInChange::Added
    }

    async fn dial_and_install(&mut self, descriptor: &AgentDescriptor) {
        match AgentConn::dial(&descriptor.agent_host, &descriptor.agent_port).await {
            Ok(conn) => {
                info!(
                    computer_name = %descriptor.computer_name,
                    addr = %conn.addr(),
                    "connected to agent"
                );
                let _ = self.conns.insert(descriptor.computer_name.clone(), conn);
            }
            Err(err) => {
                // The previous connection, if any, stays until a dial succeeds.
                error!(
                    computer_name = %descriptor.computer_name,
                    error = %err,
                    "failed dialing agent"
                );
            }
        }
    }
}

fn append_json_line(path: &Path, descriptor: &AgentDescriptor) -> std::io::Result<()> {
    let mut line = serde_json::to_string(descriptor)?;
    line.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

fn rewrite_json_lines(path: &Path, descriptors: &[AgentDescriptor]) -> std::io::Result<()> {
    let mut data = String::new();
    for descriptor in descriptors {
        data.push_str(&serde_json::to_string(descriptor)?);
        data.push('\n');
    }
    fs::write(path, data)
}

#[cfg(test)]
mod tests;
