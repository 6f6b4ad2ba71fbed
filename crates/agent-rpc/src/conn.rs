use std::time::Duration;

use anyhow::{Context, Result};
use tonic::transport::{Channel, Endpoint};

use crate::pb::manager_client::ManagerClient;
use crate::CONNECT_TIMEOUT_SECS;

/// A dialed connection to one agent's `Manager` service.
///
/// The channel is created once per registry entry and cloned per call;
/// tonic channels multiplex, so clones are cheap handles onto the same
/// underlying connection.
#[derive(Debug, Clone)]
pub struct AgentConn {
    addr: String,
    channel: Channel,
}

impl AgentConn {
    /// Dial `host:port` over plaintext. Fails fast when the agent is not
    /// reachable so the caller can log the dial failure and leave the
    /// registry entry without a connection.
    pub async fn dial(host: &str, port: &str) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let endpoint = Endpoint::from_shared(format!("http://{}", addr))
            .with_context(|| format!("invalid agent endpoint {}", addr))?
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS));

        let channel = endpoint
            .connect()
            .await
            .with_context(|| format!("failed dialing agent at {}", addr))?;

        Ok(Self { addr, channel })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn client(&self) -> ManagerClient<Channel> {
        ManagerClient::new(self.channel.clone())
    }
}
