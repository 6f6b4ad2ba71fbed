use std::net::SocketAddr;
use std::sync::Once;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;

use agent_core::{checkin, AgentConfig, AgentService};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AgentConfig::load()?;

    // Announce ourselves so the control plane dials back our Manager
    // endpoint. Failing to reach the server at startup is fatal: an agent
    // nobody can dispatch to is useless.
    checkin::check_in(&config).await?;

    let addr: SocketAddr = config
        .agent_addr()
        .parse()
        .with_context(|| format!("invalid agent listen address {}", config.agent_addr()))?;

    info!(
        listen = %addr,
        server = %config.server_addr(),
        adapter = %config.adapter_internet,
        "bastion agent started"
    );

    let service = AgentService::new(config.adapter_internet.clone());
    tonic::transport::Server::builder()
        .add_service(service.into_server())
        .serve_with_shutdown(addr, wait_for_shutdown_signal())
        .await
        .context("agent RPC server failed")?;

    info!("bastion agent stopped");
    Ok(())
}

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(tracing_subscriber::fmt::init);
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("register SIGTERM handler");
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("shutdown signal received (SIGINT)");
            }
            _ = sigterm.recv() => {
                info!("shutdown signal received (SIGTERM)");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("shutdown signal received");
    }
}
