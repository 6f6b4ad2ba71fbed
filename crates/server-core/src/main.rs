use anyhow::Result;
use tokio::signal;
use tracing::{info, info_span, Instrument};

use server_core::{applog, ingress, Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Config and app log come first: both are fatal when broken, and
    // everything after logs through the app log.
    let config = ServerConfig::load()?;
    applog::init(&config.app_log_path)?;

    let hostname = applog::server_hostname();
    let root = info_span!("bastion_server", Hostname = %hostname);

    async {
        let server = Server::bootstrap(config).await?;
        info!(
            listen = %server.config().listen_addr(),
            telemetry_source = %server.config().splunk_host,
            rules = server.catalog().read().await.len(),
            agents = server.registry().read().await.descriptors().len(),
            "bastion server started"
        );

        tokio::select! {
            result = ingress::run(server) => result,
            _ = wait_for_shutdown_signal() => {
                info!("bastion server stopped");
                Ok(())
            }
        }
    }
    .instrument(root)
    .await
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
