use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::debug;

use agent_rpc::AgentConn;
use rules::RuleCatalog;

use crate::config::ServerConfig;
use crate::registry::AgentRegistry;
use crate::results::ResultLog;

/// Composition root: one value owns the catalog, the registry, the result
/// log and the configuration; session handlers receive it by `Arc`.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    catalog: RwLock<RuleCatalog>,
    registry: RwLock<AgentRegistry>,
    results: ResultLog,
    no_match_total: AtomicU64,
}

impl Server {
    /// Load persisted state and dial every known agent. Only the result
    /// log can fail here; unreachable agents and unparseable persisted
    /// lines are logged and skipped.
    pub async fn bootstrap(config: ServerConfig) -> Result<Arc<Self>> {
        let catalog = RuleCatalog::load(&config.rule_file_path);

        let mut registry = AgentRegistry::load(&config.agents_conf_path);
        registry.dial_all().await;

        let results = ResultLog::new(&config.result_log_path)?;

        Ok(Arc::new(Self {
            config,
            catalog: RwLock::new(catalog),
            registry: RwLock::new(registry),
            results,
            no_match_total: AtomicU64::new(0),
        }))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &RwLock<RuleCatalog> {
        &self.catalog
    }

    pub fn registry(&self) -> &RwLock<AgentRegistry> {
        &self.registry
    }

    pub fn results(&self) -> &ResultLog {
        &self.results
    }

    pub async fn lookup_agent(&self, computer_name: &str) -> Option<AgentConn> {
        self.registry.read().await.lookup(computer_name)
    }

    /// Telemetry that matches no rule is dropped without an outcome
    /// record; the counter keeps the drop observable.
    pub fn note_no_match(&self, computer_name: &str) {
        let total = self.no_match_total.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(computer_name, no_match_total = total, "record matched no rule");
    }

    pub fn no_match_total(&self) -> u64 {
        self.no_match_total.load(Ordering::Relaxed)
    }
}
