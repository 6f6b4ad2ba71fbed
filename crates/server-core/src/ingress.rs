use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, info_span, warn, Instrument};

use rules::{Decision, Rule, TelemetryRecord};

use crate::dispatch;
use crate::registry::AgentDescriptor;
use crate::server::Server;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Telemetry,
    AgentCheckIn,
}

impl SessionKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Telemetry => "telemetry",
            Self::AgentCheckIn => "agent-checkin",
        }
    }
}

/// Bind the configured listener and serve sessions until the task is
/// cancelled. Binding is the last fatal step of startup; accept errors
/// after that are logged and the loop keeps going.
pub async fn run(server: Arc<Server>) -> Result<()> {
    let addr = server.config().listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed binding ingress listener on {}", addr))?;
    info!(listen = %addr, "ingress listener started");

    run_with_listener(server, listener).await
}

/// Accept loop over an already-bound listener; split out so tests can bind
/// an ephemeral port themselves.
pub async fn run_with_listener(server: Arc<Server>, listener: TcpListener) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let kind = session_kind(peer.ip(), &server.config().splunk_host);
                let server = Arc::clone(&server);
                let span = info_span!("session", kind = kind.as_str(), peer = %peer);
                tokio::spawn(
                    async move {
                        let result = match kind {
                            SessionKind::Telemetry => telemetry_session(&server, stream).await,
                            SessionKind::AgentCheckIn => checkin_session(&server, stream).await,
                        };
                        if let Err(err) = result {
                            warn!(error = %err, "session ended with error");
                        }
                    }
                    .instrument(span),
                );
            }
            Err(err) => {
                error!(error = %err, "accept failed");
            }
        }
    }
}

/// Connections from the telemetry source host carry telemetry; everything
/// else is an agent checking in.
pub fn session_kind(peer: IpAddr, telemetry_source_host: &str) -> SessionKind {
    if peer.to_string() == telemetry_source_host {
        SessionKind::Telemetry
    } else {
        SessionKind::AgentCheckIn
    }
}

/// One newline-terminated descriptor, then close.
async fn checkin_session(server: &Server, stream: TcpStream) -> Result<()> {
    let mut lines = BufReader::new(stream).lines();
    let Some(line) = lines.next_line().await.context("check-in read failed")? else {
        return Ok(());
    };

    let descriptor: AgentDescriptor =
        serde_json::from_str(&line).context("check-in frame is not a descriptor")?;
    let change = server
        .registry()
        .write()
        .await
        .check_in(descriptor.clone())
        .await;
    info!(
        computer_name = %descriptor.computer_name,
        change = ?change,
        "agent checked in"
    );
    Ok(())
}

/// Telemetry sessions loop over newline-terminated JSON objects until EOF
/// or an empty line. Rule updates and administrator-injected direct
/// actions are single-shot: the session ends after one such frame; the
/// match path keeps reading.
async fn telemetry_session(server: &Server, stream: TcpStream) -> Result<()> {
    let mut lines = BufReader::new(stream).lines();

    while let Some(line) = lines.next_line().await.context("telemetry read failed")? {
        if line.trim().is_empty() {
            break;
        }

        let Ok(object) = serde_json::from_str::<serde_json::Map<String, Value>>(&line) else {
            warn!(frame = %line, "dropping non-JSON telemetry frame");
            continue;
        };

        if object.contains_key("Action Rule") {
            handle_rule_update(server, &line).await;
            break;
        }

        let record = match TelemetryRecord::parse(&line) {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "dropping unparseable telemetry record");
                continue;
            }
        };

        if record.contains("Action") {
            dispatch::dispatch(server, Decision::from_record(record)).await;
            break;
        }

        let decisions = {
            let catalog = server.catalog().read().await;
            rules::evaluate(&record, catalog.rules())
        };

        if decisions.is_empty() {
            server.note_no_match(record.computer_name());
            continue;
        }

        for decision in decisions {
            dispatch::dispatch(server, decision).await;
        }
    }

    Ok(())
}

/// The producer double-quotes the nested rule object; undo the wrapping
/// quotes and the escaped inner quotes so the frame parses as one object.
pub fn normalize_rule_frame(raw: &str) -> String {
    raw.replace("\"{", "{")
        .replace("}\"", "}")
        .replace("\\\"", "\"")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMutation {
    Add,
    Delete,
}

/// Split a rule-update frame into its verb and the rule payload.
pub fn parse_rule_mutation(raw: &str) -> Result<(RuleMutation, Rule)> {
    let normalized = normalize_rule_frame(raw);
    let mut object: serde_json::Map<String, Value> =
        serde_json::from_str(&normalized).context("rule frame is not a JSON object")?;

    let verb = object
        .remove("Action Rule")
        .context("rule frame has no Action Rule")?;
    let mutation = match verb.as_str().unwrap_or_default() {
        "add" => RuleMutation::Add,
        "delete" => RuleMutation::Delete,
        other => anyhow::bail!("unknown rule mutation {:?}", other),
    };

    let rule: Rule =
        serde_json::from_value(Value::Object(object)).context("rule frame is not a rule")?;
    Ok((mutation, rule))
}

async fn handle_rule_update(server: &Server, raw: &str) {
    match parse_rule_mutation(raw) {
        Ok((RuleMutation::Add, rule)) => {
            server.catalog().write().await.add(rule);
            info!("added rule");
        }
        Ok((RuleMutation::Delete, rule)) => {
            if server.catalog().write().await.delete(&rule) {
                info!("deleted rule");
            } else {
                warn!("delete matched no rule");
            }
        }
        Err(err) => {
            error!(error = %err, "rule update rejected");
        }
    }
}

#[cfg(test)]
mod tests;
