use std::future::Future;
use std::time::Duration;

use tonic::{Response, Status};
use tracing::warn;

use agent_rpc::pb::{
    EventCode10Request, EventCode11Request, EventCode12Request, EventCode13Request,
    EventCode14Request, EventCode1Request, EventCode3Request, EventCode7Request,
    EventCode8Request, EventCode9Request, NetworkAdapterRequest,
    ResponseResult as PbResponseResult,
};
use agent_rpc::{AgentConn, UNARY_RPC_TIMEOUT_SECS};
use rules::{ActionVerb, Decision, HostEvent};

use crate::download;
use crate::results::outcome_record;
use crate::server::Server;

/// Execute one decision against its agent and append exactly one outcome
/// record, whether the action succeeded, failed, or never left the server.
pub async fn dispatch(server: &Server, decision: Decision) {
    let result = run_decision(server, &decision).await;
    if !result.result {
        warn!(
            computer_name = %decision.computer_name(),
            action = %decision.verb().as_str(),
            result_info = %result.result_info,
            "dispatch failed"
        );
    }

    let outcome = outcome_record(decision.into_record(), &result.result_info, result.result);
    server.results().append(&outcome);
}

/// The decision table: `getfile` and the adapter verbs select their
/// dedicated methods, everything else selects the method of the record's
/// event code and lets the agent interpret the verb.
async fn run_decision(server: &Server, decision: &Decision) -> PbResponseResult {
    let Some(conn) = server.lookup_agent(decision.computer_name()).await else {
        return failure("agent not registered".to_string());
    };

    match decision.verb() {
        ActionVerb::GetFile => {
            download::fetch_file(&server.config().parent_dir_path, decision, &conn).await
        }
        ActionVerb::Disable | ActionVerb::Enable => {
            let request = NetworkAdapterRequest {
                action: decision.verb().as_str().to_string(),
            };
            unary(conn.client().network_adapter(request)).await
        }
        _ => dispatch_by_event_code(decision, &conn).await,
    }
}

async fn dispatch_by_event_code(decision: &Decision, conn: &AgentConn) -> PbResponseResult {
    let action = decision.verb().as_str().to_string();
    let mut client = conn.client();

    match decision.event() {
        Some(HostEvent::ProcessCreate { process_id, .. }) => {
            unary(client.event_code1(EventCode1Request { process_id, action })).await
        }
        Some(HostEvent::NetworkConnect {
            process_id,
            source_ip,
            source_port,
            destination_ip,
            destination_port,
        }) => {
            unary(client.event_code3(EventCode3Request {
                process_id,
                source_ip,
                source_port,
                destination_ip,
                destination_port,
                action,
            }))
            .await
        }
        Some(HostEvent::ImageLoad {
            process_id,
            image_loaded,
        }) => {
            unary(client.event_code7(EventCode7Request {
                process_id,
                image_loaded,
                action,
            }))
            .await
        }
        Some(HostEvent::RemoteThread { source_process_id }) => {
            unary(client.event_code8(EventCode8Request {
                source_process_id,
                action,
            }))
            .await
        }
        Some(HostEvent::RawAccessRead { process_id }) => {
            unary(client.event_code9(EventCode9Request { process_id, action })).await
        }
        Some(HostEvent::ProcessAccess { process_id }) => {
            unary(client.event_code10(EventCode10Request { process_id, action })).await
        }
        Some(HostEvent::FileCreate { target_filename }) => {
            unary(client.event_code11(EventCode11Request {
                target_filename,
                action,
            }))
            .await
        }
        Some(HostEvent::RegistryKey { target_object }) => {
            unary(client.event_code12(EventCode12Request {
                target_object,
                action,
            }))
            .await
        }
        Some(HostEvent::RegistryValueSet { target_object }) => {
            unary(client.event_code13(EventCode13Request {
                target_object,
                action,
            }))
            .await
        }
        Some(HostEvent::RegistryRename {
            event_type,
            target_object,
            new_name,
        }) => {
            unary(client.event_code14(EventCode14Request {
                event_type,
                target_object,
                new_name,
                action,
            }))
            .await
        }
        None => failure(format!(
            "Error: EventCode {} is not supported",
            decision.event_code().as_str()
        )),
    }
}

/// Run one unary response RPC under the standard deadline. Transport
/// errors and timeouts become failure results; they are outcome-record
/// material, never session errors.
async fn unary<F>(call: F) -> PbResponseResult
where
    F: Future<Output = Result<Response<PbResponseResult>, Status>>,
{
    match tokio::time::timeout(Duration::from_secs(UNARY_RPC_TIMEOUT_SECS), call).await {
        Ok(Ok(response)) => response.into_inner(),
        Ok(Err(status)) => failure(format!("Error occurs: {}", status.message())),
        Err(_) => failure(format!(
            "Error occurs: no reply within {} seconds",
            UNARY_RPC_TIMEOUT_SECS
        )),
    }
}

pub(crate) fn failure(result_info: String) -> PbResponseResult {
    PbResponseResult {
        result_info,
        result: false,
    }
}

pub(crate) fn success(result_info: String) -> PbResponseResult {
    PbResponseResult {
        result_info,
        result: true,
    }
}
