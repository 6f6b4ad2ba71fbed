use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

use agent_rpc::pb::manager_server::{Manager, ManagerServer};
use agent_rpc::pb::{
    EventCode10Request, EventCode11Request, EventCode12Request, EventCode13Request,
    EventCode14Request, EventCode1Request, EventCode3Request, EventCode7Request,
    EventCode8Request, EventCode9Request, FileData, FileInfo, NetworkAdapterRequest,
    ResponseResult as PbResponseResult,
};
use agent_rpc::FILE_CHUNK_BYTES;
use response::{AdapterState, Direction, ResponseError, ResponseResult};

/// Seam between the RPC handlers and the OS. Handlers are tested against a
/// recording mock; the shipped agent uses [`OsActions`].
pub trait HostActions: Send + Sync {
    fn kill(&self, pid: u32) -> ResponseResult<()>;
    fn kill_tree(&self, pid: u32) -> ResponseResult<()>;
    fn suspend(&self, pid: u32) -> ResponseResult<()>;
    fn delete_file(&self, path: &str) -> ResponseResult<()>;
    fn block_ip(&self, direction: Direction, ip: &str) -> ResponseResult<()>;
    fn delete_registry_key(&self, target_object: &str) -> ResponseResult<()>;
    fn delete_registry_value(&self, target_object: &str) -> ResponseResult<()>;
    fn set_adapter(&self, name: &str, state: AdapterState) -> ResponseResult<()>;
}

pub struct OsActions;

impl HostActions for OsActions {
    fn kill(&self, pid: u32) -> ResponseResult<()> {
        response::kill_process(pid)
    }

    fn kill_tree(&self, pid: u32) -> ResponseResult<()> {
        response::kill_process_tree(pid).map(|_| ())
    }

    fn suspend(&self, pid: u32) -> ResponseResult<()> {
        response::suspend_process(pid)
    }

    fn delete_file(&self, path: &str) -> ResponseResult<()> {
        response::delete_file(path)
    }

    fn block_ip(&self, direction: Direction, ip: &str) -> ResponseResult<()> {
        response::block_ip(direction, ip)
    }

    fn delete_registry_key(&self, target_object: &str) -> ResponseResult<()> {
        response::delete_registry_key(target_object)
    }

    fn delete_registry_value(&self, target_object: &str) -> ResponseResult<()> {
        response::delete_registry_value(target_object)
    }

    fn set_adapter(&self, name: &str, state: AdapterState) -> ResponseResult<()> {
        response::set_adapter(name, state)
    }
}

/// The agent's `Manager` service. Each handler switches on the decision's
/// action verb, performs the OS action, and answers with a
/// `ResponseResult`; semantic failures are reported in the reply, never
/// as a transport error.
pub struct AgentService {
    adapter_name: String,
    actions: Arc<dyn HostActions>,
}

impl AgentService {
    pub fn new(adapter_name: String) -> Self {
        Self::with_actions(adapter_name, Arc::new(OsActions))
    }

    pub fn with_actions(adapter_name: String, actions: Arc<dyn HostActions>) -> Self {
        Self {
            adapter_name,
            actions,
        }
    }

    pub fn into_server(self) -> ManagerServer<Self> {
        ManagerServer::new(self)
    }

    /// kill / killtree on a pid, shared by every process-shaped event
    /// code. Only process creation additionally supports `suspend`; that
    /// branch lives in its handler.
    fn process_verbs(&self, action: &str, pid_raw: &str, event_code: &str) -> PbResponseResult {
        match action {
            "kill" => match self.parsed_pid(pid_raw).and_then(|pid| self.actions.kill(pid)) {
                Ok(()) => success(format!("Success kills ProcessId {}", pid_raw)),
                Err(err) => failure(format!("Error kills ProcessId {}: {}", pid_raw, err)),
            },
            "killtree" => match self
                .parsed_pid(pid_raw)
                .and_then(|pid| self.actions.kill_tree(pid))
            {
                Ok(()) => success(format!("Success kills tree ProcessId {}", pid_raw)),
                Err(err) => failure(format!("Error kills tree ProcessId {}: {}", pid_raw, err)),
            },
            other => unsupported(other, event_code),
        }
    }

    fn delete_file_result(&self, path: &str) -> PbResponseResult {
        match self.actions.delete_file(path) {
            Ok(()) => success(format!("Success deletes file {}", path)),
            Err(err) => failure(format!("Error deletes file {}: {}", path, err)),
        }
    }

    fn delete_registry_key_result(&self, target_object: &str) -> PbResponseResult {
        match self.actions.delete_registry_key(target_object) {
            Ok(()) => success(format!("Success deletes Registry Key {}", target_object)),
            Err(err) => failure(format!(
                "Error deletes Registry Key {}: {}",
                target_object, err
            )),
        }
    }

    fn parsed_pid(&self, raw: &str) -> ResponseResult<u32> {
        raw.trim()
            .parse::<u32>()
            .map_err(|_| ResponseError::InvalidInput(format!("ProcessId {:?} is not a pid", raw)))
    }
}

fn success(result_info: String) -> PbResponseResult {
    info!(result = %result_info, "response action completed");
    PbResponseResult {
        result_info,
        result: true,
    }
}

fn failure(result_info: String) -> PbResponseResult {
    warn!(result = %result_info, "response action failed");
    PbResponseResult {
        result_info,
        result: false,
    }
}

fn unsupported(action: &str, event_code: &str) -> PbResponseResult {
    failure(format!(
        "Error: Action {} is not supported for EventCode {}",
        action, event_code
    ))
}

#[tonic::async_trait]
impl Manager for AgentService {
    /// Process creation: kill / killtree / suspend.
    async fn event_code1(
        &self,
        request: Request<EventCode1Request>,
    ) -> Result<Response<PbResponseResult>, Status> {
        let req = request.into_inner();
        let result = match req.action.as_str() {
            "suspend" => match self
                .parsed_pid(&req.process_id)
                .and_then(|pid| self.actions.suspend(pid))
            {
                Ok(()) => success(format!("Success suspends ProcessId {}", req.process_id)),
                Err(err) => failure(format!(
                    "Error suspends ProcessId {}: {}",
                    req.process_id, err
                )),
            },
            _ => self.process_verbs(&req.action, &req.process_id, "1"),
        };
        Ok(Response::new(result))
    }

    /// Network connection: kill / killtree / block_src_ip / block_dst_ip.
    async fn event_code3(
        &self,
        request: Request<EventCode3Request>,
    ) -> Result<Response<PbResponseResult>, Status> {
        let req = request.into_inner();
        let result = match req.action.as_str() {
            "block_src_ip" => match self.actions.block_ip(Direction::Inbound, &req.source_ip) {
                Ok(()) => success(format!("Success blocks inbound ip {}", req.source_ip)),
                Err(err) => failure(format!(
                    "Error blocks inbound ip {}: {}",
                    req.source_ip, err
                )),
            },
            "block_dst_ip" => match self
                .actions
                .block_ip(Direction::Outbound, &req.destination_ip)
            {
                Ok(()) => success(format!("Success blocks outbound ip {}", req.destination_ip)),
                Err(err) => failure(format!(
                    "Error blocks outbound ip {}: {}",
                    req.destination_ip, err
                )),
            },
            _ => self.process_verbs(&req.action, &req.process_id, "3"),
        };
        Ok(Response::new(result))
    }

    /// Image load: kill / killtree / delete the loaded image file.
    async fn event_code7(
        &self,
        request: Request<EventCode7Request>,
    ) -> Result<Response<PbResponseResult>, Status> {
        let req = request.into_inner();
        let result = match req.action.as_str() {
            "delete" => self.delete_file_result(&req.image_loaded),
            _ => self.process_verbs(&req.action, &req.process_id, "7"),
        };
        Ok(Response::new(result))
    }

    /// CreateRemoteThread: kill / killtree on the injecting process.
    async fn event_code8(
        &self,
        request: Request<EventCode8Request>,
    ) -> Result<Response<PbResponseResult>, Status> {
        let req = request.into_inner();
        Ok(Response::new(self.process_verbs(
            &req.action,
            &req.source_process_id,
            "8",
        )))
    }

    /// RawAccessRead: kill / killtree.
    async fn event_code9(
        &self,
        request: Request<EventCode9Request>,
    ) -> Result<Response<PbResponseResult>, Status> {
        let req = request.into_inner();
        Ok(Response::new(self.process_verbs(
            &req.action,
            &req.process_id,
            "9",
        )))
    }

    /// ProcessAccess: kill / killtree.
    async fn event_code10(
        &self,
        request: Request<EventCode10Request>,
    ) -> Result<Response<PbResponseResult>, Status> {
        let req = request.into_inner();
        Ok(Response::new(self.process_verbs(
            &req.action,
            &req.process_id,
            "10",
        )))
    }

    /// FileCreate: delete the created file.
    async fn event_code11(
        &self,
        request: Request<EventCode11Request>,
    ) -> Result<Response<PbResponseResult>, Status> {
        let req = request.into_inner();
        let result = match req.action.as_str() {
            "delete" => self.delete_file_result(&req.target_filename),
            other => unsupported(other, "11"),
        };
        Ok(Response::new(result))
    }

    /// Registry key create/delete event: delete the key.
    async fn event_code12(
        &self,
        request: Request<EventCode12Request>,
    ) -> Result<Response<PbResponseResult>, Status> {
        let req = request.into_inner();
        let result = match req.action.as_str() {
            "delete" => self.delete_registry_key_result(&req.target_object),
            other => unsupported(other, "12"),
        };
        Ok(Response::new(result))
    }

    /// Registry value set: delete the value inside its key.
    async fn event_code13(
        &self,
        request: Request<EventCode13Request>,
    ) -> Result<Response<PbResponseResult>, Status> {
        let req = request.into_inner();
        let result = match req.action.as_str() {
            "delete" => match self.actions.delete_registry_value(&req.target_object) {
                Ok(()) => success(format!(
                    "Success deletes Registry Value {}",
                    req.target_object
                )),
                Err(err) => failure(format!(
                    "Error deletes Registry Value {}: {}",
                    req.target_object, err
                )),
            },
            other => unsupported(other, "13"),
        };
        Ok(Response::new(result))
    }

    /// Registry rename: delete the key under its new name.
    async fn event_code14(
        &self,
        request: Request<EventCode14Request>,
    ) -> Result<Response<PbResponseResult>, Status> {
        let req = request.into_inner();
        let result = match req.action.as_str() {
            "delete" => self.delete_registry_key_result(&req.new_name),
            other => unsupported(other, "14"),
        };
        Ok(Response::new(result))
    }

    /// Toggle the configured internet adapter.
    async fn network_adapter(
        &self,
        request: Request<NetworkAdapterRequest>,
    ) -> Result<Response<PbResponseResult>, Status> {
        let req = request.into_inner();
        let result = match req.action.as_str() {
            "disable" => match self
                .actions
                .set_adapter(&self.adapter_name, AdapterState::Disable)
            {
                Ok(()) => success(format!(
                    "Success disable Network Adapter {}",
                    self.adapter_name
                )),
                Err(err) => failure(format!(
                    "Error disable Network Adapter {}: {}",
                    self.adapter_name, err
                )),
            },
            "enable" => match self
                .actions
                .set_adapter(&self.adapter_name, AdapterState::Enable)
            {
                Ok(()) => success(format!(
                    "Success enable Network Adapter {}",
                    self.adapter_name
                )),
                Err(err) => failure(format!(
                    "Error enable Network Adapter {}: {}",
                    self.adapter_name, err
                )),
            },
            other => failure(format!(
                "Error: Action {} is not supported for Network Adapter",
                other
            )),
        };
        Ok(Response::new(result))
    }

    type GetFileStream = ReceiverStream<Result<FileData, Status>>;

    /// Stream a file back to the control plane in chunks of at most
    /// 64 KiB. EOF ends the stream cleanly; a read error mid-stream aborts
    /// it with a status the server records as the outcome failure.
    async fn get_file(
        &self,
        request: Request<FileInfo>,
    ) -> Result<Response<Self::GetFileStream>, Status> {
        let file_path = request.into_inner().file_path;
        let mut file = tokio::fs::File::open(&file_path)
            .await
            .map_err(|err| Status::not_found(format!("open {}: {}", file_path, err)))?;

        let (tx, rx) = mpsc::channel::<Result<FileData, Status>>(4);
        tokio::spawn(async move {
            let mut buffer = vec![0u8; FILE_CHUNK_BYTES];
            loop {
                match file.read(&mut buffer).await {
                    Ok(0) => break,
                    Ok(read) => {
                        let chunk = FileData {
                            file_chunk: buffer[..read].to_vec(),
                        };
                        if tx.send(Ok(chunk)).await.is_err() {
                            // Receiver hung up; stop reading.
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = tx
                            .send(Err(Status::internal(format!(
                                "read {}: {}",
                                file_path, err
                            ))))
                            .await;
                        break;
                    }
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests;
