use std::sync::Mutex;

use tokio_stream::StreamExt;

use super::*;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Kill(u32),
    KillTree(u32),
    Suspend(u32),
    DeleteFile(String),
    BlockIp(Direction, String),
    DeleteRegistryKey(String),
    DeleteRegistryValue(String),
    SetAdapter(String, AdapterState),
}

#[derive(Default)]
struct MockActions {
    calls: Mutex<Vec<Call>>,
    fail_with: Option<String>,
}

impl MockActions {
    fn failing(message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        }
    }

    fn record(&self, call: Call) -> ResponseResult<()> {
        self.calls.lock().expect("mock lock").push(call);
        match &self.fail_with {
            Some(message) => Err(ResponseError::Command(message.clone())),
            None => Ok(()),
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("mock lock").clone()
    }
}

impl HostActions for MockActions {
    fn kill(&self, pid: u32) -> ResponseResult<()> {
        self.record(Call::Kill(pid))
    }

    fn kill_tree(&self, pid: u32) -> ResponseResult<()> {
        self.record(Call::KillTree(pid))
    }

    fn suspend(&self, pid: u32) -> ResponseResult<()> {
        self.record(Call::Suspend(pid))
    }

    fn delete_file(&self, path: &str) -> ResponseResult<()> {
        self.record(Call::DeleteFile(path.to_string()))
    }

    fn block_ip(&self, direction: Direction, ip: &str) -> ResponseResult<()> {
        self.record(Call::BlockIp(direction, ip.to_string()))
    }

    fn delete_registry_key(&self, target_object: &str) -> ResponseResult<()> {
        self.record(Call::DeleteRegistryKey(target_object.to_string()))
    }

    fn delete_registry_value(&self, target_object: &str) -> ResponseResult<()> {
        self.record(Call::DeleteRegistryValue(target_object.to_string()))
    }

    fn set_adapter(&self, name: &str, state: AdapterState) -> ResponseResult<()> {
        self.record(Call::SetAdapter(name.to_string(), state))
    }
}

fn service_with(actions: Arc<MockActions>) -> AgentService {
    AgentService::with_actions("Ethernet".to_string(), actions)
}

#[tokio::test]
async fn kill_reports_the_original_success_text() {
    let actions = Arc::new(MockActions::default());
    let service = service_with(actions.clone());

    let reply = service
        .event_code1(Request::new(EventCode1Request {
            process_id: "42".to_string(),
            action: "kill".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();

    assert!(reply.result);
    assert_eq!(reply.result_info, "Success kills ProcessId 42");
    assert_eq!(actions.calls(), vec![Call::Kill(42)]);
}

#[tokio::test]
async fn killtree_and_suspend_route_to_their_actions() {
    let actions = Arc::new(MockActions::default());
    let service = service_with(actions.clone());

    let reply = service
        .event_code1(Request::new(EventCode1Request {
            process_id: "42".to_string(),
            action: "killtree".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();
    assert_eq!(reply.result_info, "Success kills tree ProcessId 42");

    let reply = service
        .event_code1(Request::new(EventCode1Request {
            process_id: "42".to_string(),
            action: "suspend".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();
    assert_eq!(reply.result_info, "Success suspends ProcessId 42");

    assert_eq!(actions.calls(), vec![Call::KillTree(42), Call::Suspend(42)]);
}

#[tokio::test]
async fn suspend_is_only_supported_for_process_creation() {
    let actions = Arc::new(MockActions::default());
    let service = service_with(actions.clone());

    let reply = service
        .event_code3(Request::new(EventCode3Request {
            process_id: "42".to_string(),
            source_ip: "10.0.0.5".to_string(),
            source_port: "49152".to_string(),
            destination_ip: "203.0.113.9".to_string(),
            destination_port: "443".to_string(),
            action: "suspend".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();
    assert!(!reply.result);
    assert_eq!(
        reply.result_info,
        "Error: Action suspend is not supported for EventCode 3"
    );

    let reply = service
        .event_code7(Request::new(EventCode7Request {
            process_id: "42".to_string(),
            image_loaded: r"C:\x\evil.dll".to_string(),
            action: "suspend".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();
    assert_eq!(
        reply.result_info,
        "Error: Action suspend is not supported for EventCode 7"
    );

    let reply = service
        .event_code8(Request::new(EventCode8Request {
            source_process_id: "42".to_string(),
            action: "suspend".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();
    assert_eq!(
        reply.result_info,
        "Error: Action suspend is not supported for EventCode 8"
    );

    let reply = service
        .event_code9(Request::new(EventCode9Request {
            process_id: "42".to_string(),
            action: "suspend".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();
    assert_eq!(
        reply.result_info,
        "Error: Action suspend is not supported for EventCode 9"
    );

    let reply = service
        .event_code10(Request::new(EventCode10Request {
            process_id: "42".to_string(),
            action: "suspend".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();
    assert_eq!(
        reply.result_info,
        "Error: Action suspend is not supported for EventCode 10"
    );

    // The suspend action itself never reached the OS seam.
    assert!(actions.calls().is_empty());
}

#[tokio::test]
async fn os_failure_is_reported_not_raised() {
    let actions = Arc::new(MockActions::failing("access is denied"));
    let service = service_with(actions);

    let reply = service
        .event_code1(Request::new(EventCode1Request {
            process_id: "42".to_string(),
            action: "kill".to_string(),
        }))
        .await
        .expect("semantic failures stay in the reply")
        .into_inner();

    assert!(!reply.result);
    assert_eq!(
        reply.result_info,
        "Error kills ProcessId 42: access is denied"
    );
}

#[tokio::test]
async fn invalid_pid_fails_without_touching_the_os() {
    let actions = Arc::new(MockActions::default());
    let service = service_with(actions.clone());

    let reply = service
        .event_code1(Request::new(EventCode1Request {
            process_id: "forty-two".to_string(),
            action: "kill".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();

    assert!(!reply.result);
    assert!(reply.result_info.contains("is not a pid"));
    assert!(actions.calls().is_empty());
}

#[tokio::test]
async fn unsupported_verb_is_reported_per_event_code() {
    let actions = Arc::new(MockActions::default());
    let service = service_with(actions.clone());

    let reply = service
        .event_code11(Request::new(EventCode11Request {
            target_filename: r"C:\x\a.dat".to_string(),
            action: "kill".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();

    assert!(!reply.result);
    assert_eq!(
        reply.result_info,
        "Error: Action kill is not supported for EventCode 11"
    );
    assert!(actions.calls().is_empty());
}

#[tokio::test]
async fn event3_blocks_source_and_destination_ips() {
    let actions = Arc::new(MockActions::default());
    let service = service_with(actions.clone());

    let reply = service
        .event_code3(Request::new(EventCode3Request {
            process_id: "7".to_string(),
            source_ip: "10.0.0.5".to_string(),
            source_port: "49152".to_string(),
            destination_ip: "203.0.113.9".to_string(),
            destination_port: "443".to_string(),
            action: "block_src_ip".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();
    assert_eq!(reply.result_info, "Success blocks inbound ip 10.0.0.5");

    let reply = service
        .event_code3(Request::new(EventCode3Request {
            process_id: "7".to_string(),
            source_ip: "10.0.0.5".to_string(),
            source_port: "49152".to_string(),
            destination_ip: "203.0.113.9".to_string(),
            destination_port: "443".to_string(),
            action: "block_dst_ip".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();
    assert_eq!(reply.result_info, "Success blocks outbound ip 203.0.113.9");

    assert_eq!(
        actions.calls(),
        vec![
            Call::BlockIp(Direction::Inbound, "10.0.0.5".to_string()),
            Call::BlockIp(Direction::Outbound, "203.0.113.9".to_string()),
        ]
    );
}

#[tokio::test]
async fn delete_routes_by_event_code() {
    let actions = Arc::new(MockActions::default());
    let service = service_with(actions.clone());

    let _ = service
        .event_code7(Request::new(EventCode7Request {
            process_id: "7".to_string(),
            image_loaded: r"C:\x\evil.dll".to_string(),
            action: "delete".to_string(),
        }))
        .await
        .expect("rpc ok");

    let _ = service
        .event_code11(Request::new(EventCode11Request {
            target_filename: r"C:\x\drop.dat".to_string(),
            action: "delete".to_string(),
        }))
        .await
        .expect("rpc ok");

    let _ = service
        .event_code12(Request::new(EventCode12Request {
            target_object: r"HKLM\Software\Evil".to_string(),
            action: "delete".to_string(),
        }))
        .await
        .expect("rpc ok");

    let _ = service
        .event_code13(Request::new(EventCode13Request {
            target_object: r"HKCU\Software\Run\badvalue".to_string(),
            action: "delete".to_string(),
        }))
        .await
        .expect("rpc ok");

    let _ = service
        .event_code14(Request::new(EventCode14Request {
            event_type: "RenameKey".to_string(),
            target_object: r"HKLM\Software\Old".to_string(),
            new_name: r"HKLM\Software\New".to_string(),
            action: "delete".to_string(),
        }))
        .await
        .expect("rpc ok");

    assert_eq!(
        actions.calls(),
        vec![
            Call::DeleteFile(r"C:\x\evil.dll".to_string()),
            Call::DeleteFile(r"C:\x\drop.dat".to_string()),
            Call::DeleteRegistryKey(r"HKLM\Software\Evil".to_string()),
            Call::DeleteRegistryValue(r"HKCU\Software\Run\badvalue".to_string()),
            Call::DeleteRegistryKey(r"HKLM\Software\New".to_string()),
        ]
    );
}

#[tokio::test]
async fn network_adapter_toggles_the_configured_interface() {
    let actions = Arc::new(MockActions::default());
    let service = service_with(actions.clone());

    let reply = service
        .network_adapter(Request::new(NetworkAdapterRequest {
            action: "disable".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();
    assert_eq!(reply.result_info, "Success disable Network Adapter Ethernet");

    let reply = service
        .network_adapter(Request::new(NetworkAdapterRequest {
            action: "enable".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();
    assert_eq!(reply.result_info, "Success enable Network Adapter Ethernet");

    let reply = service
        .network_adapter(Request::new(NetworkAdapterRequest {
            action: "reboot".to_string(),
        }))
        .await
        .expect("rpc ok")
        .into_inner();
    assert!(!reply.result);
    assert_eq!(
        reply.result_info,
        "Error: Action reboot is not supported for Network Adapter"
    );

    assert_eq!(
        actions.calls(),
        vec![
            Call::SetAdapter("Ethernet".to_string(), AdapterState::Disable),
            Call::SetAdapter("Ethernet".to_string(), AdapterState::Enable),
        ]
    );
}

#[tokio::test]
async fn get_file_streams_chunks_no_larger_than_the_contract() {
    let payload: Vec<u8> = (0..(FILE_CHUNK_BYTES + 10)).map(|i| (i % 251) as u8).collect();
    let path = std::env::temp_dir().join(format!(
        "bastion-getfile-{}.bin",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
    ));
    std::fs::write(&path, &payload).expect("seed file");

    let service = service_with(Arc::new(MockActions::default()));
    let response = service
        .get_file(Request::new(FileInfo {
            file_path: path.to_string_lossy().into_owned(),
        }))
        .await
        .expect("stream opens");

    let mut stream = response.into_inner();
    let mut received = Vec::new();
    let mut chunks = 0usize;
    while let Some(item) = stream.next().await {
        let chunk = item.expect("chunk ok");
        assert!(chunk.file_chunk.len() <= FILE_CHUNK_BYTES);
        received.extend_from_slice(&chunk.file_chunk);
        chunks += 1;
    }

    assert_eq!(chunks, 2);
    assert_eq!(received, payload);

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn get_file_rejects_missing_paths_up_front() {
    let service = service_with(Arc::new(MockActions::default()));
    let status = service
        .get_file(Request::new(FileInfo {
            file_path: "/definitely/not/here.bin".to_string(),
        }))
        .await
        .expect_err("missing file is a status error");

    assert_eq!(status.code(), tonic::Code::NotFound);
}
