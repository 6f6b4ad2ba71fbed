use super::*;

fn temp_agents_path(tag: &str) -> PathBuf {
    let unique = format!(
        "bastion-agents-{}-{}.jsonl",
        tag,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
    );
    std::env::temp_dir().join(unique)
}

fn descriptor(name: &str, host: &str, port: &str) -> AgentDescriptor {
    AgentDescriptor {
        computer_name: name.to_string(),
        agent_host: host.to_string(),
        agent_port: port.to_string(),
    }
}

fn read_back(path: &Path) -> Vec<AgentDescriptor> {
    let contents = fs::read_to_string(path).unwrap_or_default();
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("persisted descriptor parses"))
        .collect()
}

#[test]
fn descriptor_json_round_trip_is_identity() {
    let original = descriptor("H1", "10.0.0.1", "7001");
    let line = serde_json::to_string(&original).expect("serialize");
    assert_eq!(
        line,
        r#"{"ComputerName":"H1","AgentHost":"10.0.0.1","AgentPort":"7001"}"#
    );
    let parsed: AgentDescriptor = serde_json::from_str(&line).expect("parse");
    assert_eq!(parsed, original);
}

#[test]
fn missing_file_loads_empty_registry() {
    let registry = AgentRegistry::load(temp_agents_path("missing"));
    assert!(registry.descriptors().is_empty());
    assert!(registry.lookup("H1").is_none());
}

#[test]
fn unknown_agent_is_appended_to_memory_and_file() {
    let path = temp_agents_path("append");
    let mut registry = AgentRegistry::load(&path);

    let change = registry.apply_check_in(descriptor("H1", "10.0.0.1", "7001"));
    assert_eq!(change, CheckInChange::Added);
    let change = registry.apply_check_in(descriptor("H2", "10.0.0.2", "7001"));
    assert_eq!(change, CheckInChange::Added);

    assert_eq!(read_back(&path), registry.descriptors());

    let _ = fs::remove_file(path);
}

#[test]
fn changed_address_updates_descriptor_and_rewrites_file() {
    let path = temp_agents_path("update");
    let mut registry = AgentRegistry::load(&path);
    let _ = registry.apply_check_in(descriptor("H1", "10.0.0.1", "7001"));
    let _ = registry.apply_check_in(descriptor("H2", "10.0.0.2", "7001"));

    let change = registry.apply_check_in(descriptor("H1", "10.0.0.9", "7001"));
    assert_eq!(change, CheckInChange::Updated);

    // Exactly one entry per ComputerName, equal to the latest check-in.
    let persisted = read_back(&path);
    assert_eq!(persisted.len(), 2);
    assert_eq!(persisted[0], descriptor("H1", "10.0.0.9", "7001"));
    assert_eq!(persisted[1], descriptor("H2", "10.0.0.2", "7001"));

    let _ = fs::remove_file(path);
}

#[test]
fn unchanged_check_in_leaves_the_file_alone() {
    let path = temp_agents_path("unchanged");
    let mut registry = AgentRegistry::load(&path);
    let _ = registry.apply_check_in(descriptor("H1", "10.0.0.1", "7001"));

    let change = registry.apply_check_in(descriptor("H1", "10.0.0.1", "7001"));
    assert_eq!(change, CheckInChange::Unchanged);
    assert_eq!(read_back(&path), &[descriptor("H1", "10.0.0.1", "7001")]);

    let _ = fs::remove_file(path);
}

#[test]
fn load_round_trips_persisted_descriptors() {
    let path = temp_agents_path("roundtrip");
    {
        let mut registry = AgentRegistry::load(&path);
        let _ = registry.apply_check_in(descriptor("H1", "10.0.0.1", "7001"));
        let _ = registry.apply_check_in(descriptor("H2", "10.0.0.2", "7002"));
    }

    let reloaded = AgentRegistry::load(&path);
    assert_eq!(
        reloaded.descriptors(),
        &[
            descriptor("H1", "10.0.0.1", "7001"),
            descriptor("H2", "10.0.0.2", "7002"),
        ]
    );

    let _ = fs::remove_file(path);
}

#[test]
fn load_skips_unparseable_lines() {
    let path = temp_agents_path("skip");
    let good = serde_json::to_string(&descriptor("H1", "10.0.0.1", "7001")).expect("serialize");
    fs::write(&path, format!("garbage\n{}\n", good)).expect("seed file");

    let registry = AgentRegistry::load(&path);
    assert_eq!(registry.descriptors(), &[descriptor("H1", "10.0.0.1", "7001")]);

    let _ = fs::remove_file(path);
}

#[tokio::test]
async fn dial_failure_leaves_connection_absent_but_descriptor_stored() {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe port");
    let port = probe.local_addr().expect("local addr").port().to_string();
    drop(probe);

    let path = temp_agents_path("dial-fail");
    let mut registry = AgentRegistry::load(&path);
    let change = registry
        .check_in(descriptor("H1", "127.0.0.1", &port))
        .await;

    assert_eq!(change, CheckInChange::Added);
    assert_eq!(registry.descriptors().len(), 1);
    assert!(registry.lookup("H1").is_none());

    let _ = fs::remove_file(path);
}
