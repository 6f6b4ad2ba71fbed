use super::*;

fn temp_config(tag: &str, contents: &str) -> PathBuf {
    let unique = format!(
        "bastion-agent-config-{}-{}.conf",
        tag,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
    );
    let path = std::env::temp_dir().join(unique);
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn loads_first_element_of_agent_config_array() {
    let path = temp_config(
        "ok",
        r#"{"AgentConfig":[{"AdapterInternet":"Ethernet","ServerHost":"10.0.0.1","ServerPort":"8085","AgentHost":"10.0.0.7","AgentPort":"7001"}]}"#,
    );

    let config = AgentConfig::load_from(&path).expect("load");
    assert_eq!(config.adapter_internet, "Ethernet");
    assert_eq!(config.server_addr(), "10.0.0.1:8085");
    assert_eq!(config.agent_addr(), "10.0.0.7:7001");

    let _ = fs::remove_file(path);
}

#[test]
fn missing_file_is_an_error() {
    let path = std::env::temp_dir().join("bastion-agent-config-definitely-missing.conf");
    let err = AgentConfig::load_from(&path).expect_err("missing config");
    assert!(err.to_string().contains("failed reading agent config"));
}

#[test]
fn malformed_json_is_an_error() {
    let path = temp_config("bad", "{not json");
    let err = AgentConfig::load_from(&path).expect_err("malformed config");
    assert!(err.to_string().contains("failed parsing agent config"));
    let _ = fs::remove_file(path);
}

#[test]
fn empty_array_is_an_error() {
    let path = temp_config("empty", r#"{"AgentConfig":[]}"#);
    let err = AgentConfig::load_from(&path).expect_err("empty array");
    assert!(err.to_string().contains("empty AgentConfig array"));
    let _ = fs::remove_file(path);
}
