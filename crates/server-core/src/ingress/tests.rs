use super::*;

#[test]
fn peer_host_selects_the_session_kind() {
    let splunk = "10.0.0.2";
    assert_eq!(
        session_kind("10.0.0.2".parse().expect("ip"), splunk),
        SessionKind::Telemetry
    );
    assert_eq!(
        session_kind("10.0.0.7".parse().expect("ip"), splunk),
        SessionKind::AgentCheckIn
    );
}

#[test]
fn normalize_unwraps_the_double_quoted_data_object() {
    let raw = r#"{"Action Rule":"add","Type":"T","Message":"M","Action":"kill","Data":"{\"EventCode\":\"1\",\"Image\":\"evil\"}"}"#;
    let normalized = normalize_rule_frame(raw);
    assert_eq!(
        normalized,
        r#"{"Action Rule":"add","Type":"T","Message":"M","Action":"kill","Data":{"EventCode":"1","Image":"evil"}}"#
    );
}

#[test]
fn parse_rule_mutation_reads_verb_and_rule() {
    let raw = r#"{"Action Rule":"add","Type":"T","Message":"M","Action":"kill","Data":"{\"EventCode\":\"1\",\"Image\":\"evil\"}"}"#;
    let (mutation, rule) = parse_rule_mutation(raw).expect("parse");

    assert_eq!(mutation, RuleMutation::Add);
    assert_eq!(rule.rule_type, "T");
    assert_eq!(rule.action, "kill");
    assert_eq!(rule.event_code(), "1");
    assert_eq!(rule.data.get("Image").map(String::as_str), Some("evil"));
}

#[test]
fn parse_rule_mutation_handles_delete_and_plain_frames() {
    // A frame whose Data is already a plain object normalizes to itself.
    let raw = r#"{"Action Rule":"delete","Type":"T","Message":"M","Action":"kill","Data":{"EventCode":"1"}}"#;
    let (mutation, rule) = parse_rule_mutation(raw).expect("parse");
    assert_eq!(mutation, RuleMutation::Delete);
    assert_eq!(rule.event_code(), "1");
}

#[test]
fn parse_rule_mutation_rejects_unknown_verbs() {
    let raw = r#"{"Action Rule":"upsert","Type":"T","Message":"M","Action":"kill","Data":{"EventCode":"1"}}"#;
    let err = parse_rule_mutation(raw).expect_err("unknown verb");
    assert!(err.to_string().contains("unknown rule mutation"));
}

#[test]
fn parse_rule_mutation_requires_the_verb_key() {
    let raw = r#"{"Type":"T","Message":"M","Action":"kill","Data":{"EventCode":"1"}}"#;
    let err = parse_rule_mutation(raw).expect_err("missing verb");
    assert!(err.to_string().contains("no Action Rule"));
}
