use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::rule::Rule;
use crate::types::{Decision, TelemetryRecord};

fn same_field_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\$[A-Za-z]+\$$").expect("same-field marker regex"))
}

fn different_field_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\$\$[A-Za-z]+\$$").expect("different-field marker regex"))
}

enum PatternMode {
    /// `$Key$`: this field must equal the record's `Key` field.
    SameField(String),
    /// `$$Key$`: this field must differ from the record's `Key` field.
    DifferentField(String),
    /// Anything else compiles as a regular expression and must find a
    /// match anywhere in the field value.
    Regex,
}

fn classify(pattern: &str) -> PatternMode {
    if same_field_marker().is_match(pattern) {
        PatternMode::SameField(pattern.replace('$', ""))
    } else if different_field_marker().is_match(pattern) {
        PatternMode::DifferentField(pattern.replace('$', ""))
    } else {
        PatternMode::Regex
    }
}

/// Whether `rule` captures `record`.
///
/// The `EventCode` entry is a strict string-equality pre-filter; no pattern
/// in `Data` is evaluated for a record of another event code, so a rule
/// with an uncompilable regex can never disturb unrelated records. A
/// malformed regex is a rule-authoring error: it is logged and the rule
/// treated as non-matching for the current record.
pub fn rule_matches(record: &TelemetryRecord, rule: &Rule) -> bool {
    if record.event_code() != rule.event_code() {
        return false;
    }

    for (key, pattern) in &rule.data {
        if key == "EventCode" {
            continue;
        }

        match classify(pattern) {
            PatternMode::SameField(other) => {
                if record.get(key) != record.get(&other) {
                    return false;
                }
            }
            PatternMode::DifferentField(other) => {
                if record.get(key) == record.get(&other) {
                    return false;
                }
            }
            PatternMode::Regex => match Regex::new(pattern) {
                Ok(re) => {
                    if !re.is_match(record.get(key)) {
                        return false;
                    }
                }
                Err(err) => {
                    warn!(
                        rule_type = %rule.rule_type,
                        field = %key,
                        error = %err,
                        "rule pattern does not compile, treating rule as non-matching"
                    );
                    return false;
                }
            },
        }
    }

    true
}

/// Evaluate one record against the catalog, emitting one decision per
/// matching rule in catalog order. The decision carries a copy of the
/// record with the rule's `Type`, `Message` and `Action` written in.
pub fn evaluate(record: &TelemetryRecord, rules: &[Rule]) -> Vec<Decision> {
    let mut decisions = Vec::new();
    for rule in rules {
        if rule_matches(record, rule) {
            let mut enriched = record.clone();
            enriched.insert("Type", &rule.rule_type);
            enriched.insert("Message", &rule.message);
            enriched.insert("Action", &rule.action);
            decisions.push(Decision::from_record(enriched));
        }
    }
    decisions
}
