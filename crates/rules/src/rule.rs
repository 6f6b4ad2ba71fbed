use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// An operator-authored detection rule.
///
/// `data` maps telemetry field names to match patterns (see the matcher for
/// the pattern language); `data["EventCode"]` is mandatory and acts as a
/// strict-equality pre-filter. Two rules are the same rule iff all four
/// attributes are structurally equal, which is what deletion keys on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "Type")]
    pub rule_type: String,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "Data", deserialize_with = "string_map_lenient")]
    pub data: BTreeMap<String, String>,
}

impl Rule {
    pub fn event_code(&self) -> &str {
        self.data.get("EventCode").map(String::as_str).unwrap_or("")
    }
}

/// Rule authors sometimes write numeric pattern values (`"EventCode": 1`);
/// coerce scalars to their string rendering rather than rejecting the rule.
fn string_map_lenient<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, Value> = BTreeMap::deserialize(deserializer)?;
    let mut out = BTreeMap::new();
    for (key, value) in raw {
        let rendered = match value {
            Value::String(v) => v,
            Value::Null => String::new(),
            Value::Bool(v) => v.to_string(),
            Value::Number(v) => v.to_string(),
            compound => compound.to_string(),
        };
        out.insert(key, rendered);
    }
    Ok(out)
}
