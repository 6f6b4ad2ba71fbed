use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One telemetry record: a flat field-name to field-value mapping.
///
/// The collector emits JSON objects whose values may be strings or bare
/// numbers; every value is coerced to its string rendering on parse so the
/// pattern language and the persisted formats see a uniform view. A field
/// that is absent reads as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryRecord {
    fields: BTreeMap<String, String>,
}

impl TelemetryRecord {
    pub fn parse(line: &str) -> Result<Self> {
        let object: serde_json::Map<String, Value> =
            serde_json::from_str(line.trim()).context("telemetry line is not a JSON object")?;

        let mut fields = BTreeMap::new();
        for (key, value) in object {
            fields.insert(key, scalar_to_string(&value));
        }
        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.fields.insert(key.to_string(), value.to_string());
    }

    pub fn computer_name(&self) -> &str {
        self.get("ComputerName")
    }

    pub fn event_code(&self) -> &str {
        self.get("EventCode")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }
}

impl<const N: usize> From<[(&str, &str); N]> for TelemetryRecord {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut fields = BTreeMap::new();
        for (key, value) in pairs {
            fields.insert(key.to_string(), value.to_string());
        }
        Self { fields }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(v) => v.clone(),
        Value::Null => String::new(),
        Value::Bool(v) => v.to_string(),
        Value::Number(v) => v.to_string(),
        compound => compound.to_string(),
    }
}

/// Telemetry event family. Only the codes the dispatcher can act on get a
/// named variant; everything else is carried verbatim so unsupported codes
/// surface in outcome records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventCode {
    ProcessCreate,
    NetworkConnect,
    ImageLoad,
    RemoteThread,
    RawAccessRead,
    ProcessAccess,
    FileCreate,
    RegistryKey,
    RegistryValueSet,
    RegistryRename,
    Other(String),
}

impl EventCode {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "1" => Self::ProcessCreate,
            "3" => Self::NetworkConnect,
            "7" => Self::ImageLoad,
            "8" => Self::RemoteThread,
            "9" => Self::RawAccessRead,
            "10" => Self::ProcessAccess,
            "11" => Self::FileCreate,
            "12" => Self::RegistryKey,
            "13" => Self::RegistryValueSet,
            "14" => Self::RegistryRename,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ProcessCreate => "1",
            Self::NetworkConnect => "3",
            Self::ImageLoad => "7",
            Self::RemoteThread => "8",
            Self::RawAccessRead => "9",
            Self::ProcessAccess => "10",
            Self::FileCreate => "11",
            Self::RegistryKey => "12",
            Self::RegistryValueSet => "13",
            Self::RegistryRename => "14",
            Self::Other(raw) => raw,
        }
    }
}

/// Typed view of one record's event-specific fields, keyed by event code.
/// The matcher works on the generic field view; the dispatcher works on
/// this envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    ProcessCreate {
        process_id: String,
        image: String,
    },
    NetworkConnect {
        process_id: String,
        source_ip: String,
        source_port: String,
        destination_ip: String,
        destination_port: String,
    },
    ImageLoad {
        process_id: String,
        image_loaded: String,
    },
    RemoteThread {
        source_process_id: String,
    },
    RawAccessRead {
        process_id: String,
    },
    ProcessAccess {
        process_id: String,
    },
    FileCreate {
        target_filename: String,
    },
    RegistryKey {
        target_object: String,
    },
    RegistryValueSet {
        target_object: String,
    },
    RegistryRename {
        event_type: String,
        target_object: String,
        new_name: String,
    },
}

impl HostEvent {
    /// `None` when the record carries an event code with no typed variant.
    pub fn from_record(record: &TelemetryRecord) -> Option<Self> {
        let event = match EventCode::parse(record.event_code()) {
            EventCode::ProcessCreate => Self::ProcessCreate {
                process_id: record.get("ProcessId").to_string(),
                image: record.get("Image").to_string(),
            },
            EventCode::NetworkConnect => Self::NetworkConnect {
                process_id: record.get("ProcessId").to_string(),
                source_ip: record.get("SourceIp").to_string(),
                source_port: record.get("SourcePort").to_string(),
                destination_ip: record.get("DestinationIp").to_string(),
                destination_port: record.get("DestinationPort").to_string(),
            },
            EventCode::ImageLoad => Self::ImageLoad {
                process_id: record.get("ProcessId").to_string(),
                image_loaded: record.get("ImageLoaded").to_string(),
            },
            EventCode::RemoteThread => Self::RemoteThread {
                source_process_id: record.get("SourceProcessId").to_string(),
            },
            EventCode::RawAccessRead => Self::RawAccessRead {
                process_id: record.get("ProcessId").to_string(),
            },
            EventCode::ProcessAccess => Self::ProcessAccess {
                process_id: record.get("ProcessId").to_string(),
            },
            EventCode::FileCreate => Self::FileCreate {
                target_filename: record.get("TargetFilename").to_string(),
            },
            EventCode::RegistryKey => Self::RegistryKey {
                target_object: record.get("TargetObject").to_string(),
            },
            EventCode::RegistryValueSet => Self::RegistryValueSet {
                target_object: record.get("TargetObject").to_string(),
            },
            EventCode::RegistryRename => Self::RegistryRename {
                event_type: record.get("EventType").to_string(),
                target_object: record.get("TargetObject").to_string(),
                new_name: record.get("NewName").to_string(),
            },
            EventCode::Other(_) => return None,
        };
        Some(event)
    }
}

/// Response verb carried by a rule or injected by an administrator.
/// Unknown verbs are preserved so the agent can report them unsupported
/// instead of the server silently dropping the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionVerb {
    Kill,
    KillTree,
    Suspend,
    Delete,
    BlockSrcIp,
    BlockDstIp,
    GetFile,
    Disable,
    Enable,
    Other(String),
}

impl ActionVerb {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "kill" => Self::Kill,
            "killtree" => Self::KillTree,
            "suspend" => Self::Suspend,
            "delete" => Self::Delete,
            "block_src_ip" => Self::BlockSrcIp,
            "block_dst_ip" => Self::BlockDstIp,
            "getfile" => Self::GetFile,
            "disable" => Self::Disable,
            "enable" => Self::Enable,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Kill => "kill",
            Self::KillTree => "killtree",
            Self::Suspend => "suspend",
            Self::Delete => "delete",
            Self::BlockSrcIp => "block_src_ip",
            Self::BlockDstIp => "block_dst_ip",
            Self::GetFile => "getfile",
            Self::Disable => "disable",
            Self::Enable => "enable",
            Self::Other(raw) => raw,
        }
    }
}

/// A telemetry record annotated with a firing rule's `Type`, `Message` and
/// `Action` (or carrying an administrator-injected `Action`). The unit the
/// dispatcher consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    record: TelemetryRecord,
}

impl Decision {
    /// Wrap a record that already carries an `Action` field.
    pub fn from_record(record: TelemetryRecord) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &TelemetryRecord {
        &self.record
    }

    pub fn into_record(self) -> TelemetryRecord {
        self.record
    }

    pub fn verb(&self) -> ActionVerb {
        ActionVerb::parse(self.record.get("Action"))
    }

    pub fn event_code(&self) -> EventCode {
        EventCode::parse(self.record.event_code())
    }

    pub fn computer_name(&self) -> &str {
        self.record.computer_name()
    }

    pub fn event(&self) -> Option<HostEvent> {
        HostEvent::from_record(&self.record)
    }
}
