use crate::errors::ResponseResult;
use crate::runner::{CommandRunner, SystemRunner};
use crate::windows_cmd::REG_EXE;

/// Registry root resolved from the hive shortcut at the head of a
/// telemetry `TargetObject` path. Anything unrecognized falls back to the
/// current-config hive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hive {
    ClassesRoot,
    CurrentUser,
    LocalMachine,
    Users,
    CurrentConfig,
}

impl Hive {
    pub fn parse(shortcut: &str) -> Self {
        match shortcut {
            "HKCR" => Self::ClassesRoot,
            "HKCU" => Self::CurrentUser,
            "HKLM" => Self::LocalMachine,
            "HKU" => Self::Users,
            _ => Self::CurrentConfig,
        }
    }

    pub fn as_shortcut(self) -> &'static str {
        match self {
            Self::ClassesRoot => "HKCR",
            Self::CurrentUser => "HKCU",
            Self::LocalMachine => "HKLM",
            Self::Users => "HKU",
            Self::CurrentConfig => "HKCC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryKeyPath {
    pub hive: Hive,
    pub path: String,
}

impl RegistryKeyPath {
    fn qualified(&self) -> String {
        format!("{}\\{}", self.hive.as_shortcut(), self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryValuePath {
    pub hive: Hive,
    pub path: String,
    pub value_name: String,
}

/// Split `HIVE\key\subkey` into hive shortcut and key path.
pub fn split_key_path(target_object: &str) -> RegistryKeyPath {
    let mut segments = target_object.split('\\');
    let hive = Hive::parse(segments.next().unwrap_or(""));
    let path = segments.collect::<Vec<_>>().join("\\");
    RegistryKeyPath { hive, path }
}

/// Split `HIVE\key\subkey\value` into hive shortcut, key path and value
/// name (the last backslash-delimited segment).
pub fn split_key_path_name(target_object: &str) -> RegistryValuePath {
    let segments: Vec<&str> = target_object.split('\\').collect();
    let hive = Hive::parse(segments.first().copied().unwrap_or(""));
    let value_name = segments.last().copied().unwrap_or("").to_string();
    let path = if segments.len() > 2 {
        segments[1..segments.len() - 1].join("\\")
    } else {
        String::new()
    };
    RegistryValuePath {
        hive,
        path,
        value_name,
    }
}

/// Delete the registry key named by `target_object` (hive shortcut plus
/// key path). Equivalent command: `reg delete "<HIVE>\<path>" /f`.
pub fn delete_registry_key(target_object: &str) -> ResponseResult<()> {
    delete_registry_key_with(target_object, &SystemRunner)
}

pub fn delete_registry_key_with(
    target_object: &str,
    runner: &dyn CommandRunner,
) -> ResponseResult<()> {
    let key = split_key_path(target_object);
    runner.run(
        REG_EXE,
        &[
            "delete".to_string(),
            key.qualified(),
            "/f".to_string(),
        ],
    )
}

/// Delete the named value inside a registry key. Equivalent command:
/// `reg delete "<HIVE>\<path>" /v <name> /f`.
pub fn delete_registry_value(target_object: &str) -> ResponseResult<()> {
    delete_registry_value_with(target_object, &SystemRunner)
}

pub fn delete_registry_value_with(
    target_object: &str,
    runner: &dyn CommandRunner,
) -> ResponseResult<()> {
    let value = split_key_path_name(target_object);
    let qualified = format!("{}\\{}", value.hive.as_shortcut(), value.path);
    runner.run(
        REG_EXE,
        &[
            "delete".to_string(),
            qualified,
            "/v".to_string(),
            value.value_name,
            "/f".to_string(),
        ],
    )
}
