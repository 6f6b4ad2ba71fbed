use crate::errors::ResponseResult;
use crate::runner::{CommandRunner, SystemRunner};
use crate::windows_cmd::NETSH_EXE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Enable,
    Disable,
}

impl AdapterState {
    fn as_arg(self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
        }
    }
}

/// Toggle a network adapter by interface name.
///
/// Equivalent command: `netsh interface set interface <name> <enable|disable>`.
pub fn set_adapter(name: &str, state: AdapterState) -> ResponseResult<()> {
    set_adapter_with(name, state, &SystemRunner)
}

pub fn set_adapter_with(
    name: &str,
    state: AdapterState,
    runner: &dyn CommandRunner,
) -> ResponseResult<()> {
    runner.run(
        NETSH_EXE,
        &[
            "interface".to_string(),
            "set".to_string(),
            "interface".to_string(),
            name.to_string(),
            state.as_arg().to_string(),
        ],
    )
}
