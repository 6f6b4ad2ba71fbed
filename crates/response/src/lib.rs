mod adapter;
mod errors;
mod files;
mod firewall;
mod kill;
mod registry;
mod runner;
mod windows_cmd;

pub use adapter::{set_adapter, set_adapter_with, AdapterState};
pub use errors::{ResponseError, ResponseResult};
pub use files::delete_file;
pub use firewall::{
    block_ip, block_ip_with, block_port, block_port_with, unblock_ip, unblock_ip_with,
    unblock_port, unblock_port_with, Direction,
};
pub use kill::{
    kill_process, kill_process_tree, kill_process_tree_with, kill_process_with, resume_process,
    resume_process_with, suspend_process, suspend_process_with, KillReport, OsSignalSender,
    ProcessIntrospector, ProcfsIntrospector, Signal, SignalSender,
};
pub use registry::{
    delete_registry_key, delete_registry_key_with, delete_registry_value,
    delete_registry_value_with, split_key_path, split_key_path_name, Hive, RegistryKeyPath,
    RegistryValuePath,
};
pub use runner::{CommandRunner, SystemRunner};
