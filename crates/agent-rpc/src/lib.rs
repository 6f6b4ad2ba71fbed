mod conn;

pub mod pb {
    tonic::include_proto!("bastion.v1");
}

pub use conn::AgentConn;

/// Contract chunk size for `GetFile` streams. Agents never send a larger
/// `FileData.file_chunk`.
pub const FILE_CHUNK_BYTES: usize = 64 * 1024;

/// Deadline applied by callers to unary response RPCs.
pub const UNARY_RPC_TIMEOUT_SECS: u64 = 30;

/// How long a dial may take before the agent is considered unreachable.
pub const CONNECT_TIMEOUT_SECS: u64 = 5;
