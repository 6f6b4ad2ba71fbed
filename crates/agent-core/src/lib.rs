pub mod checkin;
pub mod config;
pub mod service;

pub use config::AgentConfig;
pub use service::{AgentService, HostActions, OsActions};
