pub mod applog;
pub mod config;
pub mod dispatch;
pub mod download;
pub mod ingress;
pub mod registry;
pub mod results;
pub mod server;

pub use config::ServerConfig;
pub use registry::{AgentDescriptor, AgentRegistry};
pub use server::Server;
