use crate::errors::ResponseResult;
use crate::runner::{CommandRunner, SystemRunner};
use crate::windows_cmd::NETSH_EXE;

/// Traffic direction of a firewall rule, as netsh spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    fn dir_arg(self) -> &'static str {
        match self {
            Self::Inbound => "dir=in",
            Self::Outbound => "dir=out",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Inbound => "INBOUND",
            Self::Outbound => "OUTBOUND",
        }
    }
}

/// Add a firewall rule blocking traffic to or from `ip`.
///
/// Equivalent command:
/// `netsh advfirewall firewall add rule name="BLOCK IP <ip> <DIR>"
/// interface=any dir=<in|out> action=block remoteip=<ip>`
pub fn block_ip(direction: Direction, ip: &str) -> ResponseResult<()> {
    block_ip_with(direction, ip, &SystemRunner)
}

pub fn block_ip_with(
    direction: Direction,
    ip: &str,
    runner: &dyn CommandRunner,
) -> ResponseResult<()> {
    runner.run(NETSH_EXE, &block_ip_args(direction, ip))
}

/// Delete the rule added by [`block_ip`] for the same direction and ip.
pub fn unblock_ip(direction: Direction, ip: &str) -> ResponseResult<()> {
    unblock_ip_with(direction, ip, &SystemRunner)
}

pub fn unblock_ip_with(
    direction: Direction,
    ip: &str,
    runner: &dyn CommandRunner,
) -> ResponseResult<()> {
    runner.run(NETSH_EXE, &unblock_ip_args(direction, ip))
}

/// Add a firewall rule blocking a remote port.
pub fn block_port(direction: Direction, port: &str) -> ResponseResult<()> {
    block_port_with(direction, port, &SystemRunner)
}

pub fn block_port_with(
    direction: Direction,
    port: &str,
    runner: &dyn CommandRunner,
) -> ResponseResult<()> {
    runner.run(NETSH_EXE, &block_port_args(direction, port))
}

/// Delete the rule added by [`block_port`] for the same direction and port.
pub fn unblock_port(direction: Direction, port: &str) -> ResponseResult<()> {
    unblock_port_with(direction, port, &SystemRunner)
}

pub fn unblock_port_with(
    direction: Direction,
    port: &str,
    runner: &dyn CommandRunner,
) -> ResponseResult<()> {
    runner.run(NETSH_EXE, &unblock_port_args(direction, port))
}

fn ip_rule_name(direction: Direction, ip: &str) -> String {
    format!("name=BLOCK IP {} {}", ip, direction.label())
}

fn port_rule_name(direction: Direction, port: &str) -> String {
    format!("name=BLOCK PORT {} {}", port, direction.label())
}

fn block_ip_args(direction: Direction, ip: &str) -> Vec<String> {
    vec![
        "advfirewall".to_string(),
        "firewall".to_string(),
        "add".to_string(),
        "rule".to_string(),
        ip_rule_name(direction, ip),
        "interface=any".to_string(),
        direction.dir_arg().to_string(),
        "action=block".to_string(),
        format!("remoteip={}", ip),
    ]
}

fn unblock_ip_args(direction: Direction, ip: &str) -> Vec<String> {
    vec![
        "advfirewall".to_string(),
        "firewall".to_string(),
        "delete".to_string(),
        "rule".to_string(),
        ip_rule_name(direction, ip),
        format!("remoteip={}", ip),
    ]
}

fn block_port_args(direction: Direction, port: &str) -> Vec<String> {
    vec![
        "advfirewall".to_string(),
        "firewall".to_string(),
        "add".to_string(),
        "rule".to_string(),
        port_rule_name(direction, port),
        "interface=any".to_string(),
        direction.dir_arg().to_string(),
        "action=block".to_string(),
        format!("remoteport={}", port),
    ]
}

fn unblock_port_args(direction: Direction, port: &str) -> Vec<String> {
    vec![
        "advfirewall".to_string(),
        "firewall".to_string(),
        "delete".to_string(),
        "rule".to_string(),
        port_rule_name(direction, port),
        format!("remoteport={}", port),
    ]
}
