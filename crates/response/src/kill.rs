use std::collections::HashSet;

#[cfg(target_os = "linux")]
use std::fs;

#[cfg(unix)]
use nix::sys::signal::{kill as send_signal, Signal as NixSignal};
#[cfg(unix)]
use nix::unistd::Pid;

use crate::errors::{ResponseError, ResponseResult};
#[cfg(not(unix))]
use crate::runner::{CommandRunner, SystemRunner};
#[cfg(not(unix))]
use crate::windows_cmd::TASKKILL_EXE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    SIGKILL,
    SIGSTOP,
    SIGCONT,
}

#[derive(Debug, Clone)]
pub struct KillReport {
    pub target_pid: u32,
    /// Every pid a kill was sent to, children before their parent.
    pub killed_pids: Vec<u32>,
}

pub trait ProcessIntrospector {
    fn children_of(&self, pid: u32) -> Vec<u32>;
}

pub trait SignalSender {
    fn send(&self, pid: u32, signal: Signal) -> ResponseResult<()>;
}

pub struct ProcfsIntrospector;

#[cfg(target_os = "linux")]
impl ProcessIntrospector for ProcfsIntrospector {
    fn children_of(&self, pid: u32) -> Vec<u32> {
        let path = format!("/proc/{}/task/{}/children", pid, pid);
        match fs::read_to_string(path) {
            Ok(content) => content
                .split_whitespace()
                .filter_map(|raw| raw.parse::<u32>().ok())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(not(target_os = "linux"))]
impl ProcessIntrospector for ProcfsIntrospector {
    fn children_of(&self, _pid: u32) -> Vec<u32> {
        Vec::new()
    }
}

pub struct OsSignalSender;

#[cfg(unix)]
impl SignalSender for OsSignalSender {
    fn send(&self, pid: u32, signal: Signal) -> ResponseResult<()> {
        let nix_signal = match signal {
            Signal::SIGKILL => NixSignal::SIGKILL,
            Signal::SIGSTOP => NixSignal::SIGSTOP,
            Signal::SIGCONT => NixSignal::SIGCONT,
        };

        send_signal(Pid::from_raw(pid as i32), nix_signal)
            .map_err(|err| ResponseError::Signal(format!("send {:?} to {}: {}", signal, pid, err)))
    }
}

#[cfg(not(unix))]
impl SignalSender for OsSignalSender {
    fn send(&self, pid: u32, signal: Signal) -> ResponseResult<()> {
        match signal {
            Signal::SIGKILL => {
                SystemRunner.run(
                    TASKKILL_EXE,
                    &["/PID".to_string(), pid.to_string(), "/F".to_string()],
                )
            }
            // No portable suspend/resume primitive in this fallback path.
            Signal::SIGSTOP | Signal::SIGCONT => Err(ResponseError::Signal(format!(
                "send {:?} to {}: not supported on this platform",
                signal, pid
            ))),
        }
    }
}

pub fn kill_process(pid: u32) -> ResponseResult<()> {
    kill_process_with(pid, &OsSignalSender)
}

pub fn kill_process_with(pid: u32, sender: &dyn SignalSender) -> ResponseResult<()> {
    require_valid_pid(pid)?;
    sender.send(pid, Signal::SIGKILL)
}

pub fn suspend_process(pid: u32) -> ResponseResult<()> {
    suspend_process_with(pid, &OsSignalSender)
}

pub fn suspend_process_with(pid: u32, sender: &dyn SignalSender) -> ResponseResult<()> {
    require_valid_pid(pid)?;
    sender.send(pid, Signal::SIGSTOP)
}

pub fn resume_process(pid: u32) -> ResponseResult<()> {
    resume_process_with(pid, &OsSignalSender)
}

pub fn resume_process_with(pid: u32, sender: &dyn SignalSender) -> ResponseResult<()> {
    require_valid_pid(pid)?;
    sender.send(pid, Signal::SIGCONT)
}

pub fn kill_process_tree(pid: u32) -> ResponseResult<KillReport> {
    kill_process_tree_with(pid, &ProcfsIntrospector, &OsSignalSender)
}

/// Kill `pid` and every live descendant, children before their parent so a
/// watching parent cannot respawn what was already reaped. Failures on
/// individual children are ignored (a child may exit on its own while the
/// walk runs); failure to kill the target itself is the operation's error.
pub fn kill_process_tree_with(
    pid: u32,
    introspector: &dyn ProcessIntrospector,
    sender: &dyn SignalSender,
) -> ResponseResult<KillReport> {
    require_valid_pid(pid)?;

    let mut killed = Vec::new();
    let mut seen = HashSet::new();
    let _ = seen.insert(pid);
    kill_descendants(pid, introspector, sender, &mut killed, &mut seen);

    sender.send(pid, Signal::SIGKILL)?;
    killed.push(pid);

    Ok(KillReport {
        target_pid: pid,
        killed_pids: killed,
    })
}

fn kill_descendants(
    pid: u32,
    introspector: &dyn ProcessIntrospector,
    sender: &dyn SignalSender,
    killed: &mut Vec<u32>,
    seen: &mut HashSet<u32>,
) {
    for child in introspector.children_of(pid) {
        if !seen.insert(child) {
            continue;
        }
        kill_descendants(child, introspector, sender, killed, seen);
        let _ = sender.send(child, Signal::SIGKILL);
        killed.push(child);
    }
}

fn require_valid_pid(pid: u32) -> ResponseResult<()> {
    if pid == 0 {
        return Err(ResponseError::InvalidInput(
            "pid must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
