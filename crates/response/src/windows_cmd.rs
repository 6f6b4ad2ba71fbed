//! System tool paths for spawned response commands.
//!
//! On Windows the absolute System32 paths are used so a privileged agent
//! never PATH-searches for its tools. Elsewhere the bare names stand in
//! for dev builds and the trait-seam tests.

#[cfg(target_os = "windows")]
pub(crate) const NETSH_EXE: &str = r"C:\Windows\System32\netsh.exe";
#[cfg(not(target_os = "windows"))]
pub(crate) const NETSH_EXE: &str = "netsh";

#[cfg(not(unix))]
pub(crate) const TASKKILL_EXE: &str = r"C:\Windows\System32\taskkill.exe";

#[cfg(target_os = "windows")]
pub(crate) const REG_EXE: &str = r"C:\Windows\System32\reg.exe";
#[cfg(not(target_os = "windows"))]
pub(crate) const REG_EXE: &str = "reg";
