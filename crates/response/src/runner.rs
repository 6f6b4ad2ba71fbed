use std::process::Command;

use crate::errors::{ResponseError, ResponseResult};

/// Seam for modules that act by spawning an OS tool (netsh, reg). Handlers
/// are tested against a recording mock; production code uses
/// [`SystemRunner`].
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> ResponseResult<()>;
}

pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> ResponseResult<()> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(ResponseError::Io)?;

        if output.status.success() {
            return Ok(());
        }

        // netsh and reg report most failures on stdout; prefer stderr when
        // it carries anything.
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let detail = if !stderr.is_empty() {
            stderr
        } else if !stdout.is_empty() {
            stdout
        } else {
            format!("{} exited with {}", program, output.status)
        };

        Err(ResponseError::Command(detail))
    }
}
