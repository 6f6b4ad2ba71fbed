use std::fs;
use std::path::Path;

use crate::errors::ResponseResult;

/// Remove a file flagged by a delete decision. The path comes straight
/// from telemetry (`ImageLoaded` / `TargetFilename`); the OS error, if
/// any, is the agent's answer.
pub fn delete_file(path: &str) -> ResponseResult<()> {
    fs::remove_file(Path::new(path))?;
    Ok(())
}

#[cfg(test)]
mod tests;
