use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::error;

use rules::TelemetryRecord;

/// Append-only JSON-lines log of every dispatched action's outcome. One
/// record per dispatch, success or failure; writes are serialized by a
/// per-file mutex.
#[derive(Debug)]
pub struct ResultLog {
    file: Mutex<File>,
    path: PathBuf,
}

impl ResultLog {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed opening result log {}", path.display()))?;

        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, outcome: &TelemetryRecord) {
        let mut line = match serde_json::to_string(outcome) {
            Ok(line) => line,
            Err(err) => {
                error!(error = %err, "failed encoding outcome record");
                return;
            }
        };
        line.push('\n');

        let mut file = self.file.lock().expect("result log lock");
        if let Err(err) = file.write_all(line.as_bytes()) {
            error!(file = %self.path.display(), error = %err, "failed appending outcome record");
        }
    }
}

/// Merge an RPC result into the decision's record: `ResultInfo` carries
/// the agent's (or transport's) message, `Result` is `Success`/`Failure`,
/// `ResultTime` is a millisecond-precision local timestamp.
pub fn outcome_record(
    mut record: TelemetryRecord,
    result_info: &str,
    success: bool,
) -> TelemetryRecord {
    record.insert("ResultInfo", result_info);
    record.insert("Result", if success { "Success" } else { "Failure" });
    record.insert("ResultTime", &result_time());
    record
}

fn result_time() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}
