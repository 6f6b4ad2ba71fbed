use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use agent_rpc::pb::{FileInfo, ResponseResult as PbResponseResult};
use agent_rpc::AgentConn;
use rules::{Decision, HostEvent};

use crate::dispatch::{failure, success};

/// Fetch a file from the agent over the `GetFile` stream and save it under
/// `<parent>/<ComputerName>/<YYYYMMDD_HHMMSS_><basename>`.
///
/// Which telemetry field names the file depends on the event code:
/// process creation takes `Image`, image load takes `ImageLoaded`, file
/// creation takes `TargetFilename`; any other code cannot carry a file.
pub async fn fetch_file(
    parent_dir: &str,
    decision: &Decision,
    conn: &AgentConn,
) -> PbResponseResult {
    let Some(file_path) = source_file_path(decision) else {
        return failure(format!(
            "Error: Action getfile is not supported for EventCode {}",
            decision.event_code().as_str()
        ));
    };

    let mut stream = match conn
        .client()
        .get_file(FileInfo {
            file_path: file_path.clone(),
        })
        .await
    {
        Ok(response) => response.into_inner(),
        Err(status) => return failure(format!("Error: {}", status.message())),
    };

    let dir = match ensure_agent_dir(parent_dir, decision.computer_name()).await {
        Ok(dir) => dir,
        Err(err) => return failure(format!("Error: {}", err)),
    };

    let file_name = basename(&file_path);
    let save_path = dir.join(format!("{}{}", timestamp_prefix(), file_name));
    let mut save_file = match fs::File::create(&save_path).await {
        Ok(file) => file,
        Err(err) => return failure(format!("Error: {}", err)),
    };

    loop {
        match stream.message().await {
            Ok(Some(chunk)) => {
                if let Err(err) = save_file.write_all(&chunk.file_chunk).await {
                    return abort_download(&save_path, format!("Error: {}", err)).await;
                }
            }
            Ok(None) => break,
            Err(status) => {
                return abort_download(&save_path, format!("Error: {}", status.message())).await;
            }
        }
    }

    if let Err(err) = save_file.flush().await {
        return abort_download(&save_path, format!("Error: {}", err)).await;
    }

    info!(
        computer_name = %decision.computer_name(),
        file = %save_path.display(),
        "downloaded file from agent"
    );
    success(format!("Download file {} successfully", file_name))
}

fn source_file_path(decision: &Decision) -> Option<String> {
    match decision.event()? {
        HostEvent::ProcessCreate { image, .. } => Some(image),
        HostEvent::ImageLoad { image_loaded, .. } => Some(image_loaded),
        HostEvent::FileCreate { target_filename } => Some(target_filename),
        _ => None,
    }
}

/// Last backslash-delimited segment of an agent-side (Windows) path.
pub fn basename(path: &str) -> &str {
    path.rsplit('\\').next().unwrap_or(path)
}

fn timestamp_prefix() -> String {
    Local::now().format("%Y%m%d_%H%M%S_").to_string()
}

/// Create the per-agent download directory when absent (0755 on unix).
async fn ensure_agent_dir(parent_dir: &str, computer_name: &str) -> std::io::Result<PathBuf> {
    let dir = Path::new(parent_dir).join(computer_name);
    if fs::metadata(&dir).await.is_err() {
        fs::create_dir_all(&dir).await?;
        set_dir_mode(&dir).await?;
    }
    Ok(dir)
}

#[cfg(unix)]
async fn set_dir_mode(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755)).await
}

#[cfg(not(unix))]
async fn set_dir_mode(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// A failed download leaves no partial file behind.
async fn abort_download(save_path: &Path, result_info: String) -> PbResponseResult {
    if let Err(err) = fs::remove_file(save_path).await {
        warn!(file = %save_path.display(), error = %err, "failed removing partial download");
    }
    failure(result_info)
}
