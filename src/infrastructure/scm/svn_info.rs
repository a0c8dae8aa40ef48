use std::path::Path;

use tokio::process::Command;
use tracing::warn;

/// The subset of `svn info` output needed to describe a working copy.
#[derive(Debug, Clone)]
pub struct SvnWorkingCopyInfo {
    /// URL the working copy was checked out from.
    pub url: String,
    /// Root of the repository. Absent for working copies made by svn
    /// clients too old to record it.
    pub repository_root_url: Option<String>,
}

/// Query `svn info` for the working copy at `directory`.
///
/// Returns `None` when svn cannot describe the directory, so one broken
/// working copy does not abort discovery of the rest.
pub async fn working_copy_info(svn_executable: &str, directory: &Path) -> Option<SvnWorkingCopyInfo> {
    let url = show_item(svn_executable, directory, "url").await?;
    let repository_root_url = show_item(svn_executable, directory, "repos-root-url").await;
    Some(SvnWorkingCopyInfo {
        url,
        repository_root_url,
    })
}

async fn show_item(svn_executable: &str, directory: &Path, item: &str) -> Option<String> {
    let output = Command::new(svn_executable)
        .arg("info")
        .arg("--show-item")
        .arg(item)
        .arg(directory)
        .output()
        .await;
    let output = match output {
        Ok(output) => output,
        Err(e) => {
            warn!(directory = %directory.display(), error = %e, "cannot run {svn_executable} info");
            return None;
        }
    };
    if !output.status.success() {
        warn!(
            directory = %directory.display(),
            "svn info --show-item {item} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
