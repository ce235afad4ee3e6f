//! Largest-file-in-directory helper, for the "move to `DownloadDir`" variant
//! of file handling (§9 design note). Not wired into the default
//! `NotificationHandler::handle` path, which uses the simpler "record path"
//! variant instead — provided as an explicit opt-in for implementers who
//! want the move-file behavior.

use std::path::{Path, PathBuf};

use momenarr_core::{MomenarrError, Result};

/// Move the largest regular file found (recursively) under `source_dir` into
/// `download_dir`, returning its new absolute path. Errors if `source_dir`
/// contains no files.
pub async fn move_largest_file(source_dir: &Path, download_dir: &Path) -> Result<PathBuf> {
    let largest = find_largest_file(source_dir).await?.ok_or_else(|| MomenarrError::NotFound {
        resource: format!("no files under {}", source_dir.display()),
    })?;

    tokio::fs::create_dir_all(download_dir).await?;
    let file_name = largest.file_name().ok_or_else(|| MomenarrError::Validation {
        field: "dir".to_string(),
        message: "largest file has no file name".to_string(),
    })?;
    let destination = download_dir.join(file_name);
    tokio::fs::rename(&largest, &destination).await?;
    Ok(destination)
}

async fn find_largest_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut stack = vec![dir.to_path_buf()];
    let mut best: Option<(PathBuf, u64)> = None;

    while let Some(current) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                stack.push(entry.path());
            } else if metadata.is_file() {
                let size = metadata.len();
                if best.as_ref().map(|(_, s)| size > *s).unwrap_or(true) {
                    best = Some((entry.path(), size));
                }
            }
        }
    }

    Ok(best.map(|(path, _)| path))
}
