//! Download selected activities into the destination directory.

use garmin_connect_client::{DownloadFormat, GarminClient};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use crate::diff::DownloadTask;
use crate::error::{BackupError, BackupResult};
use crate::progress::{Progress, Verbosity};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub activities: usize,
    pub files: usize,
    pub bytes: u64,
}

pub fn output_filename(task: &DownloadTask, format: DownloadFormat) -> String {
    format!("{}.{}", task.canonical_name, format.extension())
}

fn part_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.part"))
}

/// Write `bytes` to `path` through a hidden sibling file that is renamed into
/// place once synced. On failure the sibling is removed and `path` is left
/// untouched.
async fn write_atomic(path: &Path, bytes: &[u8]) -> BackupResult<()> {
    let part = part_path(path);
    let written = async {
        let mut file = tokio::fs::File::create(&part).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&part, path).await
    }
    .await;

    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&part).await {
            debug!(path = %part.display(), "could not remove partial file: {cleanup}");
        }
        return Err(BackupError::io(path, e));
    }
    Ok(())
}

/// Fetch every task in every format, in order.
///
/// Nothing is retried. The first failed download or write stops the run and
/// is returned; files completed before it stay on disk and are skipped by the
/// next run.
pub async fn run(
    tasks: &[DownloadTask],
    formats: &[DownloadFormat],
    destination: &Path,
    verbosity: Verbosity,
    client: &dyn GarminClient,
) -> BackupResult<FetchSummary> {
    let progress = Progress::new(verbosity, tasks.len());
    let mut summary = FetchSummary::default();

    for (index, task) in tasks.iter().enumerate() {
        progress.start_task(index, task);
        for &format in formats {
            let path = destination.join(output_filename(task, format));
            let bytes = match client.download_activity(&task.id, format).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    progress.abandon();
                    error!(activity = %task.id, %format, "download failed: {e}");
                    return Err(e.into());
                }
            };
            if let Err(e) = write_atomic(&path, &bytes).await {
                progress.abandon();
                return Err(e);
            }
            metrics::counter!("activity_files_written_total", "format" => format.tag())
                .increment(1);
            progress.file_written(&path, bytes.len());
            summary.files += 1;
            summary.bytes += bytes.len() as u64;
        }
        summary.activities += 1;
        progress.finish_task();
    }

    progress.finish();
    Ok(summary)
}
