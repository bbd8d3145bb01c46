//! Decide which remote activities still need downloading.
//!
//! A remote activity is already backed up when any file in the destination
//! directory has its canonical name as base name, whatever the extension. The
//! directory listing taken at the start of the run is the only index, so the
//! destination must not be modified by anything else while a run is active.

use garmin_connect_client::{ActivityId, ActivityRecord, GarminClient};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

use crate::dates::DateRange;
use crate::error::{BackupError, BackupResult};
use crate::naming::generate_name;

/// Upper bound on activities fetched per run, to stay clear of Garmin's
/// rate limiting. Re-running picks up where the previous run stopped.
pub const DEFAULT_MAX_ACTIVITIES: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTask {
    pub id: ActivityId,
    pub canonical_name: String,
}

/// Base names (file name without its last extension) of the entries in `dir`.
///
/// Hidden entries are skipped; they include the `.part` files of writes in
/// progress.
pub fn scan_local_basenames(dir: &Path) -> BackupResult<HashSet<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| BackupError::io(dir, e))?;
    let mut names = HashSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| BackupError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.starts_with('.') {
            continue;
        }
        names.insert(stem.to_string());
    }
    Ok(names)
}

/// Keep the records whose canonical name is not in `local_basenames`, in
/// remote order, and truncate to `cap`.
///
/// A record whose start time cannot be parsed is logged and skipped; it does
/// not count toward the cap.
pub fn select_new(
    remote_records: &[ActivityRecord],
    local_basenames: &HashSet<String>,
    cap: usize,
) -> Vec<DownloadTask> {
    let mut tasks: Vec<DownloadTask> = remote_records
        .iter()
        .filter_map(|record| {
            match generate_name(
                &record.start_time_local,
                record.activity_name.as_deref(),
                &record.activity_id,
            ) {
                Ok(canonical_name) => Some(DownloadTask {
                    id: record.activity_id.clone(),
                    canonical_name,
                }),
                Err(e) => {
                    warn!("skipping activity {}: {e}", record.activity_id);
                    None
                }
            }
        })
        .filter(|task| !local_basenames.contains(&task.canonical_name))
        .collect();

    if tasks.len() > cap {
        debug!(
            pending = tasks.len(),
            cap, "more new activities than the per-run cap; truncating"
        );
        tasks.truncate(cap);
    }
    tasks
}

/// Select new activities whose start date falls in `range`, optionally
/// restricted to one activity type.
pub async fn select_by_date(
    client: &dyn GarminClient,
    range: DateRange,
    activity_type: Option<&str>,
    local_basenames: &HashSet<String>,
    cap: usize,
) -> BackupResult<Vec<DownloadTask>> {
    let records = client
        .get_activities_by_date(range.start, range.end, activity_type)
        .await?;
    debug!(
        remote = records.len(),
        local = local_basenames.len(),
        "comparing remote activities with destination"
    );
    Ok(select_new(&records, local_basenames, cap))
}

/// Select new activities among explicitly requested ids. Each id is looked up
/// individually; dates play no part.
pub async fn select_by_ids(
    client: &dyn GarminClient,
    ids: &[ActivityId],
    local_basenames: &HashSet<String>,
    cap: usize,
) -> BackupResult<Vec<DownloadTask>> {
    let mut records = Vec::with_capacity(ids.len());
    for id in ids {
        let evaluation = client.get_activity_evaluation(id).await?;
        records.push(ActivityRecord::from(evaluation));
    }
    Ok(select_new(&records, local_basenames, cap))
}
