//! Incremental backup of Garmin Connect activities.
//!
//! A run lists the remote activities, names each one deterministically, drops
//! those already present in the destination directory and downloads the rest
//! in the requested formats.

use garmin_connect_client::{ActivityId, DownloadFormat, GarminClient};
use std::path::PathBuf;
use tracing::info;

pub mod auth;
pub mod cli;
pub mod dates;
pub mod diff;
pub mod error;
pub mod fetch;
pub mod naming;
pub mod observability;
pub mod progress;
mod test_utils;

use crate::dates::DateRange;
use crate::error::{BackupError, BackupResult};
use crate::fetch::FetchSummary;
use crate::progress::Verbosity;

/// Which remote activities a run considers.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionMode {
    ByDate {
        range: DateRange,
        activity_type: Option<String>,
    },
    /// Explicit ids; dates and type play no part.
    ByIds(Vec<ActivityId>),
}

#[derive(Clone, Debug)]
pub struct BackupPlan {
    pub destination: PathBuf,
    pub formats: Vec<DownloadFormat>,
    pub selection: SelectionMode,
    pub max_activities: usize,
    pub verbosity: Verbosity,
}

/// Run one backup pass against a logged-in client.
pub async fn backup(client: &dyn GarminClient, plan: &BackupPlan) -> BackupResult<FetchSummary> {
    tokio::fs::create_dir_all(&plan.destination)
        .await
        .map_err(|e| BackupError::io(&plan.destination, e))?;

    let local = diff::scan_local_basenames(&plan.destination)?;
    let tasks = match &plan.selection {
        SelectionMode::ByDate {
            range,
            activity_type,
        } => {
            info!(
                start = %range.start,
                end = %range.end,
                activity_type = activity_type.as_deref().unwrap_or("any"),
                "listing activities"
            );
            diff::select_by_date(
                client,
                *range,
                activity_type.as_deref(),
                &local,
                plan.max_activities,
            )
            .await?
        }
        SelectionMode::ByIds(ids) => {
            diff::select_by_ids(client, ids, &local, plan.max_activities).await?
        }
    };
    info!(
        new = tasks.len(),
        on_disk = local.len(),
        "activities selected for download"
    );

    fetch::run(
        &tasks,
        &plan.formats,
        &plan.destination,
        plan.verbosity,
        client,
    )
    .await
}
