//! Command line surface of `garmin-backup`.

use chrono::NaiveDate;
use clap::Parser;
use garmin_connect_client::{ActivityId, DownloadFormat};
use std::path::PathBuf;

use crate::dates::DateRange;
use crate::diff::DEFAULT_MAX_ACTIVITIES;
use crate::error::BackupResult;
use crate::progress::Verbosity;
use crate::{BackupPlan, SelectionMode};

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "garmin-backup",
    version,
    about = "Back up Garmin Connect activities to a local directory",
    long_about = "Downloads every activity that is not yet in the destination directory.\n\
                  Files are named YYYY-MM-DD_HH.MM_<id>-<title>.<ext>; any file with that\n\
                  base name marks the activity as backed up, so re-running is cheap and\n\
                  resumes an interrupted backup."
)]
pub struct Cli {
    /// Destination directory, created if missing
    pub path: PathBuf,

    /// Output format; repeat or comma-separate for several
    #[arg(
        short,
        long = "format",
        value_delimiter = ',',
        default_value = "gpx",
        help = "Download format: original, gpx, csv, tcx or kml (repeatable)"
    )]
    pub formats: Vec<DownloadFormat>,

    /// Garmin Connect username (falls back to GARMIN_USER)
    #[arg(short, long)]
    pub username: Option<String>,

    /// Garmin Connect password (falls back to GARMIN_PASSWORD)
    #[arg(short, long)]
    pub password: Option<String>,

    /// Activity id to back up, ignoring dates; repeatable
    #[arg(
        short = 'a',
        long = "activity",
        conflicts_with_all = ["start", "end", "current_year", "activity_type"]
    )]
    pub activities: Vec<String>,

    /// First day to include: YYYY-MM-DD or a bare year
    #[arg(short, long)]
    pub start: Option<String>,

    /// Last day to include: YYYY-MM-DD or a bare year
    #[arg(short, long)]
    pub end: Option<String>,

    /// Only activities from January 1st of this year until today
    #[arg(short = 'y', long, conflicts_with_all = ["start", "end"])]
    pub current_year: bool,

    /// Only activities of this type, e.g. running or lap_swimming
    #[arg(short = 't', long = "type")]
    pub activity_type: Option<String>,

    /// 1: progress bar, 2: one line per activity, 3: also one line per file
    #[arg(
        short,
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(1..=3)
    )]
    pub verbosity: u8,

    /// Maximum number of activities downloaded per run
    #[arg(short, long = "max", default_value_t = DEFAULT_MAX_ACTIVITIES)]
    pub max_activities: usize,

    /// Use bundled sample data instead of Garmin Connect
    #[arg(long)]
    pub fake: bool,
}

impl Cli {
    /// Resolve the arguments into a backup plan. `today` bounds open-ended
    /// date ranges.
    pub fn plan(&self, today: NaiveDate) -> BackupResult<BackupPlan> {
        let selection = if self.activities.is_empty() {
            SelectionMode::ByDate {
                range: DateRange::resolve(
                    self.start.as_deref(),
                    self.end.as_deref(),
                    self.current_year,
                    today,
                )?,
                activity_type: self.activity_type.clone().filter(|t| !t.is_empty()),
            }
        } else {
            SelectionMode::ByIds(
                self.activities
                    .iter()
                    .map(|id| ActivityId::new(id.trim()))
                    .collect(),
            )
        };

        let mut formats: Vec<DownloadFormat> = Vec::with_capacity(self.formats.len());
        for format in &self.formats {
            if !formats.contains(format) {
                formats.push(*format);
            }
        }

        Ok(BackupPlan {
            destination: self.path.clone(),
            formats,
            selection,
            max_activities: self.max_activities,
            verbosity: Verbosity::try_from(self.verbosity)?,
        })
    }
}
