//! Console progress for the fetch loop.
//!
//! Output goes to stdout and never feeds back into the run: every method is
//! infallible and a hidden bar is fine.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;

use crate::diff::DownloadTask;
use crate::error::BackupError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// One bar across the whole queue.
    #[default]
    Bar = 1,
    /// One line per activity.
    Tasks = 2,
    /// One line per activity and one per written file.
    Files = 3,
}

impl TryFrom<u8> for Verbosity {
    type Error = BackupError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(Verbosity::Bar),
            2 => Ok(Verbosity::Tasks),
            3 => Ok(Verbosity::Files),
            other => Err(BackupError::Input(format!(
                "verbosity must be 1, 2 or 3, got {other}"
            ))),
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

pub struct Progress {
    verbosity: Verbosity,
    total: usize,
    bar: Option<ProgressBar>,
}

impl Progress {
    pub fn new(verbosity: Verbosity, total: usize) -> Self {
        let bar = (verbosity == Verbosity::Bar).then(|| {
            let bar =
                ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stdout());
            bar.set_style(bar_style());
            bar
        });
        Self {
            verbosity,
            total,
            bar,
        }
    }

    /// `index` is zero-based.
    pub fn start_task(&self, index: usize, task: &DownloadTask) {
        match &self.bar {
            Some(bar) => bar.set_message(task.id.to_string()),
            None => println!(
                "[{}/{}] Downloading {}",
                index + 1,
                self.total,
                task.canonical_name
            ),
        }
    }

    pub fn file_written(&self, path: &Path, bytes: usize) {
        if self.verbosity >= Verbosity::Files {
            println!("    {} ({bytes} bytes)", path.display());
        }
    }

    pub fn finish_task(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message("done");
        }
    }

    /// Drop the bar without completing it, after an aborted run.
    pub fn abandon(&self) {
        if let Some(bar) = &self.bar {
            bar.abandon();
        }
    }
}
