//! Download formats offered by Garmin Connect.
//!
//! One table row per format carries everything that depends on the tag: the
//! user-facing name, the download endpoint and the file extension used on disk.

use crate::ActivityId;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DownloadFormat {
    Original,
    Gpx,
    Csv,
    Tcx,
    Kml,
}

struct FormatEntry {
    tag: &'static str,
    endpoint: &'static str,
    extension: &'static str,
}

// Indexed by the enum discriminant.
const FORMATS: [FormatEntry; 5] = [
    FormatEntry {
        tag: "ORIGINAL",
        endpoint: "/download-service/files/activity",
        extension: "zip",
    },
    FormatEntry {
        tag: "GPX",
        endpoint: "/download-service/export/gpx/activity",
        extension: "gpx",
    },
    FormatEntry {
        tag: "CSV",
        endpoint: "/download-service/export/csv/activity",
        extension: "csv",
    },
    FormatEntry {
        tag: "TCX",
        endpoint: "/download-service/export/tcx/activity",
        extension: "tcx",
    },
    FormatEntry {
        tag: "KML",
        endpoint: "/download-service/export/kml/activity",
        extension: "kml",
    },
];

#[derive(Debug, Error)]
#[error("unknown format `{0}` (expected one of original, gpx, csv, tcx, kml)")]
pub struct UnknownFormat(pub String);

impl DownloadFormat {
    pub const ALL: [DownloadFormat; 5] = [
        DownloadFormat::Original,
        DownloadFormat::Gpx,
        DownloadFormat::Csv,
        DownloadFormat::Tcx,
        DownloadFormat::Kml,
    ];

    fn entry(self) -> &'static FormatEntry {
        &FORMATS[self as usize]
    }

    pub fn tag(self) -> &'static str {
        self.entry().tag
    }

    /// Extension of the file written for this format, without the dot.
    pub fn extension(self) -> &'static str {
        self.entry().extension
    }

    /// Request path (relative to the API base URL) for one activity.
    pub fn download_path(self, activity_id: &ActivityId) -> String {
        format!("{}/{}", self.entry().endpoint, activity_id)
    }
}

impl fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DownloadFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.tag().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}
