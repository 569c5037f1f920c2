use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::local_file::LocalFile;
use super::media::MediaNode;

/// User's tracking status for a media, as the catalog's list reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListStatus {
    Current,
    Planning,
    Completed,
    Dropped,
    Paused,
    Repeating,
}

impl ListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "Current",
            Self::Planning => "Planning",
            Self::Completed => "Completed",
            Self::Dropped => "Dropped",
            Self::Paused => "Paused",
            Self::Repeating => "Repeating",
        }
    }

    /// Catalog wire representation.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Self::Current => "CURRENT",
            Self::Planning => "PLANNING",
            Self::Completed => "COMPLETED",
            Self::Dropped => "DROPPED",
            Self::Paused => "PAUSED",
            Self::Repeating => "REPEATING",
        }
    }

    pub fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "CURRENT" => Some(Self::Current),
            "PLANNING" => Some(Self::Planning),
            "COMPLETED" => Some(Self::Completed),
            "DROPPED" => Some(Self::Dropped),
            "PAUSED" => Some(Self::Paused),
            "REPEATING" => Some(Self::Repeating),
            _ => None,
        }
    }
}

impl std::fmt::Display for ListStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reconciled media with the local files that belong to it.
///
/// Derived state: recomputed whenever the file set or the matched media
/// set changes, never persisted independently of `LocalFile::media_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub media_id: u64,
    pub media: MediaNode,
    pub files: Vec<LocalFile>,
    /// Best title-similarity rating achieved by any matched file.
    pub accuracy: f64,
    /// Longest common ancestor path of the entry's files.
    pub shared_path: PathBuf,
}

/// Which episodes are still missing for a media, and how to fetch them.
/// Purely derived, no independent lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadInfo {
    pub to_download: u32,
    pub batch: bool,
    pub rewatch: bool,
    pub episode_numbers: Vec<u32>,
    pub scheduling_issues: bool,
}
