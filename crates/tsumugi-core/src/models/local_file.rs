use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Output of the external filename parser for a single name.
///
/// Produced once per filename or folder name and never mutated. Numeric
/// fields stay as raw strings; accessors parse on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedInfo {
    pub original: String,
    pub title: Option<String>,
    pub season: Option<String>,
    pub part: Option<String>,
    pub cour: Option<String>,
    pub episode: Option<String>,
}

impl ParsedInfo {
    pub fn season_number(&self) -> Option<u32> {
        self.season.as_deref().and_then(|s| s.trim().parse().ok())
    }

    pub fn episode_number(&self) -> Option<u32> {
        self.episode.as_deref().and_then(|s| s.trim().parse().ok())
    }

    /// A cour or part marker signals a split-cour release.
    pub fn has_split_cour_marker(&self) -> bool {
        self.cour.is_some() || self.part.is_some()
    }
}

/// Derived per-file metadata, recomputed by reconciliation unless the
/// file is locked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub episode: Option<u32>,
    pub is_version: bool,
    pub is_special: bool,
    pub is_nc: bool,
    pub anidb_episode: Option<String>,
}

/// A video file found under a scan root.
///
/// `locked` and `ignored` are user overrides and survive re-scans; the
/// reconciler never touches a file carrying either flag. `media_id` is
/// assigned by the reconciler, at most one per file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalFile {
    pub name: String,
    pub path: PathBuf,
    pub parsed_info: Option<ParsedInfo>,
    pub parsed_folder_info: Vec<ParsedInfo>,
    pub metadata: FileMetadata,
    pub locked: bool,
    pub ignored: bool,
    pub media_id: Option<u64>,
}

impl LocalFile {
    /// Title parsed from the file's own name.
    pub fn parsed_title(&self) -> Option<&str> {
        self.parsed_info.as_ref().and_then(|p| p.title.as_deref())
    }

    /// Title parsed from the nearest ancestor folder that has one.
    pub fn folder_title(&self) -> Option<&str> {
        self.parsed_folder_info
            .iter()
            .rev()
            .find_map(|p| p.title.as_deref())
    }

    /// Episode number as parsed from the filename (relative numbering).
    pub fn relative_episode(&self) -> Option<u32> {
        self.parsed_info.as_ref().and_then(|p| p.episode_number())
    }

    /// Split-cour marker from the file name or any ancestor folder.
    pub fn has_split_cour_marker(&self) -> bool {
        self.parsed_info
            .as_ref()
            .is_some_and(|p| p.has_split_cour_marker())
            || self
                .parsed_folder_info
                .iter()
                .any(|p| p.has_split_cour_marker())
    }

    pub fn parent_dir(&self) -> Option<&Path> {
        self.path.parent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_numbers() {
        let info = ParsedInfo {
            original: "Show S02E03".into(),
            title: Some("Show".into()),
            season: Some("2".into()),
            episode: Some("3".into()),
            ..Default::default()
        };
        assert_eq!(info.season_number(), Some(2));
        assert_eq!(info.episode_number(), Some(3));
        assert!(!info.has_split_cour_marker());
    }

    #[test]
    fn test_folder_title_prefers_deepest() {
        let file = LocalFile {
            name: "ep01.mkv".into(),
            parsed_folder_info: vec![
                ParsedInfo {
                    original: "Anime".into(),
                    title: Some("Outer".into()),
                    ..Default::default()
                },
                ParsedInfo {
                    original: "Inner Season 2".into(),
                    title: Some("Inner".into()),
                    season: Some("2".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(file.folder_title(), Some("Inner"));
    }

    #[test]
    fn test_split_cour_marker_from_folder() {
        let file = LocalFile {
            name: "ep01.mkv".into(),
            parsed_folder_info: vec![ParsedInfo {
                original: "Show Cour 2".into(),
                title: Some("Show".into()),
                cour: Some("2".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(file.has_split_cour_marker());
    }
}
