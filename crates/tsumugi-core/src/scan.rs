//! Local file collection.
//!
//! The engine never walks directories itself: a collaborator hands it
//! an ordered `{name, path}` listing per scan root. This module turns
//! that listing into `LocalFile` records, parsing file and ancestor
//! folder names through the injected parser and carrying user
//! overrides forward from the previous scan.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::models::{LocalFile, ParsedInfo};

/// Video file extensions to consider.
const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "ogm", "wmv", "webm", "flv", "m4v"];

/// The external filename tokenizer. Pure; one call per distinct name.
pub trait FilenameParser {
    fn parse(&self, name: &str) -> ParsedInfo;
}

impl<F> FilenameParser for F
where
    F: Fn(&str) -> ParsedInfo,
{
    fn parse(&self, name: &str) -> ParsedInfo {
        self(name)
    }
}

/// One file reported by the directory-walk collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanFile {
    pub name: String,
    pub path: PathBuf,
}

/// A scan root with its walked file listing, in walk order.
#[derive(Debug, Clone)]
pub struct ScanListing {
    pub root: PathBuf,
    pub files: Vec<ScanFile>,
}

/// Build `LocalFile` records from a scan listing.
///
/// Fatal if the scan root does not exist: no partial results. Files
/// already known from a previous scan keep their `locked`/`ignored`
/// flags, and locked files keep their match and metadata wholesale.
pub fn collect_files<P: FilenameParser>(
    listing: &ScanListing,
    parser: &P,
    previous: &[LocalFile],
) -> Result<Vec<LocalFile>, EngineError> {
    if !listing.root.is_dir() {
        return Err(EngineError::DirectoryMissing(listing.root.clone()));
    }

    let known: HashMap<&Path, &LocalFile> = previous
        .iter()
        .map(|f| (f.path.as_path(), f))
        .collect();

    let mut out = Vec::new();
    for file in &listing.files {
        if !is_video(&file.path) {
            continue;
        }

        if let Some(prev) = known.get(file.path.as_path()) {
            if prev.locked || prev.ignored {
                out.push((*prev).clone());
                continue;
            }
        }

        let parsed = parser.parse(&file.name);
        let folder_info = parse_folder_chain(&listing.root, &file.path, parser);

        let mut local = LocalFile {
            name: file.name.clone(),
            path: file.path.clone(),
            parsed_info: Some(parsed),
            parsed_folder_info: folder_info,
            ..Default::default()
        };
        if let Some(prev) = known.get(file.path.as_path()) {
            // Unlocked files keep their previous match as a starting
            // point; reconciliation may re-derive it.
            local.media_id = prev.media_id;
        }
        out.push(local);
    }

    tracing::debug!(
        root = %listing.root.display(),
        collected = out.len(),
        listed = listing.files.len(),
        "Collected local files"
    );
    Ok(out)
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| VIDEO_EXTENSIONS.contains(&e.as_str()))
}

/// Parse every directory name between the scan root and the file,
/// outermost first.
fn parse_folder_chain<P: FilenameParser>(
    root: &Path,
    path: &Path,
    parser: &P,
) -> Vec<ParsedInfo> {
    let Some(parent) = path.parent() else {
        return Vec::new();
    };
    let Ok(relative) = parent.strip_prefix(root) else {
        return Vec::new();
    };

    relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .map(|name| parser.parse(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn naive_parser(name: &str) -> ParsedInfo {
        // Title is everything before the first " - "; episode after it.
        let (title, episode) = match name.split_once(" - ") {
            Some((t, rest)) => {
                let ep: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                (t.to_string(), (!ep.is_empty()).then_some(ep))
            }
            None => (name.trim_end_matches(".mkv").to_string(), None),
        };
        ParsedInfo {
            original: name.to_string(),
            title: Some(title),
            episode,
            ..Default::default()
        }
    }

    fn listing(root: &Path, names: &[&str]) -> ScanListing {
        ScanListing {
            root: root.to_path_buf(),
            files: names
                .iter()
                .map(|n| ScanFile {
                    name: n.rsplit('/').next().unwrap_or(n).to_string(),
                    path: root.join(n),
                })
                .collect(),
        }
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let listing = listing(Path::new("/nonexistent/library"), &["Show - 01.mkv"]);
        let err = collect_files(&listing, &naive_parser, &[]).unwrap_err();
        assert!(matches!(err, EngineError::DirectoryMissing(_)));
    }

    #[test]
    fn test_collects_videos_and_folder_chain() {
        let dir = TempDir::new().unwrap();
        let listing = listing(
            dir.path(),
            &[
                "Frieren Season 2/Frieren - 01.mkv",
                "Frieren Season 2/notes.txt",
            ],
        );

        let files = collect_files(&listing, &naive_parser, &[]).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "Frieren - 01.mkv");
        assert_eq!(files[0].relative_episode(), Some(1));
        assert_eq!(files[0].parsed_folder_info.len(), 1);
        assert_eq!(
            files[0].parsed_folder_info[0].title.as_deref(),
            Some("Frieren Season 2")
        );
    }

    #[test]
    fn test_locked_files_survive_rescans_untouched() {
        let dir = TempDir::new().unwrap();
        let listing = listing(dir.path(), &["Show - 01.mkv"]);

        let locked = LocalFile {
            name: "Show - 01.mkv".into(),
            path: dir.path().join("Show - 01.mkv"),
            media_id: Some(42),
            locked: true,
            ..Default::default()
        };

        let files = collect_files(&listing, &naive_parser, &[locked.clone()]).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0], locked);
    }

    #[test]
    fn test_unlocked_files_keep_previous_match() {
        let dir = TempDir::new().unwrap();
        let listing = listing(dir.path(), &["Show - 01.mkv"]);

        let prev = LocalFile {
            name: "Show - 01.mkv".into(),
            path: dir.path().join("Show - 01.mkv"),
            media_id: Some(42),
            ..Default::default()
        };

        let files = collect_files(&listing, &naive_parser, &[prev]).unwrap();
        assert_eq!(files[0].media_id, Some(42));
        assert!(files[0].parsed_info.is_some());
    }
}
