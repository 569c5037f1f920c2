//! Special/NC episode classification.
//!
//! Detection is a data table of tagged patterns consumed by one
//! function: new markers are rows, not new code paths. Credits patterns
//! are checked first so "NCOP" never falls through to the special rows.

use std::sync::OnceLock;

use regex::Regex;

/// What kind of episode a filename looks like. The kinds are mutually
/// exclusive; the first matching pattern wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeKind {
    Regular,
    /// SP/OVA/OAD style extras.
    Special,
    /// Creditless openings/endings, trailers, previews.
    Credits,
}

const PATTERNS: &[(EpisodeKind, &str)] = &[
    (EpisodeKind::Credits, r"(?i)\b(NCOP|NCED|NC)\s*\d*\b"),
    (EpisodeKind::Credits, r"(?i)\b(OP|ED)\s*\d*[a-z]?\b"),
    (EpisodeKind::Credits, r"(?i)\b(PV|CM|TRAILER|PREVIEW|TEASER)\s*\d*\b"),
    (EpisodeKind::Special, r"(?i)\b(SP|SPECIAL|SPECIALS)\s*\d*\b"),
    (EpisodeKind::Special, r"(?i)\b(OVA|OAD|ONA)\s*\d*\b"),
    (EpisodeKind::Special, r"(?i)\bEXTRAS?\b"),
];

fn compiled() -> &'static Vec<(EpisodeKind, Regex)> {
    static COMPILED: OnceLock<Vec<(EpisodeKind, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .map(|(kind, pattern)| {
                (
                    *kind,
                    Regex::new(pattern).expect("classification pattern table is valid"),
                )
            })
            .collect()
    })
}

/// Classify a filename by the pattern table. First match wins.
pub fn classify(name: &str) -> EpisodeKind {
    for (kind, regex) in compiled() {
        if regex.is_match(name) {
            return *kind;
        }
    }
    EpisodeKind::Regular
}

/// Whether the filename carries a release-version marker ("05v2").
pub fn has_version_marker(name: &str) -> bool {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    VERSION
        .get_or_init(|| Regex::new(r"(?i)\d+\s*v\d+\b").expect("version pattern is valid"))
        .is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_episode() {
        assert_eq!(
            classify("[Group] Jujutsu Kaisen - 05 (1080p).mkv"),
            EpisodeKind::Regular
        );
    }

    #[test]
    fn test_special_markers() {
        assert_eq!(
            classify("[Group] Frieren - SP1 (1080p).mkv"),
            EpisodeKind::Special
        );
        assert_eq!(
            classify("Mushoku Tensei - OVA (BD).mkv"),
            EpisodeKind::Special
        );
        assert_eq!(classify("Show - OAD 2.mkv"), EpisodeKind::Special);
    }

    #[test]
    fn test_credits_markers() {
        assert_eq!(classify("Frieren - NCOP1.mkv"), EpisodeKind::Credits);
        assert_eq!(classify("Frieren - NCED.mkv"), EpisodeKind::Credits);
        assert_eq!(classify("Frieren - OP2.mkv"), EpisodeKind::Credits);
        assert_eq!(classify("Show - PV 01.mkv"), EpisodeKind::Credits);
    }

    #[test]
    fn test_credits_wins_over_special() {
        // NCOP carries both an NC and an OP marker but is one kind.
        assert_eq!(classify("Show NCOP OVA source.mkv"), EpisodeKind::Credits);
    }

    #[test]
    fn test_version_marker() {
        assert!(has_version_marker("[Group] Show - 05v2 (1080p).mkv"));
        assert!(has_version_marker("Show - 12 v3.mkv"));
        assert!(!has_version_marker("Show - 05 (1080p).mkv"));
        // A bare "v" word is not a version marker.
        assert!(!has_version_marker("Show vs World - 01.mkv"));
    }

    #[test]
    fn test_no_match_inside_words() {
        // "opening"/"sped" must not trip the OP/SP rows.
        assert_eq!(classify("The Opening Act - 03.mkv"), EpisodeKind::Regular);
        assert_eq!(classify("High Speed - 01.mkv"), EpisodeKind::Regular);
    }
}
