//! Title normalization for grouping keys.
//!
//! A deliberately light pipeline: NFKC + case folding and whitespace
//! collapse. Grouping only needs naming-convention differences erased;
//! similarity ratings are computed on the raw strings by the matcher.

use unicode_normalization::UnicodeNormalization;

/// Normalize a title into a stable grouping key.
pub fn normalize(s: &str) -> String {
    let folded = s.nfkc().collect::<String>().to_lowercase();
    collapse_whitespace(&folded)
}

/// Collapse runs of whitespace into single spaces and trim the ends.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_fold() {
        assert_eq!(normalize("Sousou no FRIEREN"), "sousou no frieren");
    }

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(normalize("  Jujutsu   Kaisen \t"), "jujutsu kaisen");
    }

    #[test]
    fn test_fullwidth_folding() {
        // Fullwidth forms fold to ASCII under NFKC.
        assert_eq!(normalize("ＳＰＹ×ＦＡＭＩＬＹ"), "spy×family");
    }
}
