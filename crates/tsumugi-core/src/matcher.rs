//! Bigram-overlap title similarity.
//!
//! Ratings are the Dice coefficient over character bigram multisets of
//! whitespace-stripped strings. Identical strings score 1, strings
//! shorter than two characters score 0 unless identical.

use std::collections::HashMap;

use crate::models::MediaNode;

/// Two ratings within this distance are considered equal when deciding
/// group membership (three decimal places).
pub const RATING_TOLERANCE: f64 = 1e-3;

/// Best-scoring target for a candidate string.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleScore {
    pub best_match: String,
    pub rating: f64,
}

/// Dice coefficient over character bigrams, whitespace-stripped.
pub fn compare_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().filter(|c| !c.is_whitespace()).collect();
    let b: Vec<char> = b.chars().filter(|c| !c.is_whitespace()).collect();

    if a == b {
        return 1.0;
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut counts: HashMap<(char, char), i32> = HashMap::new();
    for pair in a.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }

    let mut intersection = 0u32;
    for pair in b.windows(2) {
        if let Some(count) = counts.get_mut(&(pair[0], pair[1])) {
            if *count > 0 {
                *count -= 1;
                intersection += 1;
            }
        }
    }

    (2.0 * f64::from(intersection)) / ((a.len() + b.len() - 2) as f64)
}

/// Score a candidate against a set of targets, returning the best one.
pub fn score(candidate: &str, targets: &[&str]) -> Option<TitleScore> {
    targets
        .iter()
        .map(|t| (t, compare_similarity(candidate, t)))
        .max_by(|x, y| x.1.total_cmp(&y.1))
        .map(|(t, rating)| TitleScore {
            best_match: (*t).to_string(),
            rating,
        })
}

/// Best rating a candidate achieves against any of a media's titles or
/// synonyms.
pub fn rate_media(candidate: &str, media: &MediaNode) -> f64 {
    media
        .all_titles()
        .iter()
        .map(|t| compare_similarity(candidate, t))
        .fold(0.0, f64::max)
}

/// Pick the best-matching media from a pool.
///
/// Ties break deterministically toward the lower id, so repeated runs
/// over the same inputs yield the same match.
pub fn best_media<'a>(candidate: &str, pool: &'a [MediaNode]) -> Option<(&'a MediaNode, f64)> {
    let mut best: Option<(&MediaNode, f64)> = None;
    for media in pool {
        let rating = rate_media(candidate, media);
        let better = match best {
            None => true,
            Some((current, best_rating)) => {
                rating > best_rating + RATING_TOLERANCE
                    || (within_tolerance(rating, best_rating) && media.id < current.id)
            }
        };
        if better {
            best = Some((media, rating));
        }
    }
    best
}

/// Whether two ratings agree within [`RATING_TOLERANCE`].
pub fn within_tolerance(a: f64, b: f64) -> bool {
    (a - b).abs() <= RATING_TOLERANCE
}
