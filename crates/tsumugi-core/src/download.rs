//! Missing-episode computation.
//!
//! Derives a `DownloadInfo` from a media's episode count, the user's
//! progress, and the files already matched to it.

use std::collections::BTreeSet;

use crate::models::{DownloadInfo, ListStatus, LocalFile, MediaNode, MediaStatus};

/// Compute which episodes are still missing for a media.
///
/// Candidates run from the latest locally matched episode (or the
/// user's progress, whichever is higher) up to the ceiling of available
/// episodes: `next_airing.episode - 1` while the media airs, else the
/// catalog's total. An airing media with no schedule is flagged
/// `scheduling_issues` and compares the latest local episode directly
/// against `progress + 1`.
pub fn compute(
    media: &MediaNode,
    files: &[LocalFile],
    progress: Option<u32>,
    status: Option<ListStatus>,
) -> DownloadInfo {
    let progress = progress.unwrap_or(0);
    let airing = media.status == Some(MediaStatus::Releasing);

    // Episode 0 stays distinct from episode 1 here: a present special
    // never satisfies a missing first episode.
    let have: BTreeSet<u32> = files
        .iter()
        .filter(|f| !f.ignored)
        .filter_map(|f| f.metadata.episode)
        .collect();
    let last_known = have.iter().next_back().copied().unwrap_or(0);

    let scheduling_issues = airing && media.next_airing_episode.is_none();
    let ceiling = if airing {
        match &media.next_airing_episode {
            Some(next) => next.episode.saturating_sub(1),
            // Schedule unknown or unreliable: suggest at most the
            // episode right after the user's progress, and nothing the
            // library has already passed.
            None => last_known.max(progress.saturating_add(1)),
        }
    } else {
        media.episodes.unwrap_or(last_known)
    };

    let rewatch =
        status == Some(ListStatus::Completed) && ceiling > 0 && progress >= ceiling;

    let floor = if rewatch {
        last_known
    } else {
        last_known.max(progress)
    };
    let episode_numbers: Vec<u32> = (floor.saturating_add(1)..=ceiling)
        .filter(|ep| !have.contains(ep))
        .collect();

    let batch = have.is_empty() && episode_numbers.len() > 1;

    DownloadInfo {
        to_download: episode_numbers.len() as u32,
        batch,
        rewatch,
        episode_numbers,
        scheduling_issues,
    }
}
