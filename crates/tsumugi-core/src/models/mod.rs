mod library;
mod local_file;
mod mapping;
mod media;

pub use library::{DownloadInfo, LibraryEntry, ListStatus};
pub use local_file::{FileMetadata, LocalFile, ParsedInfo};
pub use mapping::{EpisodeMapping, EpisodeMeta, MappingIds, MappingKey};
pub use media::{
    Edge, MediaFormat, MediaNode, MediaSeason, MediaStatus, MediaTitle, NextAiringEpisode,
    RelationType,
};
