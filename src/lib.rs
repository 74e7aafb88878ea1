//! Local episode index and metadata cache for downloaded anime.
//!
//! Indexes video files found on disk by parsing their names into
//! (title, season, episode, language), caches scraped series metadata
//! with TTL-based expiry, and records download statistics. Backed by a
//! single SQLite file; safe to share across threads.

pub mod connection;
pub mod database;
pub mod error;
pub mod filename;
pub mod records;
pub mod schema;

pub use database::{EpisodeDatabase, DEFAULT_MAX_AGE_SECS, DEFAULT_TTL_SECS};
pub use error::{Error, Result};
pub use records::{
    AnimeMetadata, DownloadRecord, DownloadStatus, EpisodeFile, EpisodeMetadata, EpisodeRef,
    IndexStatistics, LanguageAvailability, SeasonMetadata,
};
