use rusqlite::{
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
    Row, ToSql,
};
use serde::Serialize;

/// A video file discovered on disk, one row of `episode_files`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeFile {
    pub id: i64,
    pub title: String,
    /// 0 means movie / no season.
    pub season: u32,
    pub episode: u32,
    pub language: String,
    pub file_path: String,
    pub file_name: String,
    pub last_modified: i64,
    pub indexed_at: i64,
}

impl EpisodeFile {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            season: row.get("season")?,
            episode: row.get("episode")?,
            language: row.get("language")?,
            file_path: row.get("file_path")?,
            file_name: row.get("file_name")?,
            last_modified: row.get("last_modified")?,
            indexed_at: row.get("indexed_at")?,
        })
    }
}

/// Cached scrape result for a series, keyed by its slug.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimeMetadata {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub last_updated: i64,
    /// Seconds until this entry counts as a cache miss.
    pub ttl: i64,
}

impl AnimeMetadata {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            slug: row.get("slug")?,
            title: row.get("title")?,
            description: row.get("description")?,
            thumbnail_url: row.get("thumbnail_url")?,
            last_updated: row.get("last_updated")?,
            ttl: row.get("ttl")?,
        })
    }

    pub fn is_stale(&self, now: i64) -> bool {
        now - self.last_updated > self.ttl
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonMetadata {
    pub id: i64,
    pub anime_id: i64,
    pub season_number: u32,
    pub season_title: String,
    pub episode_count: Option<u32>,
    pub last_updated: i64,
}

impl SeasonMetadata {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            anime_id: row.get("anime_id")?,
            season_number: row.get("season_number")?,
            season_title: row.get("season_title")?,
            episode_count: row.get("episode_count")?,
            last_updated: row.get("last_updated")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeMetadata {
    pub id: i64,
    pub season_id: i64,
    pub episode_number: u32,
    pub episode_title: Option<String>,
    pub url: Option<String>,
    pub last_updated: i64,
}

impl EpisodeMetadata {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            season_id: row.get("season_id")?,
            episode_number: row.get("episode_number")?,
            episode_title: row.get("episode_title")?,
            url: row.get("url")?,
            last_updated: row.get("last_updated")?,
        })
    }
}

/// Per-episode language observation from the scraper.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageAvailability {
    pub language: String,
    pub is_available: bool,
    pub last_checked: i64,
}

/// Outcome of a download attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Completed,
    Failed,
    Cancelled,
    Skipped,
}

impl DownloadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
        }
    }
}

impl ToSql for DownloadStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for DownloadStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "skipped" => Ok(Self::Skipped),
            other => Err(FromSqlError::Other(
                format!("unknown download status: {other}").into(),
            )),
        }
    }
}

/// How a download statistic refers to an indexed episode: either the
/// known `episode_files` row id, or the lookup tuple the downloader has
/// at hand. Lookup failure is fine; the statistic is stored with a NULL
/// episode reference.
#[derive(Debug, Clone)]
pub enum EpisodeRef<'a> {
    Id(i64),
    Lookup {
        title: &'a str,
        season: u32,
        episode: u32,
        language: &'a str,
    },
    Unknown,
}

/// One download attempt, joined with the indexed file when the episode
/// reference resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadRecord {
    pub id: i64,
    pub episode_id: Option<i64>,
    pub download_date: i64,
    pub provider: String,
    /// Bytes per second.
    pub download_speed: Option<f64>,
    pub file_size: Option<i64>,
    /// Seconds.
    pub download_duration: Option<i64>,
    pub status: DownloadStatus,
    pub title: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub language: Option<String>,
    pub file_path: Option<String>,
}

impl DownloadRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            episode_id: row.get("episode_id")?,
            download_date: row.get("download_date")?,
            provider: row.get("provider")?,
            download_speed: row.get("download_speed")?,
            file_size: row.get("file_size")?,
            download_duration: row.get("download_duration")?,
            status: row.get("status")?,
            title: row.get("title")?,
            season: row.get("season")?,
            episode: row.get("episode")?,
            language: row.get("language")?,
            file_path: row.get("file_path")?,
        })
    }
}

/// Aggregate numbers about the index itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStatistics {
    pub total_files: u64,
    pub total_anime: u64,
    pub database_size_mb: f64,
    pub last_indexed: Option<i64>,
}
