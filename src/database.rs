use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::UNIX_EPOCH,
};

use chrono::Utc;
use rusqlite::{params, params_from_iter, ToSql};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::{
    connection::ThreadSafeSqlite,
    error::{Error, Result},
    filename::{self, ParsedEpisode},
    records::{
        AnimeMetadata, DownloadRecord, DownloadStatus, EpisodeFile, EpisodeMetadata, EpisodeRef,
        IndexStatistics, LanguageAvailability, SeasonMetadata,
    },
    schema::SCHEMA,
};

/// Seconds a scan record stays fresh; unforced rescans inside this window
/// are skipped.
const SCAN_FRESHNESS_SECS: i64 = 3600;

/// Inserts per transaction during a scan, so large trees commit partial
/// progress instead of building one giant transaction.
const SCAN_BATCH_SIZE: usize = 100;

/// Default time-to-live for cached anime metadata (24 hours).
pub const DEFAULT_TTL_SECS: i64 = 86_400;

/// Default freshness window for language availability lookups (24 hours).
pub const DEFAULT_MAX_AGE_SECS: i64 = 86_400;

fn now() -> i64 {
    Utc::now().timestamp()
}

/// The local episode index and metadata cache.
///
/// Cloning is cheap and every clone shares the same underlying store, so
/// one instance opened at startup can be handed to every collaborator
/// (indexer thread, UI threads) instead of going through a global.
///
/// Write operations return [`Result`]; query operations degrade to
/// "not found" on database errors after logging, because the caller's
/// fallback is always a network re-fetch, which is safe to repeat.
#[derive(Debug, Clone)]
pub struct EpisodeDatabase {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    db: ThreadSafeSqlite,
    indexing: AtomicBool,
}

/// Keeps `is_currently_indexing` true for the duration of a scan, even
/// when the scan bails out early with an error.
struct IndexingGuard<'a>(&'a AtomicBool);

impl<'a> IndexingGuard<'a> {
    fn arm(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for IndexingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A parsed file waiting to be written in the next batch.
struct PendingFile {
    /// Row to delete first when the file was re-indexed after a change.
    replaces: Option<i64>,
    parsed: ParsedEpisode,
    file_path: String,
    file_name: String,
    last_modified: i64,
}

impl EpisodeDatabase {
    /// Opens (or creates) the database at `path` and runs the idempotent
    /// schema batch. Failure here is fatal; a cache that cannot open its
    /// backing file should abort initialization rather than limp along.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let db = ThreadSafeSqlite::open(path)?;
        db.with_conn(|conn| conn.execute_batch(SCHEMA))?;
        Ok(Self {
            inner: Arc::new(Inner {
                db,
                indexing: AtomicBool::new(false),
            }),
        })
    }

    /// Opens the database at its platform application-data location,
    /// `<data-dir>/aniworld/episode_index.db`.
    pub fn open_default() -> Result<Self> {
        let base = dirs::data_dir().ok_or(Error::NoDataDir)?;
        Self::open(base.join("aniworld").join("episode_index.db"))
    }

    /// True while any thread is inside [`scan_directory`]. Callers that
    /// need responsiveness can fall back to a slower non-indexed check
    /// instead of racing a scan in progress.
    ///
    /// [`scan_directory`]: EpisodeDatabase::scan_directory
    pub fn is_currently_indexing(&self) -> bool {
        self.inner.indexing.load(Ordering::SeqCst)
    }

    /// Drops all pooled connections. Later calls reconnect transparently.
    pub fn close(&self) {
        self.inner.db.close();
    }

    // ----- filesystem indexer -----

    /// Walks `directory` recursively and brings the file index up to date.
    /// Returns the number of newly inserted rows.
    ///
    /// A missing directory is a normal transient state (nothing downloaded
    /// yet) and yields 0. Unless `force_rescan` is set, a directory
    /// scanned less than an hour ago is skipped. The statement lock is
    /// only taken per batch, never across filesystem I/O, so existence
    /// queries from other threads keep working mid-scan.
    pub fn scan_directory(&self, directory: &Path, force_rescan: bool) -> Result<usize> {
        if !directory.exists() {
            warn!(directory = %directory.display(), "directory does not exist, skipping scan");
            return Ok(0);
        }
        let dir_str = directory.to_string_lossy().to_string();

        if !force_rescan {
            let last_scan = self.inner.db.query_row(
                "SELECT last_scan FROM scan_history WHERE directory = ?1",
                params![dir_str],
                |row| row.get::<_, i64>(0),
            )?;
            if let Some(last_scan) = last_scan {
                if now() - last_scan < SCAN_FRESHNESS_SECS {
                    debug!(directory = %dir_str, "scanned within the last hour, skipping");
                    return Ok(0);
                }
            }
        }

        let _guard = IndexingGuard::arm(&self.inner.indexing);
        info!(directory = %dir_str, "indexing directory");

        let existing = self.indexed_files_under(&dir_str)?;
        debug!(count = existing.len(), "already indexed files under directory");

        let indexed_at = now();
        let mut new_files = 0usize;
        let mut batch: Vec<PendingFile> = Vec::new();

        let walker = WalkDir::new(directory).into_iter().filter_map(|entry| {
            entry
                .map_err(|e| warn!(error = %e, "skipping unreadable entry"))
                .ok()
        });

        for entry in walker {
            if !entry.file_type().is_file() {
                continue;
            }
            let file_path = entry.path().to_string_lossy().to_string();

            let modified = entry.metadata().ok().and_then(|meta| meta.modified().ok());
            let Some(modified) = modified else {
                warn!(file = %file_path, "could not read mtime, skipping file");
                continue;
            };
            let mtime = modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            let mut replaces = None;
            if let Some(&(id, db_mtime)) = existing.get(&file_path) {
                if mtime <= db_mtime {
                    continue;
                }
                // Changed on disk: drop the old row and re-index as new.
                replaces = Some(id);
            }

            // Not matching any pattern is expected for covers, subtitles
            // and other bystander files.
            let Some(parsed) = filename::parse_filename(entry.path()) else {
                continue;
            };
            debug!(
                file = %file_path,
                title = %parsed.title,
                season = parsed.season,
                episode = parsed.episode,
                language = %parsed.language,
                "indexing episode file"
            );

            batch.push(PendingFile {
                replaces,
                parsed,
                file_path,
                file_name: entry.file_name().to_string_lossy().to_string(),
                last_modified: mtime,
            });

            if batch.len() >= SCAN_BATCH_SIZE {
                new_files += self.flush_batch(&mut batch, indexed_at)?;
            }
        }
        new_files += self.flush_batch(&mut batch, indexed_at)?;

        // Vanished files: check the filesystem before taking the lock.
        let vanished: Vec<&String> = existing
            .keys()
            .filter(|path| !Path::new(path.as_str()).exists())
            .collect();
        if !vanished.is_empty() {
            self.inner.db.with_conn(|conn| {
                let mut stmt =
                    conn.prepare_cached("DELETE FROM episode_files WHERE file_path = ?1")?;
                for path in &vanished {
                    stmt.execute(params![path])?;
                }
                Ok(())
            })?;
            debug!(count = vanished.len(), "removed vanished files from index");
        }

        self.inner.db.execute(
            "INSERT OR REPLACE INTO scan_history (directory, last_scan) VALUES (?1, ?2)",
            params![dir_str, now()],
        )?;

        info!(directory = %dir_str, new_files, "indexing finished");
        Ok(new_files)
    }

    fn indexed_files_under(&self, directory: &str) -> Result<HashMap<String, (i64, i64)>> {
        // Anchor the prefix at a path separator so "/a/anime" does not
        // pull in rows from a sibling like "/a/anime2".
        let mut prefix = directory.to_string();
        if !prefix.ends_with(std::path::MAIN_SEPARATOR) {
            prefix.push(std::path::MAIN_SEPARATOR);
        }
        self.inner.db.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                r#"
                SELECT id, file_path, last_modified
                FROM episode_files
                WHERE file_path LIKE ?1
                "#,
            )?;
            let rows = stmt.query_map(params![format!("{prefix}%")], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    (row.get::<_, i64>(0)?, row.get::<_, i64>(2)?),
                ))
            })?;
            rows.collect()
        })
    }

    /// Writes one batch inside a single transaction. A bad row is logged
    /// and skipped; the rest of the batch still commits.
    fn flush_batch(&self, batch: &mut Vec<PendingFile>, indexed_at: i64) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        let mut inserted = 0usize;
        self.inner.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut delete = tx.prepare_cached("DELETE FROM episode_files WHERE id = ?1")?;
                let mut insert = tx.prepare_cached(
                    r#"
                    INSERT INTO episode_files
                    (title, season, episode, language, file_path, file_name, last_modified, indexed_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                )?;
                for file in batch.drain(..) {
                    if let Some(id) = file.replaces {
                        delete.execute(params![id])?;
                    }
                    let result = insert.execute(params![
                        file.parsed.title,
                        file.parsed.season,
                        file.parsed.episode,
                        file.parsed.language,
                        file.file_path,
                        file.file_name,
                        file.last_modified,
                        indexed_at,
                    ]);
                    match result {
                        Ok(_) => inserted += 1,
                        Err(e) => {
                            error!(file = %file.file_path, error = %e, "failed to index file")
                        }
                    }
                }
            }
            tx.commit()
        })?;
        Ok(inserted)
    }

    /// Most recent scan timestamp covering `directory`. Ancestors count:
    /// scanning a parent indexes its children too, so a scan record on
    /// any ancestor satisfies the lookup.
    pub fn get_last_scan_time(&self, directory: &Path) -> Option<i64> {
        let dirs: Vec<String> = directory
            .ancestors()
            .map(|p| p.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if dirs.is_empty() {
            return None;
        }

        let placeholders = vec!["?"; dirs.len()].join(",");
        let sql =
            format!("SELECT MAX(last_scan) FROM scan_history WHERE directory IN ({placeholders})");
        match self
            .inner
            .db
            .query_row(&sql, params_from_iter(dirs.iter()), |row| {
                row.get::<_, Option<i64>>(0)
            }) {
            Ok(last_scan) => last_scan.flatten(),
            Err(e) => {
                error!(error = %e, "last scan time lookup failed");
                None
            }
        }
    }

    // ----- query layer -----

    /// Whether a matching file is in the index. Title matching tolerates
    /// exact, prefix and substring forms; language matching tolerates the
    /// punctuation variants plus the bare first word, so "German" matches
    /// both "German Dub" and "German Sub". Database errors degrade to
    /// `false` (treat as cache miss).
    pub fn episode_exists(&self, title: &str, season: u32, episode: u32, language: &str) -> bool {
        match self.find_episode_file(title, season, episode, language) {
            Ok(found) => found.is_some(),
            Err(e) => {
                error!(error = %e, title, "episode_exists query failed");
                false
            }
        }
    }

    /// Like [`episode_exists`], but returns the full row.
    ///
    /// [`episode_exists`]: EpisodeDatabase::episode_exists
    pub fn get_episode_file(
        &self,
        title: &str,
        season: u32,
        episode: u32,
        language: &str,
    ) -> Option<EpisodeFile> {
        match self.find_episode_file(title, season, episode, language) {
            Ok(found) => found,
            Err(e) => {
                error!(error = %e, title, "get_episode_file query failed");
                None
            }
        }
    }

    fn find_episode_file(
        &self,
        title: &str,
        season: u32,
        episode: u32,
        language: &str,
    ) -> Result<Option<EpisodeFile>> {
        let sanitized = filename::sanitize_title(title);
        let variants = filename::language_variants(language);
        let like = |v: &str| format!("%{v}%");

        self.inner.db.query_row(
            r#"
            SELECT id, title, season, episode, language, file_path, file_name,
                   last_modified, indexed_at
            FROM episode_files
            WHERE (title = ?1 OR title LIKE ?2 OR title LIKE ?3)
            AND season = ?4
            AND episode = ?5
            AND (language LIKE ?6 OR language LIKE ?7 OR language LIKE ?8
                 OR language LIKE ?9 OR language LIKE ?10)
            LIMIT 1
            "#,
            params![
                sanitized,
                format!("{sanitized}%"),
                format!("%{sanitized}%"),
                season,
                episode,
                like(&variants[0]),
                like(&variants[1]),
                like(&variants[2]),
                like(&variants[3]),
                like(&variants[4]),
            ],
            EpisodeFile::from_row,
        )
    }

    // ----- metadata cache -----

    /// Upserts series metadata keyed by slug, returning the row id.
    /// `ttl` is the staleness horizon in seconds; [`DEFAULT_TTL_SECS`]
    /// matches the scraper's daily refresh cycle.
    pub fn save_anime_metadata(
        &self,
        slug: &str,
        title: &str,
        description: Option<&str>,
        thumbnail_url: Option<&str>,
        ttl: i64,
    ) -> Result<i64> {
        self.inner.db.with_conn(|conn| {
            conn.query_row(
                r#"
                INSERT INTO anime_metadata
                (slug, title, description, thumbnail_url, last_updated, ttl)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT (slug) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    thumbnail_url = excluded.thumbnail_url,
                    last_updated = excluded.last_updated,
                    ttl = excluded.ttl
                RETURNING id
                "#,
                params![slug, title, description, thumbnail_url, now(), ttl],
                |row| row.get(0),
            )
        })
    }

    /// Cached metadata for `slug`, or `None` when absent or expired.
    /// The caller cannot distinguish "never cached" from "stale"; both
    /// mean a re-fetch from the network.
    pub fn get_anime_metadata(&self, slug: &str) -> Option<AnimeMetadata> {
        match self.fetch_anime_metadata(slug) {
            Ok(anime) => anime,
            Err(e) => {
                error!(error = %e, slug, "anime metadata lookup failed");
                None
            }
        }
    }

    fn fetch_anime_metadata(&self, slug: &str) -> Result<Option<AnimeMetadata>> {
        let anime = self.inner.db.query_row(
            r#"
            SELECT id, slug, title, description, thumbnail_url, last_updated, ttl
            FROM anime_metadata
            WHERE slug = ?1
            "#,
            params![slug],
            AnimeMetadata::from_row,
        )?;

        Ok(anime.filter(|anime| {
            if anime.is_stale(now()) {
                debug!(slug, "cached anime metadata is stale");
                false
            } else {
                true
            }
        }))
    }

    /// Upserts season metadata keyed by (anime, season number).
    pub fn save_season_metadata(
        &self,
        anime_id: i64,
        season_number: u32,
        season_title: &str,
        episode_count: Option<u32>,
    ) -> Result<i64> {
        self.inner.db.with_conn(|conn| {
            conn.query_row(
                r#"
                INSERT INTO season_metadata
                (anime_id, season_number, season_title, episode_count, last_updated)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (anime_id, season_number) DO UPDATE SET
                    season_title = excluded.season_title,
                    episode_count = excluded.episode_count,
                    last_updated = excluded.last_updated
                RETURNING id
                "#,
                params![anime_id, season_number, season_title, episode_count, now()],
                |row| row.get(0),
            )
        })
    }

    pub fn get_seasons_for_anime(&self, anime_id: i64) -> Vec<SeasonMetadata> {
        let result = self.inner.db.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                r#"
                SELECT id, anime_id, season_number, season_title, episode_count, last_updated
                FROM season_metadata
                WHERE anime_id = ?1
                ORDER BY season_number
                "#,
            )?;
            let rows = stmt.query_map(params![anime_id], SeasonMetadata::from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        });
        result.unwrap_or_else(|e| {
            error!(error = %e, anime_id, "season listing failed");
            Vec::new()
        })
    }

    /// Upserts episode metadata keyed by (season, episode number).
    pub fn save_episode_metadata(
        &self,
        season_id: i64,
        episode_number: u32,
        episode_title: Option<&str>,
        url: Option<&str>,
    ) -> Result<i64> {
        self.inner.db.with_conn(|conn| {
            conn.query_row(
                r#"
                INSERT INTO episode_metadata
                (season_id, episode_number, episode_title, url, last_updated)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (season_id, episode_number) DO UPDATE SET
                    episode_title = excluded.episode_title,
                    url = excluded.url,
                    last_updated = excluded.last_updated
                RETURNING id
                "#,
                params![season_id, episode_number, episode_title, url, now()],
                |row| row.get(0),
            )
        })
    }

    pub fn get_episodes_for_season(&self, season_id: i64) -> Vec<EpisodeMetadata> {
        let result = self.inner.db.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                r#"
                SELECT id, season_id, episode_number, episode_title, url, last_updated
                FROM episode_metadata
                WHERE season_id = ?1
                ORDER BY episode_number
                "#,
            )?;
            let rows = stmt.query_map(params![season_id], EpisodeMetadata::from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        });
        result.unwrap_or_else(|e| {
            error!(error = %e, season_id, "episode listing failed");
            Vec::new()
        })
    }

    /// Upserts the availability flag for (episode, language).
    pub fn save_language_availability(
        &self,
        episode_id: i64,
        language: &str,
        is_available: bool,
    ) -> Result<i64> {
        self.inner.db.with_conn(|conn| {
            conn.query_row(
                r#"
                INSERT INTO language_availability
                (episode_id, language, is_available, last_checked)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (episode_id, language) DO UPDATE SET
                    is_available = excluded.is_available,
                    last_checked = excluded.last_checked
                RETURNING id
                "#,
                params![episode_id, language, is_available, now()],
                |row| row.get(0),
            )
        })
    }

    /// All availability rows for a cached episode checked within
    /// `max_age` seconds, available or not.
    pub fn get_language_availability(
        &self,
        episode_id: i64,
        max_age: i64,
    ) -> Vec<LanguageAvailability> {
        let min_time = now() - max_age;
        let result = self.inner.db.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                r#"
                SELECT language, is_available, last_checked
                FROM language_availability
                WHERE episode_id = ?1 AND last_checked >= ?2
                "#,
            )?;
            let rows = stmt.query_map(params![episode_id, min_time], |row| {
                Ok(LanguageAvailability {
                    language: row.get(0)?,
                    is_available: row.get(1)?,
                    last_checked: row.get(2)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        });
        result.unwrap_or_else(|e| {
            error!(error = %e, episode_id, "language availability lookup failed");
            Vec::new()
        })
    }

    /// Whether `language` was observed available for the episode, walking
    /// anime → season → episode by natural keys. `None` means not cached
    /// (any broken link, stale anime metadata, or a check older than
    /// `max_age`), as opposed to a cached `Some(false)`.
    pub fn is_language_available(
        &self,
        slug: &str,
        season_number: u32,
        episode_number: u32,
        language: &str,
        max_age: i64,
    ) -> Option<bool> {
        let episode_id = self.cached_episode_id(slug, season_number, episode_number)?;
        let min_time = now() - max_age;
        match self.inner.db.query_row(
            r#"
            SELECT is_available FROM language_availability
            WHERE episode_id = ?1 AND language = ?2 AND last_checked >= ?3
            "#,
            params![episode_id, language, min_time],
            |row| row.get::<_, bool>(0),
        ) {
            Ok(available) => available,
            Err(e) => {
                error!(error = %e, slug, language, "language availability check failed");
                None
            }
        }
    }

    /// Languages cached as available for the episode, checked within
    /// `max_age` seconds. Empty at any broken link in the metadata chain;
    /// never an error.
    pub fn get_available_languages(
        &self,
        slug: &str,
        season_number: u32,
        episode_number: u32,
        max_age: i64,
    ) -> Vec<String> {
        let Some(episode_id) = self.cached_episode_id(slug, season_number, episode_number) else {
            return Vec::new();
        };
        self.get_language_availability(episode_id, max_age)
            .into_iter()
            .filter(|row| row.is_available)
            .map(|row| row.language)
            .collect()
    }

    /// Resolves the cached episode row id by natural keys, `None` at any
    /// broken link in the chain.
    fn cached_episode_id(
        &self,
        slug: &str,
        season_number: u32,
        episode_number: u32,
    ) -> Option<i64> {
        let anime = self.get_anime_metadata(slug)?;

        let season_id = self
            .inner
            .db
            .query_row(
                "SELECT id FROM season_metadata WHERE anime_id = ?1 AND season_number = ?2",
                params![anime.id, season_number],
                |row| row.get::<_, i64>(0),
            )
            .map_err(|e| error!(error = %e, slug, "season lookup failed"))
            .ok()??;

        self.inner
            .db
            .query_row(
                "SELECT id FROM episode_metadata WHERE season_id = ?1 AND episode_number = ?2",
                params![season_id, episode_number],
                |row| row.get::<_, i64>(0),
            )
            .map_err(|e| error!(error = %e, slug, "episode lookup failed"))
            .ok()?
    }

    /// Force-expires the cached metadata for `slug` by zeroing its
    /// `last_updated`, guaranteeing a miss on the next read without
    /// deleting the season/episode history beneath it. Returns whether a
    /// row was touched.
    pub fn invalidate_cache_for_anime(&self, slug: &str) -> bool {
        match self.inner.db.execute(
            "UPDATE anime_metadata SET last_updated = 0 WHERE slug = ?1",
            params![slug],
        ) {
            Ok(rows) => {
                if rows > 0 {
                    debug!(slug, "invalidated cached metadata");
                }
                rows > 0
            }
            Err(e) => {
                error!(error = %e, slug, "cache invalidation failed");
                false
            }
        }
    }

    // ----- download statistics -----

    /// Appends one download attempt. When `episode` is a lookup tuple
    /// that resolves to nothing, the row is stored with a NULL episode
    /// reference; stats for failed or unmatched downloads are still
    /// worth keeping.
    pub fn save_download_stats(
        &self,
        episode: EpisodeRef<'_>,
        provider: &str,
        download_speed: Option<f64>,
        file_size: Option<i64>,
        download_duration: Option<i64>,
        status: DownloadStatus,
    ) -> Result<i64> {
        let episode_id = match episode {
            EpisodeRef::Id(id) => Some(id),
            EpisodeRef::Lookup {
                title,
                season,
                episode,
                language,
            } => self
                .get_episode_file(title, season, episode, language)
                .map(|file| file.id),
            EpisodeRef::Unknown => None,
        };

        let provider = if provider.is_empty() {
            "unknown"
        } else {
            provider
        };

        let id = self.inner.db.with_conn(|conn| {
            conn.query_row(
                r#"
                INSERT INTO download_stats
                (episode_id, download_date, provider, download_speed, file_size,
                 download_duration, status)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                RETURNING id
                "#,
                params![
                    episode_id,
                    now(),
                    provider,
                    download_speed,
                    file_size,
                    download_duration,
                    status,
                ],
                |row| row.get(0),
            )
        })?;
        debug!(provider, status = status.as_str(), "download statistic saved");
        Ok(id)
    }

    /// Download history joined with file metadata, newest first. All
    /// filters are optional; `days` bounds the age of returned attempts.
    pub fn get_download_stats(
        &self,
        anime_title: Option<&str>,
        provider: Option<&str>,
        days: Option<u32>,
    ) -> Vec<DownloadRecord> {
        let mut sql = String::from(
            r#"
            SELECT ds.id, ds.episode_id, ds.download_date, ds.provider,
                   ds.download_speed, ds.file_size, ds.download_duration, ds.status,
                   ef.title, ef.season, ef.episode, ef.language, ef.file_path
            FROM download_stats ds
            LEFT JOIN episode_files ef ON ds.episode_id = ef.id
            WHERE 1=1
            "#,
        );
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(title) = anime_title {
            sql.push_str(" AND ef.title LIKE ?");
            values.push(Box::new(format!("%{title}%")));
        }
        if let Some(provider) = provider {
            sql.push_str(" AND ds.provider = ?");
            values.push(Box::new(provider.to_string()));
        }
        if let Some(days) = days {
            sql.push_str(" AND ds.download_date >= ?");
            values.push(Box::new(now() - i64::from(days) * 86_400));
        }
        sql.push_str(" ORDER BY ds.download_date DESC");

        let result = self.inner.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
            let rows = stmt.query_map(&refs[..], DownloadRecord::from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        });
        result.unwrap_or_else(|e| {
            error!(error = %e, "download stats query failed");
            Vec::new()
        })
    }

    // ----- maintenance -----

    /// Aggregate numbers about the index: file and title counts, database
    /// size on disk, most recent scan.
    pub fn get_statistics(&self) -> Result<IndexStatistics> {
        let total_files: u64 = self
            .inner
            .db
            .query_row("SELECT COUNT(*) FROM episode_files", [], |row| row.get(0))?
            .unwrap_or(0);
        let total_anime: u64 = self
            .inner
            .db
            .query_row("SELECT COUNT(DISTINCT title) FROM episode_files", [], |row| {
                row.get(0)
            })?
            .unwrap_or(0);
        let last_indexed = self
            .inner
            .db
            .query_row("SELECT MAX(last_scan) FROM scan_history", [], |row| {
                row.get::<_, Option<i64>>(0)
            })?
            .flatten();

        let size_bytes = std::fs::metadata(self.inner.db.path())
            .map(|m| m.len())
            .unwrap_or(0);
        let database_size_mb = (size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;

        Ok(IndexStatistics {
            total_files,
            total_anime,
            database_size_mb,
            last_indexed,
        })
    }

    /// Compacts and re-analyzes the database file.
    pub fn maintenance(&self) -> Result<()> {
        info!("running database maintenance");
        self.inner
            .db
            .with_conn(|conn| conn.execute_batch("VACUUM; ANALYZE;"))
    }
}
