/// Idempotent schema batch, executed on every startup.
///
/// Connection-level pragmas live in the connection manager since WAL and
/// foreign-key enforcement apply per connection, not per database file.
pub const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS episode_files (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        season INTEGER NOT NULL,
        episode INTEGER NOT NULL,
        language TEXT NOT NULL,
        file_path TEXT NOT NULL UNIQUE,
        file_name TEXT NOT NULL,
        last_modified INTEGER NOT NULL,
        indexed_at INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_episode_search
    ON episode_files (title, season, episode, language);

    CREATE INDEX IF NOT EXISTS idx_file_path
    ON episode_files (file_path);

    CREATE TABLE IF NOT EXISTS scan_history (
        id INTEGER PRIMARY KEY,
        directory TEXT NOT NULL UNIQUE,
        last_scan INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS download_stats (
        id INTEGER PRIMARY KEY,
        episode_id INTEGER,
        download_date INTEGER NOT NULL,
        provider TEXT NOT NULL,
        download_speed REAL,
        file_size INTEGER,
        download_duration INTEGER,
        status TEXT NOT NULL,

        CONSTRAINT fk_episode_file
        FOREIGN KEY (episode_id)
        REFERENCES episode_files (id)
    );

    CREATE INDEX IF NOT EXISTS idx_download_stats_episode
    ON download_stats (episode_id);

    CREATE TABLE IF NOT EXISTS anime_metadata (
        id INTEGER PRIMARY KEY,
        slug TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        description TEXT,
        thumbnail_url TEXT,
        last_updated INTEGER NOT NULL,
        ttl INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS season_metadata (
        id INTEGER PRIMARY KEY,
        anime_id INTEGER NOT NULL,
        season_number INTEGER NOT NULL,
        season_title TEXT NOT NULL,
        episode_count INTEGER,
        last_updated INTEGER NOT NULL,

        FOREIGN KEY (anime_id)
        REFERENCES anime_metadata (id) ON DELETE CASCADE,
        UNIQUE (anime_id, season_number)
    );

    CREATE TABLE IF NOT EXISTS episode_metadata (
        id INTEGER PRIMARY KEY,
        season_id INTEGER NOT NULL,
        episode_number INTEGER NOT NULL,
        episode_title TEXT,
        url TEXT,
        last_updated INTEGER NOT NULL,

        FOREIGN KEY (season_id)
        REFERENCES season_metadata (id) ON DELETE CASCADE,
        UNIQUE (season_id, episode_number)
    );

    CREATE TABLE IF NOT EXISTS language_availability (
        id INTEGER PRIMARY KEY,
        episode_id INTEGER NOT NULL,
        language TEXT NOT NULL,
        is_available INTEGER NOT NULL,
        last_checked INTEGER NOT NULL,

        FOREIGN KEY (episode_id)
        REFERENCES episode_metadata (id) ON DELETE CASCADE,
        UNIQUE (episode_id, language)
    );

    CREATE INDEX IF NOT EXISTS idx_anime_slug
    ON anime_metadata (slug);

    CREATE INDEX IF NOT EXISTS idx_season_anime
    ON season_metadata (anime_id);

    CREATE INDEX IF NOT EXISTS idx_episode_season
    ON episode_metadata (season_id);

    CREATE INDEX IF NOT EXISTS idx_language_episode
    ON language_availability (episode_id, language);
"#;
