use std::{
    collections::{hash_map::Entry, HashMap},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
    thread::{self, ThreadId},
};

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Error, Result};

/// Thread-safe access to a single SQLite file.
///
/// Each thread gets its own lazily-opened [`Connection`]; a single mutex
/// serializes statement execution across all threads. SQLite connections
/// must not be shared between threads, and SQLite tolerates only one
/// writer at a time, so there is no real write concurrency to gain here.
/// The lock is held only while a statement (or explicit transaction) runs,
/// never across filesystem walks or network waits.
#[derive(Debug)]
pub struct ThreadSafeSqlite {
    path: PathBuf,
    connections: Mutex<HashMap<ThreadId, Connection>>,
}

impl ThreadSafeSqlite {
    /// Opens the database at `path`, creating parent directories if needed.
    ///
    /// A probe connection is opened eagerly so that an unusable database
    /// file fails construction instead of every later call.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::CreateDir(parent.to_path_buf(), e))?;
        }

        let probe = Self::connect(&path)?;
        let mut map = HashMap::new();
        map.insert(thread::current().id(), probe);

        debug!(path = %path.display(), "opened sqlite database");
        Ok(Self {
            path,
            connections: Mutex::new(map),
        })
    }

    fn connect(path: &Path) -> Result<Connection> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = normal;
            PRAGMA busy_timeout = 5000;
            PRAGMA foreign_keys = ON;
        "#,
        )?;
        Ok(conn)
    }

    /// Runs `f` against this thread's connection while holding the
    /// statement lock. Driver errors propagate unchanged; the manager
    /// does not retry.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let mut map = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let conn = match map.entry(thread::current().id()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Self::connect(&self.path)?),
        };

        f(conn).map_err(Error::from)
    }

    /// Executes a single statement, returning the number of affected rows.
    pub fn execute(&self, sql: &str, params: impl rusqlite::Params) -> Result<usize> {
        self.with_conn(|conn| conn.execute(sql, params))
    }

    /// Runs one query and maps its first row, `None` when no row matched.
    pub fn query_row<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        f: impl FnOnce(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>> {
        use rusqlite::OptionalExtension;
        self.with_conn(|conn| conn.query_row(sql, params, f).optional())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drops every thread's connection. Statements issued afterwards
    /// reconnect transparently.
    pub fn close(&self) {
        let mut map = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn one_connection_per_thread() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(ThreadSafeSqlite::open(dir.path().join("t.db")).unwrap());
        db.with_conn(|conn| {
            conn.execute_batch("CREATE TABLE kv (k TEXT PRIMARY KEY, v INT)")
        })
        .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        db.execute(
                            "INSERT OR REPLACE INTO kv (k, v) VALUES (?1, ?2)",
                            rusqlite::params![format!("{i}-{j}"), j],
                        )
                        .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let count: i64 = db
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))
            .unwrap()
            .unwrap();
        assert_eq!(count, 8 * 50);
    }

    #[test]
    fn close_then_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let db = ThreadSafeSqlite::open(dir.path().join("t.db")).unwrap();
        db.with_conn(|conn| conn.execute_batch("CREATE TABLE t (x INT)"))
            .unwrap();
        db.close();
        db.execute("INSERT INTO t (x) VALUES (1)", []).unwrap();
    }
}
