use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("could not determine application data directory")]
    NoDataDir,

    #[error("failed to create database directory {0}")]
    CreateDir(PathBuf, #[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
