use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".book-tracker";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "books.sqlite";
/// Environment variable that overrides the database location entirely.
const DB_PATH_ENV: &str = "BOOK_TRACKER_DB";

/// Resolve the absolute path of the SQLite database. `BOOK_TRACKER_DB` wins
/// when set; otherwise the file lives inside the user's home directory.
pub fn default_db_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(DB_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    let base_dirs = directories::BaseDirs::new()
        .ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}

/// Ensure the database file exists and carries the `books` table. Runs once
/// at startup; the per-operation connections opened later assume the schema
/// is in place.
pub fn ensure_schema(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(db_path).context("failed to open SQLite database")?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            date_added TEXT NOT NULL,
            summary TEXT NOT NULL DEFAULT '',
            rating TEXT NOT NULL DEFAULT ''
        )",
        [],
    )
    .context("failed to create books table")?;

    Ok(())
}
