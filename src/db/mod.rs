//! Persistence module split across logical submodules.

mod books;
mod connection;

pub use books::{BookStore, SqliteStore};
pub use connection::{default_db_path, ensure_schema};
