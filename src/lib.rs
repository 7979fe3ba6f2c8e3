//! Core library surface for the Book Tracker TUI application.
//!
//! The public modules exposed here provide an intentionally small API so the
//! `bin` target as well as potential external tooling can reuse the same
//! pieces: the persistence layer, the domain model, and the interactive app.
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod ui;

/// Convenience re-exports for the persistence layer, typically used by
/// `main.rs` to locate and initialize the embedded SQLite store.
pub use db::{default_db_path, ensure_schema, BookStore, SqliteStore};

/// The domain type every layer passes around.
pub use models::Book;

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
