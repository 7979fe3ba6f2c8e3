//! Binary entry point that glues the SQLite-backed catalog to the TUI: we
//! locate the database, make sure the schema exists, hydrate the initial row
//! set, and drive the Ratatui event loop until the user exits.
use book_tracker::{default_db_path, ensure_schema, run_app, App, BookStore, SqliteStore};

/// Initialize persistence, load the catalog, and launch the event loop.
///
/// Returning a `Result` bubbles up fatal initialization problems (for example
/// an unwritable data directory) to the terminal instead of crashing silently.
fn main() -> anyhow::Result<()> {
    let db_path = default_db_path()?;
    ensure_schema(&db_path)?;

    let store = SqliteStore::new(db_path);
    let rows = store.list_books(None)?;

    let mut app = App::new(store, rows);
    run_app(&mut app)
}
