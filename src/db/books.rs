use std::path::PathBuf;

use chrono::Local;
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::Book;

/// The four operations the controller needs from persistence. Kept behind a
/// trait so the UI logic can run against an in-memory fake in tests.
pub trait BookStore {
    /// Return all rows, or only those whose title contains `search` as a
    /// substring. Empty or absent terms both mean "all". Rows come back in
    /// ascending id order.
    fn list_books(&self, search: Option<&str>) -> Result<Vec<Book>>;

    /// Insert a new row, stamping `date_added` with the current local time.
    fn add_book(&self, title: &str, author: &str, summary: &str, rating: &str) -> Result<()>;

    /// Rewrite the four mutable fields of the row matching `id`. `id` and
    /// `date_added` are never touched. A missing id is a silent no-op.
    fn update_book(
        &self,
        id: i64,
        title: &str,
        author: &str,
        summary: &str,
        rating: &str,
    ) -> Result<()>;

    /// Hard-delete the row matching `id`. A missing id is a silent no-op.
    fn delete_book(&self, id: i64) -> Result<()>;
}

/// SQLite-backed store. Holds only the database path: every operation opens
/// its own short-lived connection, runs a single statement, and lets the
/// implicit commit close it out. No pooling and no cross-operation
/// transactions.
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Build a store over an existing database file. The schema is expected
    /// to be in place (see [`crate::db::ensure_schema`]).
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }
}

impl BookStore for SqliteStore {
    fn list_books(&self, search: Option<&str>) -> Result<Vec<Book>> {
        let conn = self.connect()?;
        let term = search.map(str::trim).unwrap_or_default();

        // Substring match via LIKE, which follows SQLite's default collation
        // (case-insensitive for ASCII). Ordering is pinned to ascending id so
        // the table is stable across reloads.
        let (sql, filter) = if term.is_empty() {
            (
                "SELECT id, title, author, date_added, summary, rating
                 FROM books ORDER BY id",
                None,
            )
        } else {
            (
                "SELECT id, title, author, date_added, summary, rating
                 FROM books WHERE title LIKE ?1 ORDER BY id",
                Some(format!("%{term}%")),
            )
        };

        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(Book {
                id: row.get(0)?,
                title: row.get(1)?,
                author: row.get(2)?,
                date_added: row.get(3)?,
                summary: row.get(4)?,
                rating: row.get(5)?,
            })
        };

        let books = match filter {
            Some(pattern) => stmt
                .query_map([pattern], map_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], map_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };

        Ok(books)
    }

    fn add_book(&self, title: &str, author: &str, summary: &str, rating: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO books (title, author, date_added, summary, rating)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![title, author, Local::now().naive_local(), summary, rating],
        )?;
        Ok(())
    }

    fn update_book(
        &self,
        id: i64,
        title: &str,
        author: &str,
        summary: &str,
        rating: &str,
    ) -> Result<()> {
        let conn = self.connect()?;
        // Zero affected rows is deliberately not an error; the source program
        // treated updates of vanished ids as successful no-ops and that
        // policy is preserved here.
        conn.execute(
            "UPDATE books SET title = ?1, author = ?2, summary = ?3, rating = ?4 WHERE id = ?5",
            params![title, author, summary, rating, id],
        )?;
        Ok(())
    }

    fn delete_book(&self, id: i64) -> Result<()> {
        let conn = self.connect()?;
        // Same no-op policy as update_book for missing ids.
        conn.execute("DELETE FROM books WHERE id = ?1", params![id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_schema;
    use std::fs;

    /// Fresh store over a throwaway database file unique to the test.
    fn temp_store(name: &str) -> SqliteStore {
        let path = std::env::temp_dir().join(format!(
            "book-tracker-test-{}-{name}.sqlite",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        ensure_schema(&path).unwrap();
        SqliteStore::new(path)
    }

    #[test]
    fn inserted_book_round_trips_with_fresh_timestamp() {
        let store = temp_store("insert");
        let before = Local::now().naive_local();
        store
            .add_book("Dune", "Herbert", "Desert planet", "5")
            .unwrap();
        let after = Local::now().naive_local();

        let books = store.list_books(None).unwrap();
        assert_eq!(books.len(), 1);
        let book = &books[0];
        assert_eq!(book.title, "Dune");
        assert_eq!(book.author, "Herbert");
        assert_eq!(book.summary, "Desert planet");
        assert_eq!(book.rating, "5");
        assert!(book.date_added >= before && book.date_added <= after);
    }

    #[test]
    fn list_orders_by_ascending_id() {
        let store = temp_store("order");
        store.add_book("Zephyr", "A", "", "").unwrap();
        store.add_book("Aurora", "B", "", "").unwrap();
        store.add_book("Meridian", "C", "", "").unwrap();

        let ids: Vec<i64> = store.list_books(None).unwrap().iter().map(|b| b.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn search_returns_exactly_the_substring_matches() {
        let store = temp_store("search");
        store.add_book("Dune", "Herbert", "", "").unwrap();
        store.add_book("Dune Messiah", "Herbert", "", "").unwrap();
        store.add_book("Foundation", "Asimov", "", "").unwrap();

        let hits = store.list_books(Some("Dune")).unwrap();
        assert_eq!(hits.len(), 2);
        for book in &hits {
            assert!(book.title.contains("Dune"));
        }

        // Empty and whitespace-only terms fall back to the unfiltered list.
        assert_eq!(store.list_books(Some("")).unwrap().len(), 3);
        assert_eq!(store.list_books(Some("   ")).unwrap().len(), 3);
    }

    #[test]
    fn search_is_case_insensitive_for_ascii() {
        // Inherited from SQLite's default LIKE collation rather than chosen.
        let store = temp_store("collation");
        store.add_book("Dune", "Herbert", "", "").unwrap();
        assert_eq!(store.list_books(Some("dune")).unwrap().len(), 1);
    }

    #[test]
    fn update_rewrites_mutable_fields_only() {
        let store = temp_store("update");
        store.add_book("Dune", "Herbert", "Desert planet", "5").unwrap();
        let original = store.list_books(None).unwrap().remove(0);

        store
            .update_book(original.id, "Dune", "Frank Herbert", "Desert planet", "4")
            .unwrap();

        let updated = store.list_books(None).unwrap().remove(0);
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.date_added, original.date_added);
        assert_eq!(updated.author, "Frank Herbert");
        assert_eq!(updated.rating, "4");
    }

    #[test]
    fn update_of_missing_id_is_a_silent_no_op() {
        let store = temp_store("update-missing");
        store.add_book("Dune", "Herbert", "", "").unwrap();
        store.update_book(9999, "Ghost", "Nobody", "", "").unwrap();

        let books = store.list_books(None).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Dune");
    }

    #[test]
    fn delete_removes_the_row_and_tolerates_repeats() {
        let store = temp_store("delete");
        store.add_book("Dune", "Herbert", "", "").unwrap();
        let id = store.list_books(None).unwrap()[0].id;

        store.delete_book(id).unwrap();
        assert!(store.list_books(None).unwrap().is_empty());

        // Deleting the same id again succeeds without touching anything.
        store.delete_book(id).unwrap();
        assert!(store.list_books(None).unwrap().is_empty());
    }
}
