//! Domain model that mirrors the SQLite schema and gets passed throughout the
//! TUI. The intent is that this type stays a light-weight data holder so the
//! other layers can focus on presentation and persistence logic.

use chrono::NaiveDateTime;

/// Render format shared by the table view and the plain-text export.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, PartialEq)]
/// In-memory representation of a catalog entry. Mirrors one row of the
/// `books` table.
pub struct Book {
    /// Primary key from the database. We keep this around even though the UI
    /// only displays it because the update/delete flows bubble the id back to
    /// the persistence layer.
    pub id: i64,
    /// Title shown in the table and matched by the search filter.
    pub title: String,
    /// Author, required alongside the title when creating a row.
    pub author: String,
    /// Set once at insertion time, never rewritten by updates.
    pub date_added: NaiveDateTime,
    /// Optional free-text blurb.
    pub summary: String,
    /// Optional free-text rating. Deliberately unvalidated; "5", "4/5" and
    /// "excellent" are all acceptable.
    pub rating: String,
}

impl Book {
    /// `date_added` rendered down to the minute, the precision the table and
    /// export columns use.
    pub fn display_date(&self) -> String {
        self.date_added.format(DATE_FORMAT).to_string()
    }

    /// One export line: the six columns in table order joined by `" | "`.
    /// Field values containing the delimiter are written as-is, so such a
    /// line is ambiguous on re-parse. Known limitation of the format.
    pub fn export_line(&self) -> String {
        [
            self.id.to_string(),
            self.title.clone(),
            self.author.clone(),
            self.display_date(),
            self.summary.clone(),
            self.rating.clone(),
        ]
        .join(" | ")
    }
}
