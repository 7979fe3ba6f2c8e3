//! Plain-text export of the currently displayed row set. One line per row,
//! six fields joined by `" | "` in table column order, no header. The
//! delimiter is not escaped inside field values; that ambiguity is a known
//! property of the format, carried over from the original report file.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::Book;

/// Render the rows into the full file payload, one line per book.
pub fn render_rows(rows: &[Book]) -> String {
    let mut out = String::new();
    for book in rows {
        out.push_str(&book.export_line());
        out.push('\n');
    }
    out
}

/// Write the rendered rows to `destination`. Callers are expected to reject
/// an empty row set before getting here; an empty slice still produces an
/// empty file rather than an error.
pub fn write_rows(destination: &Path, rows: &[Book]) -> Result<()> {
    fs::write(destination, render_rows(rows)).map_err(Error::Export)
}
