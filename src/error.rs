//! Error taxonomy for user-facing actions. Every variant is terminal to the
//! current action only; the UI reports the message in the footer and returns
//! to an idle state.

use std::io;

use thiserror::Error;

/// Result alias used by the store, the controller handlers, and the export
/// path.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing or no row is selected. Nothing was sent to
    /// the database; the user can correct the input and retry.
    #[error("{0}")]
    Validation(String),

    /// The database connection or statement failed. Each operation is a
    /// single statement, so there is no partial state to clean up.
    #[error("Database error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// The export destination could not be written. In-memory state is
    /// unaffected.
    #[error("Could not save file: {0}")]
    Export(#[source] io::Error),
}

impl Error {
    /// Shorthand for building validation errors from literal messages.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}
