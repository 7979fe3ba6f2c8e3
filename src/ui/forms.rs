use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::error::{Error, Result};
use crate::models::Book;

/// Form state backing the book details panel and the add/edit modal. The
/// four fields mirror the mutable columns of a row; id and date stay out of
/// the form because they are display-only.
#[derive(Default, Clone)]
pub(crate) struct BookForm {
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) summary: String,
    pub(crate) rating: String,
    pub(crate) active: BookField,
    pub(crate) error: Option<String>,
}

/// Enumerates the editable fields to drive focus management.
#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) enum BookField {
    Title,
    Author,
    Summary,
    Rating,
}

impl Default for BookField {
    fn default() -> Self {
        BookField::Title
    }
}

impl BookForm {
    /// Copy the editable fields out of a row, as happens when the selection
    /// moves in the table. `id` and `date_added` are deliberately left out.
    pub(crate) fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            summary: book.summary.clone(),
            rating: book.rating.clone(),
            active: BookField::Title,
            error: None,
        }
    }

    /// Cycle focus forward across the four fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            BookField::Title => BookField::Author,
            BookField::Author => BookField::Summary,
            BookField::Summary => BookField::Rating,
            BookField::Rating => BookField::Title,
        };
    }

    /// Cycle focus backward (Shift-Tab).
    pub(crate) fn toggle_field_back(&mut self) {
        self.active = match self.active {
            BookField::Title => BookField::Rating,
            BookField::Author => BookField::Title,
            BookField::Summary => BookField::Author,
            BookField::Rating => BookField::Summary,
        };
    }

    /// Insert a character into the active field.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.field_mut(self.active).push(ch);
        true
    }

    /// Remove the last character from the active field.
    pub(crate) fn backspace(&mut self) {
        self.field_mut(self.active).pop();
    }

    /// Validate and normalize the inputs before they are written to the
    /// database. Title and author are the only required fields.
    pub(crate) fn parse_inputs(&self) -> Result<(String, String, String, String)> {
        let title = self.title.trim();
        let author = self.author.trim();
        if title.is_empty() || author.is_empty() {
            return Err(Error::validation("Title and Author are required."));
        }
        Ok((
            title.to_string(),
            author.to_string(),
            self.summary.trim().to_string(),
            self.rating.trim().to_string(),
        ))
    }

    /// Render a styled line for the modal form widget.
    pub(crate) fn build_line(&self, field_name: &str, field: BookField) -> Line<'static> {
        let value = self.field_ref(field);
        let is_active = self.active == field;

        let placeholder = match field {
            BookField::Title | BookField::Author => "<required>",
            BookField::Summary | BookField::Rating => "<optional>",
        };
        let display = if value.is_empty() {
            placeholder.to_string()
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    /// Character count of the requested field, used for cursor placement.
    pub(crate) fn value_len(&self, field: BookField) -> usize {
        self.field_ref(field).chars().count()
    }

    fn field_ref(&self, field: BookField) -> &String {
        match field {
            BookField::Title => &self.title,
            BookField::Author => &self.author,
            BookField::Summary => &self.summary,
            BookField::Rating => &self.rating,
        }
    }

    fn field_mut(&mut self, field: BookField) -> &mut String {
        match field {
            BookField::Title => &mut self.title,
            BookField::Author => &mut self.author,
            BookField::Summary => &mut self.summary,
            BookField::Rating => &mut self.rating,
        }
    }
}

/// State for confirming a hard delete of the selected row.
#[derive(Clone)]
pub(crate) struct ConfirmDelete {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) author: String,
}

impl ConfirmDelete {
    /// Build the confirmation state from the row being considered.
    pub(crate) fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
        }
    }
}

/// Destination prompt for the plain-text export.
#[derive(Default, Clone)]
pub(crate) struct ExportForm {
    pub(crate) path: String,
    pub(crate) error: Option<String>,
}

impl ExportForm {
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.path.push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.path.pop();
    }

    /// Require a non-empty destination before attempting the write.
    pub(crate) fn parse_destination(&self) -> Result<std::path::PathBuf> {
        let trimmed = self.path.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("Destination path is required."));
        }
        Ok(std::path::PathBuf::from(trimmed))
    }
}
