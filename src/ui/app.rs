use std::mem;

use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;

use crate::db::BookStore;
use crate::error::{Error, Result};
use crate::export;
use crate::models::Book;

use super::forms::{BookField, BookForm, ConfirmDelete, ExportForm};
use super::helpers::{centered_rect, truncate_cell};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Height of the search bar strip at the top of the screen.
const SEARCH_BAR_HEIGHT: u16 = 3;
/// Height of the book details panel between the search bar and the table.
const DETAILS_HEIGHT: u16 = 7;
/// Widest a summary cell is allowed to grow before it gets clipped.
const SUMMARY_CELL_WIDTH: usize = 60;

/// Modal states layered over the table. Keeping this explicit makes it easy
/// to reason about which rendering path runs and what each key should do.
enum Mode {
    Normal,
    AddingBook(BookForm),
    EditingBook { id: i64, form: BookForm },
    ConfirmDelete(ConfirmDelete),
    Searching(SearchState),
    Exporting(ExportForm),
}

/// State for an active inline title search.
struct SearchState {
    query: String,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state: the displayed row set, the selection, the
/// details form, and the active modal. Generic over the store so the
/// controller logic can be exercised against an in-memory fake.
pub struct App<S: BookStore> {
    store: S,
    rows: Vec<Book>,
    selected: Option<usize>,
    form: BookForm,
    search: String,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl<S: BookStore> App<S> {
    pub fn new(store: S, rows: Vec<Book>) -> Self {
        Self {
            store,
            rows,
            selected: None,
            form: BookForm::default(),
            search: String::new(),
            mode: Mode::Normal,
            status: None,
        }
    }

    /// Dispatch one key press. Returns `true` when the user asked to quit.
    /// Store and export failures never escape this method; they surface as
    /// footer messages and the app stays interactive.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::AddingBook(form) => self.handle_add_book(code, form),
            Mode::EditingBook { id, form } => self.handle_edit_book(code, id, form),
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm),
            Mode::Searching(state) => self.handle_search(code, state),
            Mode::Exporting(form) => self.handle_export(code, form),
        };

        exit
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                *exit = true;
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-5),
            KeyCode::PageDown => self.move_selection(5),
            KeyCode::Home => self.select_first(),
            KeyCode::End => self.select_last(),
            KeyCode::Char('a') | KeyCode::Char('A') => {
                self.clear_status();
                // Seed the modal with the details panel contents so the
                // select-then-tweak-then-add flow of the original UI works.
                let mut form = self.form.clone();
                form.active = BookField::Title;
                form.error = None;
                return Mode::AddingBook(form);
            }
            KeyCode::Char('e') | KeyCode::Char('E') => match self.selected_book().map(|b| b.id) {
                Some(id) => {
                    self.clear_status();
                    let mut form = self.form.clone();
                    form.active = BookField::Title;
                    form.error = None;
                    return Mode::EditingBook { id, form };
                }
                None => self.set_status("No book selected.", StatusKind::Error),
            },
            KeyCode::Char('d') | KeyCode::Char('D') => match self.selected_book().cloned() {
                Some(book) => {
                    self.clear_status();
                    return Mode::ConfirmDelete(ConfirmDelete::from(&book));
                }
                None => self.set_status("No book selected.", StatusKind::Error),
            },
            KeyCode::Char('f') | KeyCode::Char('/') => {
                self.clear_status();
                return Mode::Searching(SearchState {
                    query: String::new(),
                });
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                // "Show all": same unfiltered query the search box falls back
                // to, exposed as its own control.
                match self.reload_rows() {
                    Ok(()) => self.set_status("Showing all books.", StatusKind::Info),
                    Err(err) => self.report(&err),
                }
            }
            KeyCode::Char('x') | KeyCode::Char('X') => {
                if self.rows.is_empty() {
                    self.set_status("There are no results to export.", StatusKind::Info);
                } else {
                    self.clear_status();
                    return Mode::Exporting(ExportForm::default());
                }
            }
            _ => {}
        }
        Mode::Normal
    }

    fn handle_add_book(&mut self, code: KeyCode, mut form: BookForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Add cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Tab => form.toggle_field(),
            KeyCode::BackTab => form.toggle_field_back(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.submit_add(&form) {
                Ok(()) => return Mode::Normal,
                Err(err) => {
                    form.error = Some(err.to_string());
                    self.report(&err);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Mode::AddingBook(form)
    }

    fn handle_edit_book(&mut self, code: KeyCode, id: i64, mut form: BookForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Tab => form.toggle_field(),
            KeyCode::BackTab => form.toggle_field_back(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.submit_update(id, &form) {
                Ok(()) => return Mode::Normal,
                Err(err) => {
                    form.error = Some(err.to_string());
                    self.report(&err);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Mode::EditingBook { id, form }
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmDelete) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_delete(&confirm) {
                    Ok(()) => Mode::Normal,
                    Err(err) => {
                        self.report(&err);
                        Mode::ConfirmDelete(confirm)
                    }
                }
            }
            _ => Mode::ConfirmDelete(confirm),
        }
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Mode {
        match code {
            KeyCode::Esc => {
                // Leaving the search drops the filter and shows everything.
                if let Err(err) = self.reload_rows() {
                    self.report(&err);
                }
                return Mode::Normal;
            }
            KeyCode::Enter => {
                self.set_status(
                    if self.search.trim().is_empty() {
                        "Showing all books.".to_string()
                    } else {
                        format!("Filtering titles by \"{}\".", self.search.trim())
                    },
                    StatusKind::Info,
                );
                return Mode::Normal;
            }
            KeyCode::Up => {
                self.move_selection(-1);
                return Mode::Searching(state);
            }
            KeyCode::Down => {
                self.move_selection(1);
                return Mode::Searching(state);
            }
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    state.query.push(ch);
                }
            }
            _ => return Mode::Searching(state),
        }

        // Re-query on every edit; the displayed rows are always a direct
        // projection of the table, never filtered client-side.
        if let Err(err) = self.apply_search(&state.query) {
            self.report(&err);
        }
        Mode::Searching(state)
    }

    fn handle_export(&mut self, code: KeyCode, mut form: ExportForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Export cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.perform_export(&form) {
                Ok(()) => return Mode::Normal,
                Err(err) => {
                    form.error = Some(err.to_string());
                    self.report(&err);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Mode::Exporting(form)
    }

    /// Validate and insert, then clear the form and reload the full table.
    fn submit_add(&mut self, form: &BookForm) -> Result<()> {
        let (title, author, summary, rating) = form.parse_inputs()?;
        self.store.add_book(&title, &author, &summary, &rating)?;
        self.clear_fields();
        self.reload_rows()?;
        self.set_status(format!("Added \"{title}\"."), StatusKind::Info);
        Ok(())
    }

    /// Validate and rewrite the selected row's mutable fields.
    fn submit_update(&mut self, id: i64, form: &BookForm) -> Result<()> {
        let (title, author, summary, rating) = form.parse_inputs()?;
        self.store
            .update_book(id, &title, &author, &summary, &rating)?;
        self.clear_fields();
        self.reload_rows()?;
        self.set_status(format!("Updated \"{title}\"."), StatusKind::Info);
        Ok(())
    }

    fn perform_delete(&mut self, confirm: &ConfirmDelete) -> Result<()> {
        self.store.delete_book(confirm.id)?;
        self.clear_fields();
        self.reload_rows()?;
        self.set_status(format!("Deleted \"{}\".", confirm.title), StatusKind::Info);
        Ok(())
    }

    /// Serialize exactly what is on screen; a fresh query could disagree with
    /// the table the user just looked at.
    fn perform_export(&mut self, form: &ExportForm) -> Result<()> {
        let destination = form.parse_destination()?;
        export::write_rows(&destination, &self.rows)?;
        self.set_status(
            format!(
                "Exported {} book(s) to {}.",
                self.rows.len(),
                destination.display()
            ),
            StatusKind::Info,
        );
        Ok(())
    }

    /// Replace the row set with the unfiltered table contents and drop any
    /// active search term. Runs after every mutation.
    fn reload_rows(&mut self) -> Result<()> {
        self.search.clear();
        self.rows = self.store.list_books(None)?;
        self.clamp_selection();
        Ok(())
    }

    /// Replace the row set with a title-substring query.
    fn apply_search(&mut self, term: &str) -> Result<()> {
        self.rows = self.store.list_books(Some(term))?;
        self.search = term.to_string();
        self.selected = if self.rows.is_empty() { None } else { Some(0) };
        self.sync_form_from_selection();
        Ok(())
    }

    /// Copy the newly selected row's editable fields into the details form.
    /// The id and timestamp stay display-only.
    fn sync_form_from_selection(&mut self) {
        if let Some(book) = self.selected_book() {
            self.form = BookForm::from_book(book);
        }
    }

    fn clear_fields(&mut self) {
        self.form = BookForm::default();
        self.selected = None;
    }

    fn clamp_selection(&mut self) {
        match self.selected {
            Some(_) if self.rows.is_empty() => {
                self.selected = None;
            }
            Some(idx) if idx >= self.rows.len() => {
                self.selected = Some(self.rows.len() - 1);
                self.sync_form_from_selection();
            }
            _ => {}
        }
    }

    fn move_selection(&mut self, offset: isize) {
        if self.rows.is_empty() {
            return;
        }
        let current = self.selected.map(|idx| idx as isize).unwrap_or(-1);
        let last = self.rows.len() as isize - 1;
        let next = (current + offset).clamp(0, last) as usize;
        self.selected = Some(next);
        self.sync_form_from_selection();
    }

    fn select_first(&mut self) {
        if !self.rows.is_empty() {
            self.selected = Some(0);
            self.sync_form_from_selection();
        }
    }

    fn select_last(&mut self) {
        if !self.rows.is_empty() {
            self.selected = Some(self.rows.len() - 1);
            self.sync_form_from_selection();
        }
    }

    fn selected_book(&self) -> Option<&Book> {
        self.selected.and_then(|idx| self.rows.get(idx))
    }

    fn set_status<T: Into<String>>(&mut self, text: T, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn report(&mut self, err: &Error) {
        self.set_status(err.to_string(), StatusKind::Error);
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(SEARCH_BAR_HEIGHT),
                Constraint::Length(DETAILS_HEIGHT),
                Constraint::Min(1),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_search_header(frame, chunks[0]);
        self.draw_details_panel(frame, chunks[1]);
        self.draw_table(frame, chunks[2]);
        self.draw_footer(frame, chunks[3]);

        match &self.mode {
            Mode::AddingBook(form) => self.draw_book_form(frame, area, "Add Book", form),
            Mode::EditingBook { form, .. } => self.draw_book_form(frame, area, "Edit Book", form),
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::Searching(state) => self.draw_search_bar(frame, area, state),
            Mode::Exporting(form) => self.draw_export_form(frame, area, form),
            Mode::Normal => {}
        }
    }

    fn draw_search_header(&self, frame: &mut Frame, area: Rect) {
        let filter = if self.search.trim().is_empty() {
            Span::styled("all books", Style::default().fg(Color::DarkGray))
        } else {
            Span::styled(
                format!("title contains \"{}\"", self.search.trim()),
                Style::default().fg(Color::Yellow),
            )
        };
        let line = Line::from(vec![Span::raw("Showing: "), filter]);
        let paragraph = Paragraph::new(line)
            .block(Block::default().borders(Borders::ALL).title("Book Tracker"));
        frame.render_widget(paragraph, area);
    }

    fn draw_details_panel(&self, frame: &mut Frame, area: Rect) {
        let identity = match self.selected_book() {
            Some(book) => Line::from(vec![
                Span::styled(
                    format!("#{}", book.id),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("  added {}", book.display_date())),
            ]),
            None => Line::from(Span::styled(
                "No book selected.",
                Style::default().fg(Color::DarkGray),
            )),
        };

        let lines = vec![
            self.form.build_line("Title", BookField::Title),
            self.form.build_line("Author", BookField::Author),
            self.form.build_line("Summary", BookField::Summary),
            self.form.build_line("Rating", BookField::Rating),
            identity,
        ];

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Book Details"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_table(&self, frame: &mut Frame, area: Rect) {
        if self.rows.is_empty() {
            let message = Paragraph::new("No books to show. Press 'a' to add one.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Books"));
            frame.render_widget(message, area);
            return;
        }

        let header = Row::new(["ID", "Title", "Author", "Added", "Summary", "Rating"])
            .style(Style::default().add_modifier(Modifier::BOLD));

        let rows = self.rows.iter().map(|book| {
            Row::new(vec![
                Cell::from(book.id.to_string()),
                Cell::from(book.title.clone()),
                Cell::from(book.author.clone()),
                Cell::from(book.display_date()),
                Cell::from(truncate_cell(&book.summary, SUMMARY_CELL_WIDTH)),
                Cell::from(book.rating.clone()),
            ])
        });

        let widths = [
            Constraint::Length(6),
            Constraint::Percentage(25),
            Constraint::Percentage(18),
            Constraint::Length(16),
            Constraint::Percentage(32),
            Constraint::Length(8),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Books"))
            .row_highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        let mut state = TableState::default();
        state.select(self.selected);
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        match &self.mode {
            Mode::Normal => Line::from(vec![
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select   "),
                Span::styled("[a]", key_style),
                Span::raw(" Add   "),
                Span::styled("[e]", key_style),
                Span::raw(" Edit   "),
                Span::styled("[d]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[/]", key_style),
                Span::raw(" Search   "),
                Span::styled("[r]", key_style),
                Span::raw(" Show All   "),
                Span::styled("[x]", key_style),
                Span::raw(" Export   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
            Mode::Searching(_) => Line::from(vec![
                Span::styled("[Enter]", key_style),
                Span::raw(" Keep filter   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Show all   "),
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select"),
            ]),
            Mode::ConfirmDelete(_) => Line::from(vec![
                Span::styled("[y]", key_style),
                Span::raw(" Confirm   "),
                Span::styled("[n]", key_style),
                Span::raw(" Cancel"),
            ]),
            _ => Line::from(vec![
                Span::styled("[Enter]", key_style),
                Span::raw(" Save   "),
                Span::styled("[Tab]", key_style),
                Span::raw(" Next field   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
        }
    }

    fn draw_book_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &BookForm) {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line("Title", BookField::Title),
            form.build_line("Author", BookField::Author),
            form.build_line("Summary", BookField::Summary),
            form.build_line("Rating", BookField::Rating),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let (prefix, row) = match form.active {
            BookField::Title => ("Title: ", 0),
            BookField::Author => ("Author: ", 1),
            BookField::Summary => ("Summary: ", 2),
            BookField::Rating => ("Rating: ", 3),
        };
        let cursor_x = inner.x + prefix.len() as u16 + form.value_len(form.active) as u16;
        frame.set_cursor_position((cursor_x, inner.y + row));
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Delete")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!(
                "Are you sure you want to delete \"{}\" by {}?",
                confirm.title, confirm.author
            )),
            Line::from("The row is removed permanently."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let height = SEARCH_BAR_HEIGHT.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title("Search Title");
        let paragraph = Paragraph::new(Span::raw(format!("Search: {}", state.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + "Search: ".len() as u16 + state.query.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_export_form(&self, frame: &mut Frame, area: Rect, form: &ExportForm) {
        let popup_area = centered_rect(70, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Export Results")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            Line::from(format!("{} book(s) will be written.", self.rows.len())),
            Line::from(vec![Span::raw("File: "), Span::raw(form.path.clone())]),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to write • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let cursor_x = inner.x + "File: ".len() as u16 + form.path.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::fs;

    use chrono::Local;

    /// In-memory stand-in for the SQLite store. Counts mutating calls so
    /// tests can assert that invalid input never reaches the database.
    struct MemoryStore {
        books: RefCell<Vec<Book>>,
        next_id: Cell<i64>,
        mutations: Cell<usize>,
    }

    impl MemoryStore {
        fn new(books: Vec<Book>) -> Self {
            let next_id = books.iter().map(|b| b.id).max().unwrap_or(0) + 1;
            Self {
                books: RefCell::new(books),
                next_id: Cell::new(next_id),
                mutations: Cell::new(0),
            }
        }
    }

    impl BookStore for MemoryStore {
        fn list_books(&self, search: Option<&str>) -> Result<Vec<Book>> {
            let term = search.map(str::trim).unwrap_or_default().to_lowercase();
            let mut books: Vec<Book> = self
                .books
                .borrow()
                .iter()
                .filter(|b| term.is_empty() || b.title.to_lowercase().contains(&term))
                .cloned()
                .collect();
            books.sort_by_key(|b| b.id);
            Ok(books)
        }

        fn add_book(&self, title: &str, author: &str, summary: &str, rating: &str) -> Result<()> {
            self.mutations.set(self.mutations.get() + 1);
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            self.books.borrow_mut().push(Book {
                id,
                title: title.to_string(),
                author: author.to_string(),
                date_added: Local::now().naive_local(),
                summary: summary.to_string(),
                rating: rating.to_string(),
            });
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
            self.mutations.set(self.mutations.get() + 1);
            if let Some(book) = self.books.borrow_mut().iter_mut().find(|b| b.id == id) {
                book.title = title.to_string();
                book.author = author.to_string();
                book.summary = summary.to_string();
                book.rating = rating.to_string();
            }
            Ok(())
        }

        fn delete_book(&self, id: i64) -> Result<()> {
            self.mutations.set(self.mutations.get() + 1);
            self.books.borrow_mut().retain(|b| b.id != id);
            Ok(())
        }
    }

    fn book(id: i64, title: &str, author: &str) -> Book {
        Book {
            id,
            title: title.to_string(),
            author: author.to_string(),
            date_added: Local::now().naive_local(),
            summary: String::new(),
            rating: String::new(),
        }
    }

    fn app_with(books: Vec<Book>) -> App<MemoryStore> {
        let store = MemoryStore::new(books);
        let rows = store.list_books(None).unwrap();
        App::new(store, rows)
    }

    #[test]
    fn add_with_blank_title_touches_neither_store_nor_rows() {
        let mut app = app_with(vec![book(1, "Dune", "Herbert")]);
        let mut form = BookForm::default();
        form.author = "Somebody".to_string();
        app.mode = Mode::AddingBook(form);

        app.handle_key(KeyCode::Enter);

        assert_eq!(app.store.mutations.get(), 0);
        assert_eq!(app.rows.len(), 1);
        assert!(matches!(app.mode, Mode::AddingBook(_)));
        assert!(matches!(
            app.status,
            Some(StatusMessage {
                kind: StatusKind::Error,
                ..
            })
        ));
    }

    #[test]
    fn valid_add_inserts_clears_fields_and_reloads() {
        let mut app = app_with(vec![]);
        let mut form = BookForm::default();
        form.title = "Dune".to_string();
        form.author = "Herbert".to_string();
        form.summary = "Desert planet".to_string();
        form.rating = "5".to_string();
        app.mode = Mode::AddingBook(form);

        app.handle_key(KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.rows.len(), 1);
        assert_eq!(app.rows[0].title, "Dune");
        assert!(app.form.title.is_empty());
        assert!(app.selected.is_none());
    }

    #[test]
    fn selection_copies_editable_fields_into_the_form() {
        let mut app = app_with(vec![book(1, "Dune", "Herbert"), book(2, "Foundation", "Asimov")]);

        app.handle_key(KeyCode::Down);
        assert_eq!(app.selected, Some(0));
        assert_eq!(app.form.title, "Dune");
        assert_eq!(app.form.author, "Herbert");

        app.handle_key(KeyCode::Down);
        assert_eq!(app.form.title, "Foundation");
    }

    #[test]
    fn edit_without_selection_reports_and_skips_the_store() {
        let mut app = app_with(vec![book(1, "Dune", "Herbert")]);

        app.handle_key(KeyCode::Char('e'));

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.store.mutations.get(), 0);
        assert!(matches!(
            app.status,
            Some(StatusMessage {
                kind: StatusKind::Error,
                ..
            })
        ));
    }

    #[test]
    fn update_flow_rewrites_fields_but_not_the_timestamp() {
        let mut app = app_with(vec![book(1, "Dune", "Herbert")]);
        let added = app.rows[0].date_added;

        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Char('e'));
        let Mode::EditingBook { id, mut form } =
            mem::replace(&mut app.mode, Mode::Normal)
        else {
            panic!("expected edit mode");
        };
        assert_eq!(form.title, "Dune");
        form.rating = "4".to_string();
        app.mode = Mode::EditingBook { id, form };

        app.handle_key(KeyCode::Enter);

        assert_eq!(app.rows[0].rating, "4");
        assert_eq!(app.rows[0].id, 1);
        assert_eq!(app.rows[0].date_added, added);
        assert!(app.form.title.is_empty());
    }

    #[test]
    fn delete_without_selection_is_a_selection_error() {
        let mut app = app_with(vec![book(1, "Dune", "Herbert")]);

        app.handle_key(KeyCode::Char('d'));

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.store.mutations.get(), 0);
    }

    #[test]
    fn declining_the_delete_confirmation_changes_nothing() {
        let mut app = app_with(vec![book(1, "Dune", "Herbert")]);
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Char('d'));
        assert!(matches!(app.mode, Mode::ConfirmDelete(_)));

        app.handle_key(KeyCode::Char('n'));

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.store.mutations.get(), 0);
        assert_eq!(app.rows.len(), 1);
    }

    #[test]
    fn confirmed_delete_removes_the_row_and_clears_the_form() {
        let mut app = app_with(vec![book(1, "Dune", "Herbert")]);
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Char('d'));

        app.handle_key(KeyCode::Char('y'));

        assert!(matches!(app.mode, Mode::Normal));
        assert!(app.rows.is_empty());
        assert!(app.form.title.is_empty());
        assert!(app.selected.is_none());
    }

    #[test]
    fn searching_requeries_per_keystroke_and_esc_restores_all() {
        let mut app = app_with(vec![
            book(1, "Dune", "Herbert"),
            book(2, "Dune Messiah", "Herbert"),
            book(3, "Foundation", "Asimov"),
        ]);

        app.handle_key(KeyCode::Char('/'));
        for ch in "Dune".chars() {
            app.handle_key(KeyCode::Char(ch));
        }
        assert_eq!(app.rows.len(), 2);
        assert_eq!(app.search, "Dune");

        app.handle_key(KeyCode::Esc);
        assert_eq!(app.rows.len(), 3);
        assert!(app.search.is_empty());
    }

    #[test]
    fn export_of_empty_rows_reports_without_prompting() {
        let mut app = app_with(vec![]);

        app.handle_key(KeyCode::Char('x'));

        assert!(matches!(app.mode, Mode::Normal));
        let status = app.status.as_ref().expect("status message");
        assert_eq!(status.text, "There are no results to export.");
    }

    #[test]
    fn export_writes_the_displayed_rows_only() {
        let mut app = app_with(vec![
            book(1, "Dune", "Herbert"),
            book(2, "Foundation", "Asimov"),
        ]);

        // Filter down to one row, then export what is on screen.
        app.handle_key(KeyCode::Char('/'));
        for ch in "Dune".chars() {
            app.handle_key(KeyCode::Char(ch));
        }
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.rows.len(), 1);

        let path = std::env::temp_dir().join(format!(
            "book-tracker-app-export-{}.txt",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);

        app.handle_key(KeyCode::Char('x'));
        assert!(matches!(app.mode, Mode::Exporting(_)));
        for ch in path.to_string_lossy().chars() {
            app.handle_key(KeyCode::Char(ch));
        }
        app.handle_key(KeyCode::Enter);

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 1);
        assert!(written.contains("Dune"));
        assert!(!written.contains("Foundation"));
        let _ = fs::remove_file(&path);
    }
}
