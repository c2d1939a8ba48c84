//! The person at the registration desk.
//!
//! The registration flow talks to its operator only through the [`Operator`]
//! trait: key presses, the name form, frame previews and console messages.
//! [`TerminalOperator`] implements it on a raw-mode terminal.

use std::io::Write;

use async_trait::async_trait;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::{cursor, queue, terminal};
use futures::StreamExt;
use image::imageops::{self, FilterType};
use image::DynamicImage;
use tracing::trace;

use crate::error::{Error, Result};

/// A key press the flow reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKey {
    /// `q`, Esc or Ctrl-C.
    Cancel,
    /// `s`: keep the current photo.
    Save,
    /// Any other character.
    Other(char),
}

/// The registration form shown once a code was scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationForm {
    /// The scanned identifier, shown read-only.
    pub identifier: String,
}

impl RegistrationForm {
    /// Window title.
    pub const TITLE: &'static str = "Player Registration";
    /// Label of the editable name field.
    pub const NAME_PROMPT: &'static str = "Enter your name:";
    /// Label of the submit action.
    pub const SUBMIT: &'static str = "Submit";

    /// Create the form for a scanned identifier.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }

    /// The read-only identifier line.
    #[must_use]
    pub fn identifier_label(&self) -> String {
        format!("Player ID: {}", self.identifier)
    }
}

/// Input and output towards the operator.
#[async_trait]
pub trait Operator: Send {
    /// Wait for the next key press.
    ///
    /// Returns `Ok(None)` once input is closed. Must be cancel-safe: the flow
    /// races it against the camera and drops it when a frame arrives first.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input fails.
    async fn next_key(&mut self) -> Result<Option<OperatorKey>>;

    /// Show the form and wait for it to be submitted.
    ///
    /// Returns the entered name, or `None` if the form was closed without
    /// submitting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input fails.
    async fn fill_form(&mut self, form: &RegistrationForm) -> Result<Option<String>>;

    /// Show a camera frame in the preview named `window`.
    fn show_frame(&mut self, window: &str, frame: &DynamicImage);

    /// Print a message for the operator.
    fn notify(&mut self, message: &str);
}

/// Map a terminal key event to the keys the flow understands.
#[must_use]
pub fn map_key(key: &KeyEvent) -> Option<OperatorKey> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(OperatorKey::Cancel)
        }
        KeyCode::Esc | KeyCode::Char('q' | 'Q') => Some(OperatorKey::Cancel),
        KeyCode::Char('s' | 'S') => Some(OperatorKey::Save),
        KeyCode::Char(c) => Some(OperatorKey::Other(c)),
        _ => None,
    }
}

/// What a key press did to the name field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditStep {
    /// Keep editing; echo this text if any.
    Continue(Option<String>),
    /// The form was submitted with this name.
    Submit(String),
    /// The form was closed.
    Close,
}

/// Single-line editor for the name field.
#[derive(Debug, Default)]
pub struct LineEditor {
    text: String,
}

impl LineEditor {
    /// Apply a key press. Enter on a blank field is ignored.
    pub fn apply(&mut self, key: &KeyEvent) -> EditStep {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => EditStep::Close,
            KeyCode::Esc => EditStep::Close,
            KeyCode::Enter => {
                let name = self.text.trim();
                if name.is_empty() {
                    EditStep::Continue(None)
                } else {
                    EditStep::Submit(name.to_string())
                }
            }
            KeyCode::Backspace => match self.text.pop() {
                Some(_) => EditStep::Continue(Some("\u{8} \u{8}".to_string())),
                None => EditStep::Continue(None),
            },
            KeyCode::Char(c) => {
                self.text.push(c);
                EditStep::Continue(Some(c.to_string()))
            }
            _ => EditStep::Continue(None),
        }
    }
}

/// Widest preview drawn, in terminal columns.
pub const MAX_PREVIEW_COLUMNS: u16 = 64;

/// Preview size in cells for a `width` x `height` frame.
///
/// Each cell shows two pixels stacked vertically, so a cell covers a square
/// area of the frame. The preview is as wide as allowed unless that would
/// exceed `max_rows`.
#[must_use]
pub fn preview_size(width: u32, height: u32, max_columns: u16, max_rows: u16) -> (u16, u16) {
    if width == 0 || height == 0 || max_columns == 0 || max_rows == 0 {
        return (0, 0);
    }
    let (width, height) = (u64::from(width), u64::from(height));

    let rows = (u64::from(max_columns) * height).div_ceil(2 * width);
    if rows <= u64::from(max_rows) {
        let rows = u16::try_from(rows.max(1)).unwrap_or(max_rows);
        return (max_columns, rows);
    }

    let columns = u64::from(max_rows) * 2 * width / height;
    let columns = u16::try_from(columns.max(1)).unwrap_or(max_columns);
    (columns.min(max_columns), max_rows)
}

/// Gray levels of the upper and lower half of every preview cell, row by row.
#[must_use]
pub fn preview_cells(frame: &DynamicImage, columns: u16, rows: u16) -> Vec<Vec<[u8; 2]>> {
    if columns == 0 || rows == 0 {
        return Vec::new();
    }
    let small = imageops::resize(
        &frame.to_luma8(),
        u32::from(columns),
        2 * u32::from(rows),
        FilterType::Triangle,
    );

    (0..u32::from(rows))
        .map(|row| {
            (0..u32::from(columns))
                .map(|col| {
                    [
                        small.get_pixel(col, 2 * row)[0],
                        small.get_pixel(col, 2 * row + 1)[0],
                    ]
                })
                .collect()
        })
        .collect()
}

fn gray(level: u8) -> Color {
    Color::Rgb {
        r: level,
        g: level,
        b: level,
    }
}

/// Draw a frame with upper half blocks: the foreground colours the upper
/// pixel and the background the lower one. Every row ends with `\r\n`.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn render_preview(
    out: &mut impl Write,
    frame: &DynamicImage,
    columns: u16,
    rows: u16,
) -> std::io::Result<()> {
    for row in preview_cells(frame, columns, rows) {
        for [upper, lower] in row {
            queue!(
                out,
                SetForegroundColor(gray(upper)),
                SetBackgroundColor(gray(lower)),
                Print('▀')
            )?;
        }
        queue!(out, ResetColor, Print("\r\n"))?;
    }
    Ok(())
}

/// An operator on the controlling terminal.
///
/// The terminal is in raw mode while this value lives, so single key presses
/// arrive without Enter.
pub struct TerminalOperator {
    events: EventStream,
    current_window: Option<String>,
    preview_rows: u16,
}

impl std::fmt::Debug for TerminalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalOperator")
            .field("current_window", &self.current_window)
            .field("preview_rows", &self.preview_rows)
            .finish_non_exhaustive()
    }
}

impl TerminalOperator {
    /// Put the terminal in raw mode and start listening for key presses.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode cannot be enabled (e.g. no terminal).
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode().map_err(|e| Error::operator(e.to_string()))?;
        Ok(Self {
            events: EventStream::new(),
            current_window: None,
            preview_rows: 0,
        })
    }

    fn write(text: &str) {
        Self::write_bytes(text.as_bytes());
    }

    fn write_bytes(bytes: &[u8]) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(bytes);
        let _ = stdout.flush();
    }

    /// Forget the preview so the next frame starts below the cursor.
    fn end_preview(&mut self) {
        self.current_window = None;
        self.preview_rows = 0;
    }

    fn write_line(line: &str) {
        // Raw mode does not translate \n.
        Self::write(&format!("{line}\r\n"));
    }

    async fn next_key_event(&mut self) -> Result<Option<KeyEvent>> {
        while let Some(event) = self.events.next().await {
            match event.map_err(|e| Error::operator(e.to_string()))? {
                Event::Key(key) if key.kind != KeyEventKind::Release => return Ok(Some(key)),
                _ => {}
            }
        }
        Ok(None)
    }
}

impl Drop for TerminalOperator {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[async_trait]
impl Operator for TerminalOperator {
    async fn next_key(&mut self) -> Result<Option<OperatorKey>> {
        loop {
            let Some(key) = self.next_key_event().await? else {
                return Ok(None);
            };
            if let Some(key) = map_key(&key) {
                return Ok(Some(key));
            }
        }
    }

    async fn fill_form(&mut self, form: &RegistrationForm) -> Result<Option<String>> {
        self.end_preview();
        Self::write_line("");
        Self::write_line(RegistrationForm::TITLE);
        Self::write_line(&form.identifier_label());
        Self::write_line(&format!(
            "{} (Enter to {}, Esc to close)",
            RegistrationForm::NAME_PROMPT,
            RegistrationForm::SUBMIT.to_lowercase()
        ));
        Self::write("> ");

        let mut editor = LineEditor::default();
        loop {
            let Some(key) = self.next_key_event().await? else {
                return Ok(None);
            };
            match editor.apply(&key) {
                EditStep::Continue(Some(echo)) => Self::write(&echo),
                EditStep::Continue(None) => {}
                EditStep::Submit(name) => {
                    Self::write_line("");
                    return Ok(Some(name));
                }
                EditStep::Close => {
                    Self::write_line("");
                    return Ok(None);
                }
            }
        }
    }

    fn show_frame(&mut self, window: &str, frame: &DynamicImage) {
        trace!(window, width = frame.width(), height = frame.height(), "Frame");
        let (term_columns, term_rows) = terminal::size().unwrap_or((80, 24));
        let (columns, rows) = preview_size(
            frame.width(),
            frame.height(),
            term_columns.min(MAX_PREVIEW_COLUMNS),
            term_rows.saturating_sub(4),
        );

        let mut out = Vec::new();
        if self.current_window.as_deref() == Some(window) {
            // Draw over the previous frame.
            if self.preview_rows > 0 {
                let _ = queue!(out, cursor::MoveUp(self.preview_rows));
            }
        } else {
            let _ = queue!(out, Print(format!("[{window}]\r\n")));
            self.current_window = Some(window.to_string());
        }

        if render_preview(&mut out, frame, columns, rows).is_ok() {
            self.preview_rows = rows;
            Self::write_bytes(&out);
        }
    }

    fn notify(&mut self, message: &str) {
        self.end_preview();
        Self::write_line(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_map_key() {
        assert_eq!(map_key(&press(KeyCode::Char('q'))), Some(OperatorKey::Cancel));
        assert_eq!(map_key(&press(KeyCode::Esc)), Some(OperatorKey::Cancel));
        assert_eq!(map_key(&press(KeyCode::Char('s'))), Some(OperatorKey::Save));
        assert_eq!(map_key(&press(KeyCode::Char('S'))), Some(OperatorKey::Save));
        assert_eq!(
            map_key(&press(KeyCode::Char('x'))),
            Some(OperatorKey::Other('x'))
        );
        assert_eq!(map_key(&press(KeyCode::Up)), None);
    }

    #[test]
    fn test_map_ctrl_c() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(&key), Some(OperatorKey::Cancel));
        assert_eq!(
            map_key(&press(KeyCode::Char('c'))),
            Some(OperatorKey::Other('c'))
        );
    }

    #[test]
    fn test_form_labels() {
        let form = RegistrationForm::new("abc123");
        assert_eq!(form.identifier_label(), "Player ID: abc123");
        assert_eq!(RegistrationForm::NAME_PROMPT, "Enter your name:");
    }

    #[test]
    fn test_line_editor_submit() {
        let mut editor = LineEditor::default();
        for c in " Alice".chars() {
            assert!(matches!(
                editor.apply(&press(KeyCode::Char(c))),
                EditStep::Continue(Some(_))
            ));
        }
        assert_eq!(
            editor.apply(&press(KeyCode::Enter)),
            EditStep::Submit("Alice".to_string())
        );
    }

    #[test]
    fn test_line_editor_backspace() {
        let mut editor = LineEditor::default();
        assert_eq!(
            editor.apply(&press(KeyCode::Backspace)),
            EditStep::Continue(None)
        );
        editor.apply(&press(KeyCode::Char('B')));
        editor.apply(&press(KeyCode::Char('x')));
        assert!(matches!(
            editor.apply(&press(KeyCode::Backspace)),
            EditStep::Continue(Some(_))
        ));
        assert_eq!(
            editor.apply(&press(KeyCode::Enter)),
            EditStep::Submit("B".to_string())
        );
    }

    #[test]
    fn test_line_editor_blank_enter_is_ignored() {
        let mut editor = LineEditor::default();
        editor.apply(&press(KeyCode::Char(' ')));
        assert_eq!(
            editor.apply(&press(KeyCode::Enter)),
            EditStep::Continue(None)
        );
    }

    fn split_frame(width: u32, height: u32) -> DynamicImage {
        // Black upper half, white lower half.
        DynamicImage::ImageLuma8(image::GrayImage::from_fn(width, height, |_, y| {
            image::Luma([if y < height / 2 { 0 } else { 255 }])
        }))
    }

    #[test]
    fn test_preview_size_keeps_aspect() {
        assert_eq!(preview_size(640, 480, 64, 40), (64, 24));
        // Height bound: 10 rows are 20 pixel rows, so 26 columns.
        assert_eq!(preview_size(640, 480, 64, 10), (26, 10));
        assert_eq!(preview_size(1, 1000, 64, 10), (1, 10));
        assert_eq!(preview_size(0, 480, 64, 10), (0, 0));
        assert_eq!(preview_size(640, 480, 64, 0), (0, 0));
    }

    #[test]
    fn test_preview_cells() {
        let cells = preview_cells(&split_frame(40, 40), 4, 1);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].len(), 4);
        for [upper, lower] in &cells[0] {
            assert!(*upper < 128, "upper {upper}");
            assert!(*lower > 128, "lower {lower}");
        }

        let white = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(8, 8, image::Luma([255])));
        assert!(preview_cells(&white, 4, 2)
            .iter()
            .flatten()
            .all(|cell| *cell == [255, 255]));
    }

    #[test]
    fn test_render_preview_draws_every_cell() {
        let mut out = Vec::new();
        render_preview(&mut out, &split_frame(320, 240), 32, 12).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches('▀').count(), 32 * 12);
        assert_eq!(text.matches("\r\n").count(), 12);
    }

    #[test]
    fn test_render_preview_empty() {
        let mut out = Vec::new();
        render_preview(&mut out, &split_frame(320, 240), 0, 0).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_line_editor_close() {
        let mut editor = LineEditor::default();
        editor.apply(&press(KeyCode::Char('A')));
        assert_eq!(editor.apply(&press(KeyCode::Esc)), EditStep::Close);

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(LineEditor::default().apply(&ctrl_c), EditStep::Close);
    }
}
