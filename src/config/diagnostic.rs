//! Operator-facing rendering of document parse errors.

use std::fmt::Write as _;

/// 1-based line and column. Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Translate a byte offset into `text` to a line/column pair. Offsets past
    /// the end clamp to the end of the text.
    pub fn from_offset(text: &str, offset: usize) -> Self {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &text[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Self { line, column }
    }
}

/// Render `message` with the offending line of `text` and a caret under
/// `position`. The line before it is included for context.
pub fn describe(text: &str, position: Position, message: &str) -> String {
    let mut out = format!(
        "line {}, column {}: {message}",
        position.line, position.column
    );

    let lines: Vec<&str> = text.split('\n').collect();
    if position.line == 0 || position.line > lines.len() {
        return out;
    }

    let width = position.line.to_string().len();
    let _ = write!(out, "\n{:width$} |", "");
    if position.line >= 2 {
        let prev = lines[position.line - 2].trim_end_matches('\r');
        let _ = write!(out, "\n{:>width$} | {prev}", position.line - 1);
    }
    let current = lines[position.line - 1].trim_end_matches('\r');
    let _ = write!(out, "\n{:>width$} | {current}", position.line);
    let pad = position.column.saturating_sub(1);
    let _ = write!(out, "\n{:width$} | {:pad$}^", "", "");
    out
}
