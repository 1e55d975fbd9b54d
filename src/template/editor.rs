use super::autocomplete::{AutocompleteState, on_cursor_move};
use super::scanner::check_cursor;
use super::segments::{Segment, parse};
use crate::error::TemplateError;
use crate::graph::{ReferenceEntry, find_entry};
use crate::schema::ParamType;
use tracing::trace;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A template text buffer with a cursor, keeping the autocomplete state in step
/// with every edit.
///
/// Offsets are byte offsets into the text and always fall on char boundaries.
///
/// # Example
///
/// ```
/// use flowref::template::TemplateEditor;
///
/// let mut editor = TemplateEditor::new("Hello ", Vec::new());
/// editor.type_str("{{{").unwrap();
/// assert_eq!(editor.text(), "Hello {{}}");
/// assert_eq!(editor.cursor(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct TemplateEditor {
    text: String,
    cursor: usize,
    composing: bool,
    state: AutocompleteState,
    options: Vec<ReferenceEntry>,
}

impl TemplateEditor {
    /// Opens `text` for editing with the cursor at its end.
    pub fn new(text: impl Into<String>, options: Vec<ReferenceEntry>) -> Self {
        let text = text.into();
        let cursor = text.len();
        let state = on_cursor_move(&text, cursor, &options).unwrap_or_default();
        Self {
            text,
            cursor,
            composing: false,
            state,
            options,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn state(&self) -> &AutocompleteState {
        &self.state
    }

    pub fn options(&self) -> &[ReferenceEntry] {
        &self.options
    }

    pub fn is_composing(&self) -> bool {
        self.composing
    }

    /// The stored form of the template.
    pub fn serialize(&self) -> String {
        self.text.clone()
    }

    pub fn segments(&self) -> Vec<Segment> {
        parse(&self.text)
    }

    /// Replaces the candidate roots, e.g. after the node's inputs changed.
    pub fn set_options(&mut self, options: Vec<ReferenceEntry>) -> Result<(), TemplateError> {
        self.options = options;
        self.refresh()
    }

    pub fn set_cursor(&mut self, cursor: usize) -> Result<&AutocompleteState, TemplateError> {
        check_cursor(&self.text, cursor)?;
        self.cursor = cursor;
        self.refresh()?;
        Ok(&self.state)
    }

    /// Closes the popup without touching the text.
    pub fn dismiss(&mut self) {
        self.state = AutocompleteState::Idle;
    }

    /// Types one character. A third `{` after `{{` is swallowed and a closing `}}`
    /// is materialized after the cursor, so the cursor ends up inside `{{}}`.
    pub fn type_char(&mut self, ch: char) -> Result<(), TemplateError> {
        if !self.composing && ch == '{' && self.text[..self.cursor].ends_with(OPEN) {
            self.pair_braces();
        } else {
            self.text.insert(self.cursor, ch);
            self.cursor += ch.len_utf8();
        }
        if self.composing {
            return Ok(());
        }
        self.refresh()
    }

    pub fn type_str(&mut self, input: &str) -> Result<(), TemplateError> {
        input.chars().try_for_each(|ch| self.type_char(ch))
    }

    /// Deletes the character before the cursor. Inside an empty `{{}}` the whole
    /// pair goes.
    pub fn backspace(&mut self) -> Result<(), TemplateError> {
        if self.cursor == 0 {
            return Ok(());
        }
        let before = &self.text[..self.cursor];
        if before.ends_with(OPEN) && self.text[self.cursor..].starts_with(CLOSE) {
            let start = self.cursor - OPEN.len();
            self.text.replace_range(start..self.cursor + CLOSE.len(), "");
            self.cursor = start;
        } else if let Some((idx, _)) = before.char_indices().next_back() {
            self.text.replace_range(idx..self.cursor, "");
            self.cursor = idx;
        }
        self.refresh()
    }

    /// Starts IME composition: characters are inserted raw until it ends.
    pub fn composition_start(&mut self) {
        self.composing = true;
    }

    /// Ends IME composition and applies the brace pairing the composed text skipped.
    pub fn composition_end(&mut self) -> Result<(), TemplateError> {
        self.composing = false;
        if self.text[..self.cursor].ends_with("{{{") {
            let brace = self.cursor - 1;
            self.text.remove(brace);
            self.cursor = brace;
            self.pair_braces();
        }
        self.refresh()
    }

    /// Accepts the candidate with `entry_id`: the segment being typed is replaced by
    /// the candidate's label, keeping the already resolved prefix. Returns false
    /// when no token is open or the id is not a candidate.
    pub fn accept(&mut self, entry_id: &str) -> Result<bool, TemplateError> {
        let Some(ctx) = self.state.context() else {
            return Ok(false);
        };
        let Some(entry) = find_entry(&ctx.candidates, entry_id) else {
            return Ok(false);
        };
        let mut path = format!("{}{}", ctx.prefix, entry.label);
        if entry.param_type == Some(ParamType::ArrayObject) {
            path.push_str("[0]");
        }
        let is_leaf = entry.is_leaf();
        self.insert_at_cursor(&path, is_leaf)?;
        Ok(true)
    }

    /// Writes `path` into the token under the cursor, or inserts a new `{{path}}`
    /// when no token is open. Only the token's text between its braces is replaced.
    ///
    /// The cursor lands after the closing `}}` for a leaf and right before it
    /// otherwise.
    pub fn insert_at_cursor(&mut self, path: &str, is_leaf: bool) -> Result<(), TemplateError> {
        check_cursor(&self.text, self.cursor)?;
        let (range, closed) = match self.state.context() {
            Some(ctx) => (ctx.replace_range(), ctx.closed),
            None => {
                self.text.insert_str(self.cursor, OPEN);
                self.cursor += OPEN.len();
                (self.cursor..self.cursor, false)
            }
        };
        let start = range.start;
        self.text.replace_range(range, path);
        let close_at = start + path.len();
        if !closed {
            self.text.insert_str(close_at, CLOSE);
        }
        self.cursor = if is_leaf { close_at + CLOSE.len() } else { close_at };
        trace!(path, is_leaf, cursor = self.cursor, "inserted reference");
        self.refresh()
    }

    fn pair_braces(&mut self) {
        if !self.text[self.cursor..].starts_with(CLOSE) {
            self.text.insert_str(self.cursor, CLOSE);
        }
    }

    fn refresh(&mut self) -> Result<(), TemplateError> {
        self.state = on_cursor_move(&self.text, self.cursor, &self.options)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backspace_inside_empty_pair_removes_it() {
        let mut editor = TemplateEditor::new("a ", Vec::new());
        editor.type_str("{{{").unwrap();
        assert_eq!(editor.text(), "a {{}}");
        editor.backspace().unwrap();
        assert_eq!(editor.text(), "a ");
        assert_eq!(editor.cursor(), 2);
    }

    #[test]
    fn backspace_removes_whole_characters() {
        let mut editor = TemplateEditor::new("né", Vec::new());
        editor.backspace().unwrap();
        assert_eq!(editor.text(), "n");
    }

    #[test]
    fn composition_defers_pairing() {
        let mut editor = TemplateEditor::new("", Vec::new());
        editor.composition_start();
        editor.type_str("{{{").unwrap();
        assert_eq!(editor.text(), "{{{");
        editor.composition_end().unwrap();
        assert_eq!(editor.text(), "{{}}");
        assert_eq!(editor.cursor(), 2);
    }

    #[test]
    fn insert_without_open_token_adds_braces() {
        let mut editor = TemplateEditor::new("x", Vec::new());
        editor.insert_at_cursor("a.b", true).unwrap();
        assert_eq!(editor.text(), "x{{a.b}}");
        assert_eq!(editor.cursor(), editor.text().len());
    }
}
