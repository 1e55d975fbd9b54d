//! Cursor-aware editing of `{{path.to.value}}` templates.
//!
//! Templates are plain text. A token opens with `{{` and closes with `}}` on the same
//! line; the path inside is resolved segment by segment against candidate roots,
//! normally the owning node's inputs as built by [`input_options`]. `[n]` index markers
//! are ignored during resolution. A literal `{{` is written as `\{\{`.
//!
//! [`on_cursor_move`] is the pure core; [`TemplateEditor`] wraps it with a text buffer
//! and the insertion rules.

mod autocomplete;
mod editor;
mod highlight;
mod scanner;
pub mod segments;

pub use autocomplete::{
    AutocompleteState, TokenContext, candidates_for, input_options, on_cursor_move, path_for,
    resolve_path,
};
pub use editor::TemplateEditor;
pub use highlight::{HighlightSpan, SpanKind, highlight};
pub use scanner::path_segments;
pub use segments::{Segment, parse, serialize, validate_tokens};
