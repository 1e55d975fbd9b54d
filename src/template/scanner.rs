use crate::error::TemplateError;
use regex::Regex;
use std::sync::LazyLock;

/// An unclosed `{{` ending right before the cursor.
static OPEN_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]*)$").expect("valid open token regex"));
/// The rest of a token up to its closing `}}`, right after the cursor.
static CLOSE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^{}]*)\}\}").expect("valid close token regex"));

/// The line of text holding the cursor, split at the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorLine<'a> {
    pub before: &'a str,
    pub after: &'a str,
    /// Byte offset of the line start in the full text.
    pub start: usize,
}

/// Raw match of the token around the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch {
    /// Token text between `{{` and the cursor.
    pub typed: String,
    /// Token text between the cursor and the closing `}}`.
    pub trailing: String,
    /// Whether a closing `}}` follows on the same line.
    pub closed: bool,
}

pub fn check_cursor(text: &str, cursor: usize) -> Result<(), TemplateError> {
    if cursor > text.len() {
        return Err(TemplateError::CursorOutOfBounds {
            offset: cursor,
            len: text.len(),
        });
    }
    if !text.is_char_boundary(cursor) {
        return Err(TemplateError::NotACharBoundary(cursor));
    }
    Ok(())
}

/// Extracts the current line. Templates are matched one line at a time, so an
/// unclosed `{{` never reaches into the next line.
pub fn current_line(text: &str, cursor: usize) -> Result<CursorLine<'_>, TemplateError> {
    check_cursor(text, cursor)?;
    let start = text[..cursor].rfind('\n').map_or(0, |i| i + 1);
    let end = text[cursor..]
        .find('\n')
        .map_or(text.len(), |i| cursor + i);
    Ok(CursorLine {
        before: &text[start..cursor],
        after: &text[cursor..end],
        start,
    })
}

/// Matches the token the cursor sits in, if any.
pub fn match_token(line: &CursorLine<'_>) -> Option<TokenMatch> {
    let open = OPEN_TOKEN.captures(line.before)?;
    let typed = open.get(1).map_or("", |m| m.as_str()).to_string();
    let (trailing, closed) = match CLOSE_TOKEN.captures(line.after) {
        Some(close) => (close.get(1).map_or("", |m| m.as_str()).to_string(), true),
        None => (String::new(), false),
    };
    Some(TokenMatch {
        typed,
        trailing,
        closed,
    })
}

/// Splits a typed path into segments with trailing `[n]` markers removed.
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('.')
        .map(crate::schema::strip_index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_extraction_stops_at_newlines() {
        let text = "first {{a\nsecond {{b}} end";
        let cursor = text.find("b}}").unwrap() + 1;
        let line = current_line(text, cursor).unwrap();
        assert_eq!(line.before, "second {{b");
        assert_eq!(line.after, "}} end");
        assert_eq!(line.start, 10);
    }

    #[test]
    fn unclosed_token_on_previous_line_is_ignored() {
        let text = "{{a\nplain";
        let line = current_line(text, text.len()).unwrap();
        assert!(match_token(&line).is_none());
    }

    #[test]
    fn match_reports_both_sides_of_the_cursor() {
        let text = "x {{res.sc}} y";
        let cursor = text.find(".sc").unwrap() + 1;
        let line = current_line(text, cursor).unwrap();
        let found = match_token(&line).unwrap();
        assert_eq!(found.typed, "res.");
        assert_eq!(found.trailing, "sc");
        assert!(found.closed);
    }

    #[test]
    fn escaped_braces_never_open_a_token() {
        let text = r"\{\{literal";
        let line = current_line(text, text.len()).unwrap();
        assert!(match_token(&line).is_none());
    }

    #[test]
    fn cursor_must_fall_on_char_boundary() {
        assert_eq!(
            current_line("héllo", 2),
            Err(TemplateError::NotACharBoundary(2))
        );
        assert!(current_line("abc", 9).is_err());
    }

    #[test]
    fn index_markers_are_stripped() {
        assert_eq!(path_segments("rows[0].score"), vec!["rows", "score"]);
        assert_eq!(path_segments("a."), vec!["a", ""]);
    }
}
