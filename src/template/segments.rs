use super::autocomplete::resolve_path;
use super::scanner::path_segments;
use crate::graph::ReferenceEntry;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("valid token regex"));

/// Escape sequence for a literal `{{` that must not open a token.
pub const ESCAPED_OPEN: &str = r"\{\{";

/// A piece of template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// A `{{path}}` placeholder, holding the path between the braces.
    Token(String),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Text(text) => write!(f, "{}", text),
            Segment::Token(path) => write!(f, "{{{{{}}}}}", path),
        }
    }
}

/// Splits template text into literal text and tokens. Escaped `\{\{` stays in the
/// surrounding text verbatim.
pub fn parse(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for caps in TOKEN.captures_iter(text) {
        let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Text(text[last..whole.start()].to_string()));
        }
        segments.push(Segment::Token(path.as_str().to_string()));
        last = whole.end();
    }
    if last < text.len() {
        segments.push(Segment::Text(text[last..].to_string()));
    }
    segments
}

pub fn serialize(segments: &[Segment]) -> String {
    segments.iter().map(ToString::to_string).collect()
}

/// Token paths in order of appearance.
pub fn tokens(text: &str) -> Vec<String> {
    parse(text)
        .into_iter()
        .filter_map(|s| match s {
            Segment::Token(path) => Some(path),
            Segment::Text(_) => None,
        })
        .collect()
}

/// Renders escaped braces as the literal `{{` they stand for.
pub fn unescape(text: &str) -> String {
    text.replace(ESCAPED_OPEN, "{{")
}

/// Paths of tokens that do not resolve against `options`, deduplicated in order.
pub fn validate_tokens(text: &str, options: &[ReferenceEntry]) -> Vec<String> {
    let mut unresolved: Vec<String> = Vec::new();
    for path in tokens(text) {
        let segments = path_segments(path.trim());
        if resolve_path(options, &segments).is_none() && !unresolved.contains(&path) {
            unresolved.push(path);
        }
    }
    unresolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_separates_text_and_tokens() {
        let segments = parse("Hi {{user.name}}, score {{result.score}}!");
        assert_eq!(
            segments,
            vec![
                Segment::Text("Hi ".to_string()),
                Segment::Token("user.name".to_string()),
                Segment::Text(", score ".to_string()),
                Segment::Token("result.score".to_string()),
                Segment::Text("!".to_string()),
            ]
        );
    }

    #[test]
    fn escaped_braces_remain_text() {
        let text = r"literal \{\{not.a.token}} here";
        assert_eq!(parse(text), vec![Segment::Text(text.to_string())]);
        assert_eq!(unescape(text), "literal {{not.a.token}} here");
    }

    #[test]
    fn unclosed_tokens_are_text() {
        let text = "a {{b c}} {{d";
        assert_eq!(serialize(&parse(text)), text);
        assert_eq!(tokens(text), vec!["b c".to_string()]);
    }
}
