use super::AutocompleteState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Part of the label the user already typed.
    Matched,
    /// Rest of the label that accepting the candidate would add.
    Completion,
    /// A label with no relation to the typed text.
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub text: String,
    pub kind: SpanKind,
}

impl HighlightSpan {
    fn new(text: &str, kind: SpanKind) -> Self {
        Self {
            text: text.to_string(),
            kind,
        }
    }
}

/// Splits a candidate label for display. Visual only; resolution never reads it.
pub fn highlight(label: &str, state: &AutocompleteState) -> Vec<HighlightSpan> {
    let typed = state
        .context()
        .map(|ctx| ctx.matching_keyword.as_str())
        .unwrap_or_default();
    if typed.is_empty() || !label.starts_with(typed) {
        return vec![HighlightSpan::new(label, SpanKind::Plain)];
    }
    let (matched, rest) = label.split_at(typed.len());
    let mut spans = vec![HighlightSpan::new(matched, SpanKind::Matched)];
    if !rest.is_empty() {
        spans.push(HighlightSpan::new(rest, SpanKind::Completion));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ReferenceEntry;
    use crate::template::on_cursor_move;

    fn leaf(label: &str) -> ReferenceEntry {
        ReferenceEntry {
            id: label.to_string(),
            label: label.to_string(),
            param_type: Some(crate::schema::ParamType::String),
            node_id: "n".to_string(),
            path: label.to_string(),
            children: Vec::new(),
        }
    }

    #[test]
    fn typed_prefix_is_split_from_completion() {
        let tree = vec![leaf("input1")];
        let state = on_cursor_move("{{inp", 5, &tree).unwrap();
        let spans = highlight("input1", &state);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "inp");
        assert_eq!(spans[0].kind, SpanKind::Matched);
        assert_eq!(spans[1].text, "ut1");
        assert_eq!(spans[1].kind, SpanKind::Completion);
    }

    #[test]
    fn idle_state_renders_plain_labels() {
        let spans = highlight("input1", &AutocompleteState::Idle);
        assert_eq!(spans, vec![HighlightSpan::new("input1", SpanKind::Plain)]);
    }
}
