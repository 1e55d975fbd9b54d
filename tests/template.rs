//! Template editing tests
//!
//! Autocomplete states, candidate acceptance and token validation.
//!
mod common;
use common::*;
use flowref::prelude::*;
use flowref::template::{
    Segment, SpanKind, highlight, parse, path_for, serialize, validate_tokens,
};

#[cfg(test)]
mod template_tests {
    use super::*;

    /// `input1 {x}` and `input2`.
    fn two_inputs() -> Vec<ReferenceEntry> {
        vec![
            entry("input1", ParamType::Object, vec![entry("x", ParamType::String, vec![])]),
            entry("input2", ParamType::String, vec![]),
        ]
    }

    /// `result {score}` and `rows[] {title}`.
    fn nested_outputs() -> Vec<ReferenceEntry> {
        vec![
            entry("result", ParamType::Object, vec![entry("score", ParamType::Number, vec![])]),
            entry("rows", ParamType::ArrayObject, vec![entry("title", ParamType::String, vec![])]),
        ]
    }

    #[test]
    fn test_partial_name_matches_roots() {
        let tree = two_inputs();
        let state = on_cursor_move("{{inp", 5, &tree).unwrap();
        assert_eq!(state.candidate_labels(), vec!["input1", "input2"]);

        let ctx = state.context().unwrap();
        assert_eq!(ctx.typed, "inp");
        assert_eq!(ctx.matching_keyword, "inp");
        assert_eq!(ctx.prefix, "");
        assert!(!ctx.closed);
    }

    #[test]
    fn test_dangling_dot_lists_children() {
        let tree = two_inputs();
        let text = "{{input1.";
        let state = on_cursor_move(text, text.len(), &tree).unwrap();
        assert_eq!(state.candidate_labels(), vec!["x"]);
        assert_eq!(state.context().unwrap().prefix, "input1.");
    }

    #[test]
    fn test_empty_token_lists_every_root() {
        let tree = two_inputs();
        let state = on_cursor_move("Hi {{}}", 5, &tree).unwrap();
        assert_eq!(state.candidate_labels(), vec!["input1", "input2"]);
        assert!(state.context().unwrap().closed);
    }

    #[test]
    fn test_unknown_paths_and_plain_text_are_idle() {
        let tree = two_inputs();
        assert!(on_cursor_move("{{zzz", 5, &tree).unwrap().is_idle());
        assert!(on_cursor_move("{{input1.x.deeper", 17, &tree).unwrap().is_idle());
        assert!(on_cursor_move("no token", 8, &tree).unwrap().is_idle());
        assert!(on_cursor_move("{{input1}} after", 16, &tree).unwrap().is_idle());
    }

    #[test]
    fn test_open_token_on_a_previous_line_is_ignored() {
        let tree = two_inputs();
        let text = "{{inp\nnext";
        assert!(on_cursor_move(text, text.len(), &tree).unwrap().is_idle());
    }

    #[test]
    fn test_cursor_outside_the_text_is_an_error() {
        let err = on_cursor_move("abc", 10, &two_inputs()).unwrap_err();
        assert_eq!(err, TemplateError::CursorOutOfBounds { offset: 10, len: 3 });
    }

    #[test]
    fn test_keyword_covers_the_whole_segment_under_the_cursor() {
        let tree = two_inputs();
        // Cursor between "in" and "p".
        let state = on_cursor_move("x {{inp}} y", 6, &tree).unwrap();
        let ctx = state.context().unwrap();
        assert_eq!(ctx.keyword, "inp");
        assert_eq!(ctx.matching_keyword, "in");
        assert_eq!(ctx.replace_range(), 4..7);
    }

    #[test]
    fn test_accept_replaces_only_the_token_text() {
        let mut editor = TemplateEditor::new("x {{inp}} y", two_inputs());
        editor.set_cursor(6).unwrap();
        assert!(editor.accept("input2").unwrap());
        assert_eq!(editor.text(), "x {{input2}} y");
        assert_eq!(editor.cursor(), 12);
        assert!(editor.state().is_idle());
    }

    #[test]
    fn test_accepting_a_container_keeps_the_cursor_inside() {
        let mut editor = TemplateEditor::new("", nested_outputs());
        editor.type_str("{{{").unwrap();
        assert!(editor.accept("result").unwrap());
        assert_eq!(editor.text(), "{{result}}");
        assert_eq!(editor.cursor(), 8);

        editor.type_char('.').unwrap();
        assert_eq!(editor.state().candidate_labels(), vec!["score"]);
        assert!(editor.accept("score").unwrap());
        assert_eq!(editor.text(), "{{result.score}}");
        assert_eq!(editor.cursor(), editor.text().len());
    }

    #[test]
    fn test_array_of_objects_inserts_an_index() {
        let mut editor = TemplateEditor::new("", nested_outputs());
        editor.type_str("{{{ro").unwrap();
        assert!(editor.accept("rows").unwrap());
        assert_eq!(editor.text(), "{{rows[0]}}");

        editor.type_char('.').unwrap();
        assert_eq!(editor.state().candidate_labels(), vec!["title"]);
        editor.accept("title").unwrap();
        assert_eq!(editor.text(), "{{rows[0].title}}");
    }

    #[test]
    fn test_accept_without_a_candidate_does_nothing() {
        let mut editor = TemplateEditor::new("plain", two_inputs());
        assert!(!editor.accept("input1").unwrap());
        editor.type_str(" {{{").unwrap();
        assert!(!editor.accept("unknown").unwrap());
        assert_eq!(editor.text(), "plain {{}}");
    }

    #[test]
    fn test_unclosed_token_is_closed_on_accept() {
        let mut editor = TemplateEditor::new("Hi {{inp", two_inputs());
        assert!(editor.accept("input2").unwrap());
        assert_eq!(editor.text(), "Hi {{input2}}");
    }

    #[test]
    fn test_existing_closing_braces_are_not_doubled() {
        let mut editor = TemplateEditor::new("{{}}", two_inputs());
        editor.set_cursor(2).unwrap();
        editor.type_char('{').unwrap();
        assert_eq!(editor.text(), "{{}}");
        assert_eq!(editor.cursor(), 2);
        editor.backspace().unwrap();
        assert_eq!(editor.text(), "");
    }

    #[test]
    fn test_template_completion_against_upstream_schema() {
        let mut store = linear_store();
        let references = store.references("b");
        let options = input_options(&store.node("b").unwrap().inputs, &references);
        assert_eq!(
            options.iter().map(|o| o.label.as_str()).collect::<Vec<_>>(),
            vec!["input1", "input2"]
        );

        let mut editor = TemplateEditor::new("Score: ", options);
        editor.type_str("{{{input1.").unwrap();
        assert_eq!(editor.state().candidate_labels(), vec!["score"]);
        assert!(editor.accept("score").unwrap());
        assert_eq!(editor.serialize(), "Score: {{input1.score}}");

        store.set_template("b", editor.serialize()).unwrap();
        assert!(store.node("b").unwrap().node_param.template_err_msg.is_none());
    }

    #[test]
    fn test_path_for_adds_index_markers() {
        let tree = nested_outputs();
        assert_eq!(path_for(&tree, "title").as_deref(), Some("rows[0].title"));
        assert_eq!(path_for(&tree, "score").as_deref(), Some("result.score"));
        assert_eq!(path_for(&tree, "missing"), None);
    }

    #[test]
    fn test_unresolved_tokens_are_reported_once() {
        let tree = two_inputs();
        let text = "{{input1.x}} {{nope}} {{input2}} {{nope}} {{input1.y}}";
        assert_eq!(
            validate_tokens(text, &tree),
            vec!["nope".to_string(), "input1.y".to_string()]
        );
        assert!(validate_tokens(r"\{\{nope}}", &tree).is_empty());
    }

    #[test]
    fn test_segments_keep_the_stored_text() {
        let text = "Dear {{user.name}},\nyour {{rows[0].title}}";
        let segments = parse(text);
        assert_eq!(segments[1], Segment::Token("user.name".to_string()));
        assert_eq!(serialize(&segments), text);
    }

    #[test]
    fn test_highlight_follows_the_typed_segment() {
        let tree = two_inputs();
        let state = on_cursor_move("{{input1.", 9, &tree).unwrap();
        let spans = highlight("x", &state);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, SpanKind::Plain);

        let state = on_cursor_move("{{input", 7, &tree).unwrap();
        let spans = highlight("input2", &state);
        assert_eq!(spans[0].text, "input");
        assert_eq!(spans[1].text, "2");
    }
}
