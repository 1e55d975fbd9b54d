//! Schema tree editing tests
//!
//! Type cascades, container rules, naming and the effect of output edits on
//! downstream references.
//!
mod common;
use common::*;
use flowref::graph::RetryConfig;
use flowref::prelude::*;
use flowref::schema::naming::{
    DUPLICATE_NAME_MSG, EMPTY_NAME_MSG, INVALID_NESTED_NAME_MSG, INVALID_ROOT_NAME_MSG,
};
use serde_json::json;

#[cfg(test)]
mod schema_tests {
    use super::*;

    fn output<'s>(store: &'s WorkflowStore, node_id: &str, param_id: &str) -> &'s Param {
        store
            .node(node_id)
            .and_then(|n| n.outputs.get(param_id))
            .expect("output param")
    }

    #[test]
    fn test_scalar_type_drops_children_and_resets_default() {
        let mut store = linear_store();
        assert!(store.change_type("a", "result", ParamType::String).unwrap());

        let outputs = &store.node("a").unwrap().outputs;
        assert!(outputs.get("score").is_none());
        let result = outputs.get("result").unwrap();
        assert!(result.is_leaf());
        assert_eq!(result.default, json!(""));
    }

    #[test]
    fn test_same_type_is_a_no_op() {
        let mut store = linear_store();
        let history = store.history().len();
        assert!(!store.change_type("a", "result", ParamType::Object).unwrap());
        assert_eq!(store.history().len(), history);
        assert!(store.node("a").unwrap().outputs.get("score").is_some());
    }

    #[test]
    fn test_object_type_seeds_one_unnamed_child() {
        let mut store = linear_store();
        store.change_type("a", "tags", ParamType::Object).unwrap();

        let outputs = &store.node("a").unwrap().outputs;
        let children: Vec<&Param> = outputs.children_of("tags").collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "");
        assert_eq!(children[0].param_type(), ParamType::String);
        assert_eq!(children[0].errors.name.as_deref(), Some(EMPTY_NAME_MSG));
        assert!(!store.is_publishable());
    }

    #[test]
    fn test_array_object_element_is_locked() {
        let mut store = linear_store();
        store.change_type("a", "tags", ParamType::ArrayObject).unwrap();

        let element_id = output(&store, "a", "tags")
            .children()
            .first()
            .cloned()
            .expect("element");
        assert!(output(&store, "a", &element_id).is_array_element());

        let err = store.remove_param("a", &element_id).unwrap_err();
        assert!(matches!(err, StoreError::ArrayElementLocked { .. }));

        // Removing the whole array takes the element with it.
        store.remove_param("a", "tags").unwrap();
        assert!(store.node("a").unwrap().outputs.get(&element_id).is_none());
    }

    #[test]
    fn test_children_only_go_into_containers() {
        let mut store = linear_store();
        let err = store.add_child("a", "tags").unwrap_err();
        assert!(matches!(err, StoreError::NotAContainer { .. }));

        let child = store.add_child("a", "rows").unwrap();
        let outputs = &store.node("a").unwrap().outputs;
        let parent = outputs.get(&child).and_then(|p| p.parent()).unwrap();
        assert!(outputs.get(parent).unwrap().is_array_element());
        assert_eq!(outputs.visible_children("rows").len(), 3);
    }

    #[test]
    fn test_removing_an_output_clears_downstream_references() {
        let mut store = linear_store();
        store.remove_param("a", "result").unwrap();

        let b = store.node("b").unwrap();
        let input1 = b.inputs.get("input1").unwrap();
        let target = input1.value.as_ref().and_then(|v| v.as_ref_target()).unwrap();
        assert!(target.is_empty());
        assert_eq!(input1.errors.content.as_deref(), Some(EMPTY_NAME_MSG));
        assert_eq!(
            b.node_param.template_err_msg.as_deref(),
            Some("unresolved variables: {{input1.score}}")
        );
    }

    #[test]
    fn test_renaming_an_output_relinks_downstream_references() {
        let mut store = linear_store();
        store
            .set_param("a", "result", |p| p.name = "outcome".to_string())
            .unwrap();

        let input1 = store.node("b").unwrap().inputs.get("input1").unwrap();
        let target = input1.value.as_ref().and_then(|v| v.as_ref_target()).unwrap();
        assert_eq!(target.name, "outcome");
        assert!(input1.errors.content.is_none());
    }

    #[test]
    fn test_set_param_cannot_change_the_id() {
        let mut store = linear_store();
        store
            .set_param("a", "tags", |p| p.id = "other".to_string())
            .unwrap();
        assert!(store.node("a").unwrap().outputs.get("tags").is_some());
    }

    #[test]
    fn test_names_are_validated_per_level() {
        let mut store = linear_store();
        store
            .set_param("a", "tags", |p| p.name = "result".to_string())
            .unwrap();
        assert_eq!(
            output(&store, "a", "tags").errors.name.as_deref(),
            Some(DUPLICATE_NAME_MSG)
        );
        assert_eq!(
            output(&store, "a", "result").errors.name.as_deref(),
            Some(DUPLICATE_NAME_MSG)
        );

        store
            .set_param("a", "tags", |p| p.name = "my tags".to_string())
            .unwrap();
        assert_eq!(
            output(&store, "a", "tags").errors.name.as_deref(),
            Some(INVALID_ROOT_NAME_MSG)
        );
        assert!(output(&store, "a", "result").errors.name.is_none());

        // Hyphens are allowed at the top level only.
        store
            .set_param("a", "tags", |p| p.name = "my-tags".to_string())
            .unwrap();
        assert!(output(&store, "a", "tags").errors.name.is_none());
        store
            .set_param("a", "score", |p| p.name = "my-score".to_string())
            .unwrap();
        assert_eq!(
            output(&store, "a", "score").errors.name.as_deref(),
            Some(INVALID_NESTED_NAME_MSG)
        );
    }

    #[test]
    fn test_custom_output_tracks_the_outputs_tree() {
        let mut store = linear_store();
        store
            .set_retry_config(
                "a",
                Some(RetryConfig {
                    should_retry: true,
                    error_strategy: 1,
                    custom_output: r#"{"result": {"score": 7}, "tags": ["x"]}"#.to_string(),
                    custom_output_err_msg: None,
                }),
            )
            .unwrap();
        store.refresh_custom_output("a").unwrap();

        let custom = |store: &WorkflowStore| -> serde_json::Value {
            let retry = store.node("a").unwrap().retry_config.as_ref().unwrap();
            serde_json::from_str(&retry.custom_output).unwrap()
        };
        assert_eq!(
            custom(&store),
            json!({
                "result": {"score": 7},
                "rows": [{"title": "", "score": 0}],
                "tags": ["x"]
            })
        );

        store.remove_param("a", "rows").unwrap();
        assert_eq!(
            custom(&store),
            json!({"result": {"score": 7}, "tags": ["x"]})
        );

        store
            .set_param("a", "tags", |p| p.name = "labels".to_string())
            .unwrap();
        assert_eq!(
            custom(&store),
            json!({"result": {"score": 7}, "labels": []})
        );
    }

    #[test]
    fn test_empty_custom_output_is_flagged() {
        let mut store = linear_store();
        store
            .set_retry_config(
                "a",
                Some(RetryConfig {
                    should_retry: true,
                    error_strategy: 1,
                    ..RetryConfig::default()
                }),
            )
            .unwrap();
        let retry = store.node("a").unwrap().retry_config.as_ref().unwrap();
        assert_eq!(retry.custom_output_err_msg.as_deref(), Some(EMPTY_NAME_MSG));
        assert!(!store.is_publishable());
    }

    #[test]
    fn test_reference_paths_round_through_the_element() {
        let store = linear_store();
        let outputs = &store.node("a").unwrap().outputs;
        assert_eq!(outputs.reference_path("row-score").as_deref(), Some("rows[0].score"));
        assert_eq!(
            outputs.path_of("row-score"),
            Some(vec!["rows".to_string(), "score".to_string()])
        );
        assert_eq!(
            outputs.find_by_reference_path("rows[0].score").map(|p| p.id.as_str()),
            Some("row-score")
        );
    }
}
