//! Workflow store tests
//!
//! Undo, dirty tracking, hooks, reference binding and iteration mirroring.
//!
mod common;
use common::*;
use flowref::prelude::*;
use flowref::schema::naming::EMPTY_NAME_MSG;
use flowref::validation::REFERENCE_MISSING_MSG;

#[cfg(test)]
mod store_tests {
    use super::*;

    fn content_error<'s>(store: &'s WorkflowStore, node_id: &str, param_id: &str) -> Option<&'s str> {
        store
            .node(node_id)
            .and_then(|n| n.inputs.get(param_id))
            .and_then(|p| p.errors.content.as_deref())
    }

    #[test]
    fn test_loaded_workflow_is_publishable() {
        let mut store = linear_store();
        assert!(store.validate_all());
        assert!(store.is_publishable());
        assert!(store.take_dirty().is_empty());
        assert!(store.history().is_empty());
    }

    #[test]
    fn test_undo_restores_the_previous_graph() {
        let mut store = linear_store();
        store.remove_param("a", "tags").unwrap();
        assert_eq!(store.history().peek_label(), Some("remove param"));
        assert_eq!(store.take_dirty(), vec!["a".to_string()]);

        assert!(store.undo());
        assert!(store.node("a").unwrap().outputs.get("tags").is_some());
        assert_eq!(store.take_dirty(), vec!["a".to_string()]);
        assert!(!store.undo());
    }

    #[test]
    fn test_history_is_bounded() {
        let config = EngineConfig {
            max_history: 1,
            ..EngineConfig::default()
        };
        let mut store = WorkflowStore::builder(load_graph(LINEAR_WORKFLOW_JSON))
            .with_config(config)
            .build();
        store.add_param("c", Side::Outputs).unwrap();
        store.add_param("c", Side::Outputs).unwrap();
        assert_eq!(store.history().len(), 1);

        assert!(store.undo());
        assert_eq!(store.node("c").unwrap().outputs.roots().len(), 1);
        assert!(!store.undo());
    }

    #[test]
    fn test_take_dirty_drains_in_sorted_order() {
        let mut store = linear_store();
        store.set_template("b", "plain").unwrap();
        store.add_param("a", Side::Inputs).unwrap();
        assert!(store.is_dirty("a"));
        assert_eq!(store.take_dirty(), vec!["a".to_string(), "b".to_string()]);
        assert!(!store.is_dirty("a"));
        assert!(store.take_dirty().is_empty());
    }

    #[test]
    fn test_hooks_see_dirty_and_validated_nodes() {
        let (mut store, log) = recorded_store(LINEAR_WORKFLOW_JSON);
        store
            .set_param("a", "tags", |p| p.name = String::new())
            .unwrap();

        let log = log.borrow();
        assert!(log.dirty.contains(&"a".to_string()));
        assert_eq!(log.validated.last(), Some(&("a".to_string(), false)));
    }

    #[test]
    fn test_bind_ref_takes_the_output_type() {
        let mut store = linear_store();
        store.bind_ref("b", "input2", "a", "rows[0].score").unwrap();

        let param = store.node("b").unwrap().inputs.get("input2").unwrap();
        assert_eq!(param.param_type(), ParamType::Number);
        let target = param.value.as_ref().and_then(|v| v.as_ref_target()).unwrap();
        assert_eq!(target.node_id, "a");
        assert_eq!(target.name, "rows[0].score");
        assert_eq!(target.id.as_deref(), Some("row-score"));
        assert!(param.errors.content.is_none());
    }

    #[test]
    fn test_bind_ref_rejects_invisible_outputs() {
        let mut store = linear_store();
        let err = store.bind_ref("b", "input2", "c", "anything").unwrap_err();
        assert!(matches!(err, StoreError::ReferenceNotVisible { .. }));
        let err = store.bind_ref("a", "result", "start", "query").unwrap_err();
        assert!(matches!(err, StoreError::ParamNotFound { .. }));
    }

    #[test]
    fn test_disconnect_keeps_references_and_flags_them() {
        let (mut store, log) = recorded_store(LINEAR_WORKFLOW_JSON);
        let removed = store.disconnect("a", "b");
        assert_eq!(removed.len(), 1);
        assert_eq!(log.borrow().removed_edges.len(), 1);
        assert_eq!(content_error(&store, "b", "input1"), Some(REFERENCE_MISSING_MSG));

        store.connect(Edge::new("a", "b")).unwrap();
        assert_eq!(content_error(&store, "b", "input1"), None);
        assert!(store.disconnect("a", "c").is_empty());
    }

    #[test]
    fn test_removing_a_node_flags_downstream_references() {
        let mut store = linear_store();
        let removed = store.remove_node("a").unwrap();
        assert_eq!(removed.label, "A");
        assert!(store.node("a").is_none());
        assert!(store.graph().edges().iter().all(|e| e.source != "a" && e.target != "a"));
        assert_eq!(content_error(&store, "b", "input1"), Some(REFERENCE_MISSING_MSG));

        assert!(matches!(
            store.remove_node("a"),
            Err(StoreError::NodeNotFound(_))
        ));
        assert!(store.undo());
        assert_eq!(content_error(&store, "b", "input1"), None);
    }

    #[test]
    fn test_iteration_start_mirrors_the_inputs() {
        let mut store = iteration_store();
        let added = store.add_param("loop", Side::Inputs).unwrap();

        let start = &store.node("loop-start").unwrap().outputs;
        assert_eq!(start.roots(), &["item".to_string(), added.clone()]);
        let item = start.get("item").unwrap();
        assert_eq!(item.param_type(), ParamType::Object);
        let fields: Vec<&str> = start.children_of("item").map(|p| p.id.as_str()).collect();
        assert_eq!(fields, vec!["item::title"]);
        assert_eq!(start.get(&added).unwrap().param_type(), ParamType::String);
        assert!(store.is_dirty("loop-start"));

        store.remove_param("loop", "item").unwrap();
        let start = &store.node("loop-start").unwrap().outputs;
        assert_eq!(start.roots(), &[added]);
    }

    #[test]
    fn test_iteration_end_mirrors_the_outputs() {
        let mut store = iteration_store();
        let end_names = |store: &WorkflowStore| -> Vec<String> {
            store
                .node("loop-end")
                .unwrap()
                .inputs
                .root_params()
                .map(|p| p.name.clone())
                .collect()
        };

        let first = store.add_param("loop", Side::Outputs).unwrap();
        let second = store.add_param("loop", Side::Outputs).unwrap();
        let outputs = &store.node("loop").unwrap().outputs;
        assert_eq!(outputs.get(&first).unwrap().param_type(), ParamType::ArrayString);
        assert_eq!(end_names(&store), vec!["", ""]);
        assert!(store.is_dirty("loop-end"));

        store
            .set_param("loop", &second, |p| p.name = "results".to_string())
            .unwrap();
        assert_eq!(end_names(&store), vec!["", "results"]);

        store.remove_param("loop", &first).unwrap();
        assert_eq!(end_names(&store), vec!["results"]);

        assert!(store.undo());
        assert_eq!(end_names(&store), vec!["", "results"]);

        store.add_param("a", Side::Outputs).unwrap();
        assert_eq!(end_names(&store), vec!["", "results"]);
    }

    #[test]
    fn test_iteration_inputs_only_bind_arrays() {
        let mut store = iteration_store();
        let err = store.bind_ref("loop", "item", "a", "count").unwrap_err();
        assert!(matches!(err, StoreError::ReferenceNotVisible { .. }));

        store.bind_ref("loop", "item", "a", "names").unwrap();
        let start = &store.node("loop-start").unwrap().outputs;
        assert_eq!(start.get("item").unwrap().param_type(), ParamType::String);
    }

    #[test]
    fn test_branch_editor_requires_cases() {
        let mut store = linear_store();
        assert!(matches!(
            store.branch("a"),
            Err(StoreError::NotABranchNode(_))
        ));
        assert!(matches!(
            store.branch("missing"),
            Err(StoreError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_export_carries_validation_messages() {
        let mut store = linear_store();
        store
            .set_param("a", "tags", |p| p.name = String::new())
            .unwrap();

        let exported = UiWorkflow::from_graph(store.graph());
        let a = exported.nodes.iter().find(|n| n.id == "a").unwrap();
        let tags = a.data.outputs.iter().find(|p| p.id == "tags").unwrap();
        assert_eq!(tags.name_err_msg.as_deref(), Some(EMPTY_NAME_MSG));

        let json = exported.to_json().unwrap();
        assert!(json.contains("\"nameErrMsg\""));
        let reloaded = UiWorkflow::from_json(&json).unwrap().into_workflow().unwrap();
        assert_eq!(reloaded.nodes().len(), 4);
        assert_eq!(reloaded.edges().len(), 2);
    }
}
