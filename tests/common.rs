//! Common test utilities: workflow documents and store builders.
use flowref::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

/// `start -> a -> b`, plus an unconnected node `c`.
///
/// `a` outputs `result {score}`, `rows[] {title, score}` and `tags[]`.
/// `b` references `a.result` through `input1` and uses it in its template.
#[allow(dead_code)]
pub const LINEAR_WORKFLOW_JSON: &str = r#"{
    "nodes": [
        {"id": "start", "type": "node-start", "data": {"label": "Start", "outputs": [
            {"id": "query", "name": "query", "schema": {"type": "string", "default": ""}}
        ]}},
        {"id": "a", "type": "code", "data": {"label": "A",
            "inputs": [
                {"id": "a-q", "name": "q", "schema": {"type": "string",
                    "value": {"type": "ref", "content": {"nodeId": "start", "name": "query"}}}}
            ],
            "outputs": [
                {"id": "result", "name": "result", "schema": {"type": "object", "properties": [
                    {"id": "score", "name": "score", "type": "number"}
                ]}},
                {"id": "rows", "name": "rows", "schema": {"type": "array-object", "properties": [
                    {"id": "title", "name": "title", "type": "string"},
                    {"id": "row-score", "name": "score", "type": "number"}
                ]}},
                {"id": "tags", "name": "tags", "schema": {"type": "array-string"}}
            ]
        }},
        {"id": "b", "type": "message", "data": {"label": "B",
            "inputs": [
                {"id": "input1", "name": "input1", "schema": {"type": "object",
                    "value": {"type": "ref", "content": {"nodeId": "a", "name": "result", "id": "result"}}}},
                {"id": "input2", "name": "input2", "schema": {"type": "string",
                    "value": {"type": "literal", "content": "hello"}}}
            ],
            "nodeParam": {"template": "Score is {{input1.score}}"}
        }},
        {"id": "c", "type": "code", "data": {"label": "C"}}
    ],
    "edges": [
        {"source": "start", "target": "a"},
        {"source": "a", "target": "b"}
    ]
}"#;

/// `a -> loop`, where `loop` is an iteration node holding
/// `loop-start -> inner -> loop-end`.
/// The loop's `item` input references `a.rows`.
#[allow(dead_code)]
pub const ITERATION_WORKFLOW_JSON: &str = r#"{
    "nodes": [
        {"id": "a", "type": "code", "data": {"label": "A", "outputs": [
            {"id": "rows", "name": "rows", "schema": {"type": "array-object", "properties": [
                {"id": "title", "name": "title", "type": "string"}
            ]}},
            {"id": "names", "name": "names", "schema": {"type": "array-string"}},
            {"id": "count", "name": "count", "schema": {"type": "integer"}}
        ]}},
        {"id": "loop", "type": "iteration", "data": {"label": "Loop", "inputs": [
            {"id": "item", "name": "item", "schema": {"type": "array-object",
                "value": {"type": "ref", "content": {"nodeId": "a", "name": "rows", "id": "rows"}}}}
        ]}},
        {"id": "loop-start", "type": "custom", "nodeType": "node-start", "parentId": "loop",
            "data": {"label": "Start", "parentId": "loop"}},
        {"id": "inner", "type": "code", "data": {"label": "Inner", "parentId": "loop"}},
        {"id": "loop-end", "type": "custom", "nodeType": "node-end", "parentId": "loop",
            "data": {"label": "End", "parentId": "loop"}}
    ],
    "edges": [
        {"source": "a", "target": "loop"},
        {"source": "loop-start", "target": "inner"},
        {"source": "inner", "target": "loop-end"}
    ]
}"#;

#[allow(dead_code)]
pub fn load_graph(json: &str) -> WorkflowGraph {
    UiWorkflow::from_json(json)
        .expect("Failed to parse workflow JSON")
        .into_workflow()
        .expect("Failed to convert workflow")
}

#[allow(dead_code)]
pub fn linear_store() -> WorkflowStore {
    WorkflowStore::new(load_graph(LINEAR_WORKFLOW_JSON))
}

#[allow(dead_code)]
pub fn iteration_store() -> WorkflowStore {
    WorkflowStore::new(load_graph(ITERATION_WORKFLOW_JSON))
}

/// A leaf or container reference entry for template tests.
#[allow(dead_code)]
pub fn entry(label: &str, param_type: ParamType, children: Vec<ReferenceEntry>) -> ReferenceEntry {
    ReferenceEntry {
        id: label.to_string(),
        label: label.to_string(),
        param_type: Some(param_type),
        node_id: "a".to_string(),
        path: label.to_string(),
        children,
    }
}

/// Everything the store reported through its hooks.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct HookLog {
    pub dirty: Vec<String>,
    pub validated: Vec<(String, bool)>,
    pub removed_edges: Vec<Edge>,
}

/// Hooks recording into a shared log the test keeps a handle to.
#[allow(dead_code)]
#[derive(Debug, Clone, Default)]
pub struct RecordingHooks(pub Rc<RefCell<HookLog>>);

impl StoreHooks for RecordingHooks {
    fn node_dirty(&mut self, node_id: &str) {
        self.0.borrow_mut().dirty.push(node_id.to_string());
    }

    fn node_validated(&mut self, node_id: &str, publishable: bool) {
        self.0
            .borrow_mut()
            .validated
            .push((node_id.to_string(), publishable));
    }

    fn edges_removed(&mut self, edges: &[Edge]) {
        self.0.borrow_mut().removed_edges.extend_from_slice(edges);
    }
}

/// A store over `json` whose hook calls are recorded.
#[allow(dead_code)]
pub fn recorded_store(json: &str) -> (WorkflowStore, Rc<RefCell<HookLog>>) {
    let hooks = RecordingHooks::default();
    let log = Rc::clone(&hooks.0);
    let store = WorkflowStore::builder(load_graph(json))
        .with_hooks(hooks)
        .build();
    (store, log)
}
