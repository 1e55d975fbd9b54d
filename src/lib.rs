//! # flowref - Variable References and Template Editing for Workflow Builders
//!
//! **flowref** is the engine behind a node-graph workflow editor's variable handling. It
//! decides which upstream outputs a node may reference, keeps every node's recursive
//! input/output schema consistent while it is edited, models multi-case "if / else-if /
//! else" branch nodes, and drives live autocomplete for `{{path.to.value}}` tokens typed
//! into free-form templates.
//!
//! ## Core Workflow
//!
//! 1.  **Load the Workflow**: Parse the console's JSON into a [`graph::UiWorkflow`] (or
//!     your own format) and turn it into a [`graph::WorkflowGraph`] through the
//!     [`graph::IntoWorkflow`] trait.
//! 2.  **Open a Store**: Use `WorkflowStore::builder` to create the editing session. The
//!     store is the single record of truth; every edit goes through it and re-validates
//!     the affected nodes.
//! 3.  **Edit**: Change params, bind references, manage branch cases and undo mistakes.
//!     Validation problems are stored on the affected fields, never raised as errors.
//! 4.  **Autocomplete**: Feed a node's reference tree to a [`template::TemplateEditor`]
//!     and react to its [`template::AutocompleteState`] on every keystroke.
//!
//! ## Quick Start
//!
//! ```rust
//! use flowref::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let json = r#"{
//!         "nodes": [
//!             {"id": "a", "type": "code", "data": {"label": "A", "outputs": [
//!                 {"id": "result", "name": "result", "schema": {"type": "object", "properties": [
//!                     {"id": "score", "name": "score", "type": "number"}
//!                 ]}}
//!             ]}},
//!             {"id": "b", "type": "message", "data": {"label": "B", "inputs": [
//!                 {"id": "in", "name": "result", "schema": {"type": "string",
//!                     "value": {"type": "ref", "content": {}}}}
//!             ]}}
//!         ],
//!         "edges": [{"source": "a", "target": "b"}]
//!     }"#;
//!
//!     let graph = UiWorkflow::from_json(json)?.into_workflow()?;
//!     let mut store = WorkflowStore::builder(graph).build();
//!
//!     // Point B's input at A's `result` output.
//!     store.bind_ref("b", "in", "a", "result")?;
//!
//!     // Offer B's inputs, expanded through their references, while typing.
//!     let references = store.references("b");
//!     let node = store.node("b").ok_or("missing node")?;
//!     let options = input_options(&node.inputs, &references);
//!
//!     let mut editor = TemplateEditor::new("Score: ", options);
//!     editor.type_str("{{result.")?;
//!     assert_eq!(editor.state().candidate_labels(), vec!["score"]);
//!
//!     editor.accept("score")?;
//!     assert_eq!(editor.serialize(), "Score: {{result.score}}");
//!
//!     store.set_template("b", editor.serialize())?;
//!     assert!(store.is_publishable());
//!     Ok(())
//! }
//! ```

pub mod branch;
pub mod config;
pub mod error;
pub mod graph;
pub mod prelude;
pub mod schema;
pub mod store;
pub mod template;
pub mod validation;
