//! Prelude module for convenient imports
//!
//! Re-exports the types most editing sessions need, so a single
//! `use flowref::prelude::*;` covers loading a workflow, editing it through the store
//! and driving template autocomplete.
//!
//! # Example
//!
//! ```rust,no_run
//! use flowref::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/workflow.json")?;
//! let graph = UiWorkflow::from_json(&json)?.into_workflow()?;
//! let mut store = WorkflowStore::new(graph);
//!
//! for entry in store.references("node-2").iter() {
//!     println!("{}", entry.label);
//! }
//! # Ok(())
//! # }
//! ```

// Configuration
pub use crate::config::EngineConfig;

// Graph model and conversion
pub use crate::graph::{
    DisplayReferences, Edge, IntoWorkflow, Node, NodeId, ReferenceEntry, Side, UiWorkflow,
    WorkflowGraph,
};

// Schema trees
pub use crate::schema::{Param, ParamId, ParamType, RefTarget, SchemaTree, ValueSource};

// Editing session
pub use crate::store::{StoreHooks, WorkflowStore};

// Branch nodes
pub use crate::branch::{Case, CompareOperator, Condition, LogicalOperator, Operand};

// Templates
pub use crate::template::{AutocompleteState, TemplateEditor, input_options, on_cursor_move};

// Error types
pub use crate::error::{ConversionError, StoreError, TemplateError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
