//! Multi-case branch ("if / else-if / else") nodes.
//!
//! A branch node stores its cases in `nodeParam.cases`. Each condition compares two
//! operand params allocated in the node's own inputs, so operands can be literals or
//! references like any other input. The last case always carries the else level.

mod case;
mod editor;
pub mod evaluate;

pub use case::{CASE_ID_PREFIX, Case, CompareOperator, Condition, LogicalOperator, renumber};
pub use editor::{BranchEditor, Operand};
pub use evaluate::{BranchOutcome, evaluate};

use crate::config::EngineConfig;
use crate::graph::{Node, NodeId};
use crate::schema::Param;

/// Creates a branch node holding one `if` case with a single empty condition and
/// the trailing else-case.
pub fn new_branch_node(
    id: impl Into<NodeId>,
    node_type: impl Into<String>,
    label: impl Into<String>,
    config: &EngineConfig,
) -> Node {
    let mut node = Node::new(id, node_type, label);
    let mut operand = || {
        let name = format!("{}{}", config.input_name_prefix, uuid::Uuid::new_v4().simple());
        node.inputs.push_root(Param::input(name))
    };
    let left = operand();
    let right = operand();
    node.node_param.cases = Some(vec![
        Case::new(1, vec![Condition::new(left, right)]),
        Case::new(config.else_level, Vec::new()),
    ]);
    node
}
