//! The workflow graph: nodes with their schema trees, and the directed edges that
//! define which upstream outputs a node may reference.

pub mod conversion;
mod reference;
mod resolver;

pub use conversion::{IntoWorkflow, UiEdge, UiNode, UiNodeData, UiParam, UiWorkflow};
pub use reference::{DisplayReferences, ReferenceEntry, find_entry, lookup, path_to};
pub use resolver::{ReferenceResolver, resolve_references};

use crate::branch::Case;
use crate::config::EngineConfig;
use crate::schema::SchemaTree;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;

pub type NodeId = String;

/// Which schema tree of a node an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Inputs,
    Outputs,
}

/// Failure handling of a node. With `error_strategy` 1 the node emits
/// `custom_output` on failure; with 1 or 2 it also exposes error outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    pub should_retry: bool,
    pub error_strategy: u8,
    /// JSON text shaped like the node's outputs.
    pub custom_output: String,
    #[serde(rename = "customOutputErrMsg", skip_serializing_if = "Option::is_none")]
    pub custom_output_err_msg: Option<String>,
}

impl RetryConfig {
    /// Error strategies 1 (custom output) and 2 (error branch) expose error outputs.
    pub fn exposes_error_outputs(&self) -> bool {
        self.should_retry && matches!(self.error_strategy, 1 | 2)
    }
}

/// Node-type specific configuration. Keys this crate does not model are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeParam {
    pub cases: Option<Vec<Case>>,
    pub template: Option<String>,
    pub template_err_msg: Option<String>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub node_type: String,
    pub label: String,
    /// Set on nodes nested inside a compound (iteration) node.
    pub parent_id: Option<NodeId>,
    pub inputs: SchemaTree,
    pub outputs: SchemaTree,
    pub node_param: NodeParam,
    pub retry_config: Option<RetryConfig>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            label: label.into(),
            parent_id: None,
            inputs: SchemaTree::new(),
            outputs: SchemaTree::new(),
            node_param: NodeParam::default(),
            retry_config: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<NodeId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn tree(&self, side: Side) -> &SchemaTree {
        match side {
            Side::Inputs => &self.inputs,
            Side::Outputs => &self.outputs,
        }
    }

    pub fn tree_mut(&mut self, side: Side) -> &mut SchemaTree {
        match side {
            Side::Inputs => &mut self.inputs,
            Side::Outputs => &mut self.outputs,
        }
    }

    /// Which tree holds `param_id`, if any.
    pub fn side_of(&self, param_id: &str) -> Option<Side> {
        if self.inputs.contains(param_id) {
            Some(Side::Inputs)
        } else if self.outputs.contains(param_id) {
            Some(Side::Outputs)
        } else {
            None
        }
    }

    pub fn is_iteration(&self, config: &EngineConfig) -> bool {
        self.node_type == config.iteration_node_type
    }

    pub fn is_branch(&self) -> bool {
        self.node_param.cases.is_some()
    }

    /// True when the last validation left no message on any field of this node.
    pub fn is_publishable(&self) -> bool {
        crate::validation::is_publishable(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }
}

/// Nodes and edges in display order, plus a revision counter bumped by every
/// mutable access. Reference resolution is memoized against the revision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    revision: u64,
}

impl WorkflowGraph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            nodes,
            edges,
            revision: 0,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        let node = self.nodes.iter_mut().find(|n| n.id == id)?;
        self.revision += 1;
        Some(node)
    }

    /// Mutable access for validation state, which does not affect references and
    /// therefore leaves the revision untouched.
    pub(crate) fn node_state_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Marks the graph as changed after nodes were edited through `node_state_mut`.
    pub(crate) fn bump_revision(&mut self) {
        self.revision += 1;
    }

    /// Replaces the whole content with `snapshot` while keeping the revision increasing.
    pub(crate) fn restore(&mut self, snapshot: WorkflowGraph) {
        let revision = self.revision.max(snapshot.revision) + 1;
        *self = snapshot;
        self.revision = revision;
    }

    pub(crate) fn push_node(&mut self, node: Node) {
        self.revision += 1;
        self.nodes.push(node);
    }

    /// Removes a node together with every edge touching it.
    pub(crate) fn remove_node(&mut self, id: &str) -> Option<(Node, Vec<Edge>)> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        let node = self.nodes.remove(index);
        let edges = self.remove_edges_where(|e| e.source == id || e.target == id);
        self.revision += 1;
        Some((node, edges))
    }

    pub(crate) fn push_edge(&mut self, edge: Edge) {
        self.revision += 1;
        self.edges.push(edge);
    }

    pub(crate) fn remove_edges_where<F>(&mut self, predicate: F) -> Vec<Edge>
    where
        F: Fn(&Edge) -> bool,
    {
        let (removed, kept): (Vec<Edge>, Vec<Edge>) =
            self.edges.drain(..).partition(|e| predicate(e));
        self.edges = kept;
        if !removed.is_empty() {
            self.revision += 1;
        }
        removed
    }

    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }

    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// Direct upstream nodes, each once, in edge order.
    pub fn parent_nodes(&self, id: &str) -> Vec<&Node> {
        let mut seen = AHashSet::new();
        self.incoming(id)
            .filter(|e| seen.insert(e.source.as_str()))
            .filter_map(|e| self.node(&e.source))
            .collect()
    }

    /// Direct downstream nodes, each once, in edge order.
    pub fn child_nodes(&self, id: &str) -> Vec<&Node> {
        let mut seen = AHashSet::new();
        self.outgoing(id)
            .filter(|e| seen.insert(e.target.as_str()))
            .filter_map(|e| self.node(&e.target))
            .collect()
    }

    /// Every node reachable downstream of `id`, excluding `id` itself.
    pub fn descendants(&self, id: &str) -> Vec<NodeId> {
        let mut seen: AHashSet<&str> = AHashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([id]);
        seen.insert(id);
        while let Some(current) = queue.pop_front() {
            for edge in self.outgoing(current) {
                if seen.insert(edge.target.as_str()) {
                    order.push(edge.target.clone());
                    queue.push_back(edge.target.as_str());
                }
            }
        }
        order
    }

    /// The start node nested inside a compound iteration node.
    pub fn iteration_start(&self, compound_id: &str, config: &EngineConfig) -> Option<&Node> {
        self.nested(compound_id, &config.iteration_start_node_type)
    }

    /// The end node nested inside a compound iteration node.
    pub fn iteration_end(&self, compound_id: &str, config: &EngineConfig) -> Option<&Node> {
        self.nested(compound_id, &config.iteration_end_node_type)
    }

    fn nested(&self, compound_id: &str, node_type: &str) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| n.parent_id.as_deref() == Some(compound_id) && n.node_type == node_type)
    }
}
