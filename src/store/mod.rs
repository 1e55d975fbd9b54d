//! The in-memory workflow store: the single record of truth during an editing
//! session. Every mutation goes through a `WorkflowStore` method, which marks the
//! node dirty, notifies observers and hooks, and re-validates the node.

mod events;
mod history;
mod params;

pub use events::{
    InputChange, IterationMirror, OutputChange, SchemaEvent, SchemaObserver, mirror_iteration_inputs,
    mirror_iteration_outputs,
};
pub use history::{History, Snapshot};

use crate::branch::BranchEditor;
use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::graph::{Edge, Node, NodeId, RetryConfig, ReferenceEntry, ReferenceResolver, Side, WorkflowGraph};
use crate::schema::custom_output;
use crate::validation;
use ahash::AHashSet;
use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Callbacks into the surrounding application.
pub trait StoreHooks {
    /// A node changed and should be persisted.
    fn node_dirty(&mut self, _node_id: &str) {}
    /// A node was validated; `publishable` is false while any field error remains.
    fn node_validated(&mut self, _node_id: &str, _publishable: bool) {}
    /// Edges were removed as a side effect of another edit.
    fn edges_removed(&mut self, _edges: &[Edge]) {}
}

/// Hooks that ignore every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl StoreHooks for NoopHooks {}

/// Builder for `WorkflowStore`. The `IterationMirror` observer is registered by default.
pub struct StoreBuilder {
    graph: WorkflowGraph,
    config: EngineConfig,
    hooks: Box<dyn StoreHooks>,
    observers: Vec<Box<dyn SchemaObserver>>,
}

impl StoreBuilder {
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_hooks(mut self, hooks: impl StoreHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn with_observer(mut self, observer: impl SchemaObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Builds the store and validates every node once.
    pub fn build(self) -> WorkflowStore {
        let mut store = WorkflowStore {
            history: History::new(self.config.max_history),
            graph: self.graph,
            config: self.config,
            dirty: AHashSet::new(),
            hooks: self.hooks,
            observers: self.observers,
            resolver: ReferenceResolver::new(),
        };
        store.validate_all();
        store
    }
}

pub struct WorkflowStore {
    pub(crate) graph: WorkflowGraph,
    pub(crate) config: EngineConfig,
    pub(crate) history: History,
    pub(crate) dirty: AHashSet<NodeId>,
    pub(crate) hooks: Box<dyn StoreHooks>,
    pub(crate) observers: Vec<Box<dyn SchemaObserver>>,
    pub(crate) resolver: ReferenceResolver,
}

impl WorkflowStore {
    pub fn builder(graph: WorkflowGraph) -> StoreBuilder {
        StoreBuilder {
            graph,
            config: EngineConfig::default(),
            hooks: Box::new(NoopHooks),
            observers: vec![Box::new(IterationMirror)],
        }
    }

    pub fn new(graph: WorkflowGraph) -> Self {
        Self::builder(graph).build()
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.graph.node(node_id)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// References visible to `node_id`, memoized until the graph changes.
    pub fn references(&mut self, node_id: &str) -> Arc<Vec<ReferenceEntry>> {
        self.resolver.resolve(node_id, &self.graph, &self.config)
    }

    /// Opens the branch editor of a node holding cases.
    pub fn branch(&mut self, node_id: &str) -> Result<BranchEditor<'_>, StoreError> {
        let node = self.require_node(node_id)?;
        if !node.is_branch() {
            return Err(StoreError::NotABranchNode(node_id.to_string()));
        }
        Ok(BranchEditor::new(self, node_id))
    }

    pub fn is_dirty(&self, node_id: &str) -> bool {
        self.dirty.contains(node_id)
    }

    /// Drains the set of nodes changed since the last call, in sorted order.
    pub fn take_dirty(&mut self) -> Vec<NodeId> {
        self.dirty.drain().sorted().collect()
    }

    /// Reverts the most recent undoable edit. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.pop() else {
            return false;
        };
        let changed: Vec<NodeId> = snapshot
            .graph
            .nodes()
            .iter()
            .filter(|n| self.graph.node(&n.id) != Some(n))
            .map(|n| n.id.clone())
            .chain(
                self.graph
                    .nodes()
                    .iter()
                    .filter(|n| snapshot.graph.node(&n.id).is_none())
                    .map(|n| n.id.clone()),
            )
            .collect();
        info!(label = snapshot.label, changed = changed.len(), "undo");
        self.graph.restore(snapshot.graph);
        for node_id in &changed {
            self.mark_dirty(node_id);
        }
        self.validate_all();
        true
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.snapshot("add node");
        let node_id = node.id.clone();
        self.graph.push_node(node);
        debug!(node_id = %node_id, "added node");
        self.commit(&node_id, Vec::new());
        node_id
    }

    /// Removes a node and its edges. References held by downstream nodes are kept
    /// and reported as missing by validation.
    pub fn remove_node(&mut self, node_id: &str) -> Result<Node, StoreError> {
        self.require_node(node_id)?;
        let downstream = self.graph.descendants(node_id);
        self.snapshot("remove node");
        let (node, edges) = self
            .graph
            .remove_node(node_id)
            .ok_or_else(|| StoreError::NodeNotFound(node_id.to_string()))?;
        self.dirty.remove(node_id);
        self.resolver.evict(node_id);
        if !edges.is_empty() {
            self.hooks.edges_removed(&edges);
        }
        debug!(node_id, edges = edges.len(), "removed node");
        for id in &downstream {
            self.validate_node(id);
        }
        Ok(node)
    }

    pub fn connect(&mut self, edge: Edge) -> Result<(), StoreError> {
        self.require_node(&edge.source)?;
        self.require_node(&edge.target)?;
        self.snapshot("connect");
        let target = edge.target.clone();
        debug!(source = %edge.source, target = %target, "connected nodes");
        self.graph.push_edge(edge);
        self.validate_downstream(&target);
        Ok(())
    }

    /// Removes every edge from `source` to `target`. Existing references are kept.
    pub fn disconnect(&mut self, source: &str, target: &str) -> Vec<Edge> {
        let exists = self
            .graph
            .edges()
            .iter()
            .any(|e| e.source == source && e.target == target);
        if !exists {
            warn!(source, target, "no edge to disconnect");
            return Vec::new();
        }
        self.snapshot("disconnect");
        let removed = self
            .graph
            .remove_edges_where(|e| e.source == source && e.target == target);
        self.hooks.edges_removed(&removed);
        self.validate_downstream(target);
        removed
    }

    pub fn set_template(&mut self, node_id: &str, template: impl Into<String>) -> Result<(), StoreError> {
        let node = self.node_mut(node_id)?;
        node.node_param.template = Some(template.into());
        self.commit(node_id, Vec::new());
        Ok(())
    }

    pub fn set_retry_config(
        &mut self,
        node_id: &str,
        retry_config: Option<RetryConfig>,
    ) -> Result<(), StoreError> {
        let node = self.node_mut(node_id)?;
        node.retry_config = retry_config;
        self.commit(node_id, Vec::new());
        // Error outputs appear or disappear for every downstream node.
        for id in self.graph.descendants(node_id) {
            self.validate_node(&id);
        }
        Ok(())
    }

    /// Regenerates the retry custom output from the current outputs tree, keeping
    /// previously entered values where the structure still matches.
    pub fn refresh_custom_output(&mut self, node_id: &str) -> Result<(), StoreError> {
        let node = self.node_mut(node_id)?;
        refresh_custom_output_of(node);
        self.commit(node_id, Vec::new());
        Ok(())
    }

    /// Re-validates one node and returns whether it is publishable.
    pub fn validate(&mut self, node_id: &str) -> Result<bool, StoreError> {
        self.require_node(node_id)?;
        Ok(self.validate_node(node_id))
    }

    /// Re-validates every node and returns whether the whole workflow is publishable.
    pub fn validate_all(&mut self) -> bool {
        let ids: Vec<NodeId> = self.graph.nodes().iter().map(|n| n.id.clone()).collect();
        ids.iter()
            .map(|id| self.validate_node(id))
            .fold(true, |acc, ok| acc && ok)
    }

    /// True when no node carries a validation error.
    pub fn is_publishable(&self) -> bool {
        self.graph.nodes().iter().all(Node::is_publishable)
    }

    pub(crate) fn require_node(&self, node_id: &str) -> Result<&Node, StoreError> {
        self.graph.node(node_id).ok_or_else(|| {
            warn!(node_id, "unknown node");
            StoreError::NodeNotFound(node_id.to_string())
        })
    }

    pub(crate) fn node_mut(&mut self, node_id: &str) -> Result<&mut Node, StoreError> {
        self.graph.node_mut(node_id).ok_or_else(|| {
            warn!(node_id, "unknown node");
            StoreError::NodeNotFound(node_id.to_string())
        })
    }

    pub(crate) fn snapshot(&mut self, label: &'static str) {
        self.history.push(label, self.graph.clone());
    }

    /// Drops the most recent snapshot when the edit it guarded turned out to be a no-op.
    pub(crate) fn discard_snapshot(&mut self) {
        self.history.pop();
    }

    pub(crate) fn mark_dirty(&mut self, node_id: &str) {
        self.dirty.insert(node_id.to_string());
        self.hooks.node_dirty(node_id);
    }

    fn is_iteration(&self, node_id: &str) -> bool {
        self.graph
            .node(node_id)
            .is_some_and(|n| n.is_iteration(&self.config))
    }

    /// The event to emit after an input change on `node_id`, if it is an iteration node.
    pub(crate) fn input_events(&self, node_id: &str, side: Side, change: InputChange) -> Vec<SchemaEvent> {
        if side == Side::Inputs && self.is_iteration(node_id) {
            vec![SchemaEvent::InputsChanged {
                node_id: node_id.to_string(),
                change,
            }]
        } else {
            Vec::new()
        }
    }

    /// The event to emit after a top-level output change on `node_id`, if it is an
    /// iteration node.
    pub(crate) fn output_events(&self, node_id: &str, change: OutputChange) -> Vec<SchemaEvent> {
        if self.is_iteration(node_id) {
            vec![SchemaEvent::OutputsChanged {
                node_id: node_id.to_string(),
                change,
            }]
        } else {
            Vec::new()
        }
    }

    /// Finishes a mutation of `node_id`: marks it dirty, runs observers for `events`
    /// and re-validates every touched node.
    pub(crate) fn commit(&mut self, node_id: &str, events: Vec<SchemaEvent>) {
        self.mark_dirty(node_id);
        let mut touched = Vec::new();
        for event in &events {
            for observer in self.observers.iter_mut() {
                touched.extend(observer.on_event(&mut self.graph, &self.config, event));
            }
        }
        self.validate_node(node_id);
        for id in touched.into_iter().unique() {
            self.mark_dirty(&id);
            self.validate_downstream(&id);
        }
    }

    pub(crate) fn validate_node(&mut self, node_id: &str) -> bool {
        let references = self.resolver.resolve(node_id, &self.graph, &self.config);
        let Some(node) = self.graph.node_state_mut(node_id) else {
            return false;
        };
        let publishable = validation::validate_node(node, &references, &self.config);
        self.hooks.node_validated(node_id, publishable);
        publishable
    }

    /// Validates `node_id` and every node downstream of it.
    pub(crate) fn validate_downstream(&mut self, node_id: &str) {
        self.validate_node(node_id);
        for id in self.graph.descendants(node_id) {
            self.validate_node(&id);
        }
    }
}

/// Rewrites `retry_config.custom_output` from the outputs tree when the node uses
/// the custom output strategy.
pub(crate) fn refresh_custom_output_of(node: &mut Node) {
    let Some(retry) = node.retry_config.as_mut() else {
        return;
    };
    if retry.error_strategy != 1 {
        return;
    }
    let old = serde_json::from_str(&retry.custom_output).unwrap_or(serde_json::Value::Null);
    let updated = custom_output::generate_or_update(&node.outputs, &old);
    if let Ok(text) = serde_json::to_string_pretty(&updated) {
        retry.custom_output = text;
    }
}
