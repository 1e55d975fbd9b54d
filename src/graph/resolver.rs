use super::{Node, NodeId, ReferenceEntry, WorkflowGraph};
use crate::config::EngineConfig;
use crate::schema::{Param, SchemaTree};
use ahash::{AHashMap, AHashSet};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Computes the references visible to `node_id`.
///
/// Ancestors are collected by a breadth-first walk over incoming edges, each node
/// once, in the order it is first reached. Every ancestor becomes a root entry holding
/// its outputs. Nodes nested in an iteration node also see the iteration variables
/// exposed by the compound's start node. Unknown ids and nodes without incoming edges
/// resolve to an empty list.
pub fn resolve_references(
    node_id: &str,
    graph: &WorkflowGraph,
    config: &EngineConfig,
) -> Vec<ReferenceEntry> {
    let Some(target) = graph.node(node_id) else {
        return Vec::new();
    };

    let mut ancestors = ancestor_ids(node_id, graph);
    if let Some(start) = target
        .parent_id
        .as_deref()
        .and_then(|parent| graph.iteration_start(parent, config))
        && start.id != target.id
        && !ancestors.contains(&start.id)
    {
        ancestors.push(start.id.clone());
    }

    ancestors
        .iter()
        .filter_map(|id| graph.node(id))
        .map(|source| project_node(source, target, graph, config))
        .collect()
}

fn ancestor_ids(node_id: &str, graph: &WorkflowGraph) -> Vec<NodeId> {
    let mut visited: AHashSet<&str> = AHashSet::from_iter([node_id]);
    let mut order = Vec::new();
    let mut queue = VecDeque::from([node_id]);
    while let Some(current) = queue.pop_front() {
        for edge in graph.incoming(current) {
            if visited.insert(edge.source.as_str()) {
                order.push(edge.source.clone());
                queue.push_back(edge.source.as_str());
            }
        }
    }
    order
}

fn project_node(
    source: &Node,
    target: &Node,
    graph: &WorkflowGraph,
    config: &EngineConfig,
) -> ReferenceEntry {
    let arrays_only = target.is_iteration(config);
    let mut children: Vec<ReferenceEntry> = source
        .outputs
        .root_params()
        .filter(|p| !arrays_only || p.param_type().is_array())
        .map(|p| project_param(&source.outputs, p, &source.id))
        .collect();

    let exposes_errors = source
        .retry_config
        .as_ref()
        .is_some_and(|r| r.exposes_error_outputs());
    if exposes_errors && !arrays_only {
        children.extend(config.error_outputs.iter().map(|out| ReferenceEntry {
            id: format!("{}::{}", source.id, out.name),
            label: out.name.clone(),
            param_type: Some(out.param_type),
            node_id: source.id.clone(),
            path: out.name.clone(),
            children: Vec::new(),
        }));
    }

    // Iteration variables are labelled after the compound node that owns them.
    let label = match source.parent_id.as_deref() {
        Some(parent) if source.node_type == config.iteration_start_node_type => graph
            .node(parent)
            .map(|p| p.label.clone())
            .unwrap_or_else(|| source.label.clone()),
        _ => source.label.clone(),
    };

    ReferenceEntry {
        id: source.id.clone(),
        label,
        param_type: None,
        node_id: source.id.clone(),
        path: String::new(),
        children,
    }
}

fn project_param(tree: &SchemaTree, param: &Param, node_id: &str) -> ReferenceEntry {
    ReferenceEntry {
        id: param.id.clone(),
        label: param.name.clone(),
        param_type: Some(param.param_type()),
        node_id: node_id.to_string(),
        path: tree.reference_path(&param.id).unwrap_or_default(),
        children: tree
            .visible_children(&param.id)
            .into_iter()
            .map(|child| project_param(tree, child, node_id))
            .collect(),
    }
}

/// Memoizes [`resolve_references`] per node, keyed on the graph revision.
#[derive(Debug, Default)]
pub struct ReferenceResolver {
    cache: AHashMap<NodeId, (u64, Arc<Vec<ReferenceEntry>>)>,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(
        &mut self,
        node_id: &str,
        graph: &WorkflowGraph,
        config: &EngineConfig,
    ) -> Arc<Vec<ReferenceEntry>> {
        if let Some((revision, entries)) = self.cache.get(node_id)
            && *revision == graph.revision()
        {
            return Arc::clone(entries);
        }
        debug!(node_id, revision = graph.revision(), "resolving references");
        let entries = Arc::new(resolve_references(node_id, graph, config));
        self.cache.insert(
            node_id.to_string(),
            (graph.revision(), Arc::clone(&entries)),
        );
        entries
    }

    /// Drops the memoized references of a node that left the graph.
    pub fn evict(&mut self, node_id: &str) {
        self.cache.remove(node_id);
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    #[cfg(test)]
    pub(crate) fn cache_holds(&self, node_id: &str) -> bool {
        self.cache.contains_key(node_id)
    }
}
