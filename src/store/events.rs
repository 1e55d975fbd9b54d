use crate::config::EngineConfig;
use crate::graph::{NodeId, WorkflowGraph};
use crate::schema::{Param, ParamId, ParamType, SchemaTree};
use serde_json::json;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputChange {
    Added(ParamId),
    Removed(ParamId),
    Updated(ParamId),
}

/// A change to the top-level outputs of an iteration node. Positions index the root
/// outputs as they were before the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChange {
    Added,
    Removed { position: usize },
    Renamed { position: usize, name: String },
}

/// Structured notification emitted by the store after a schema mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaEvent {
    /// The inputs of an iteration node changed.
    InputsChanged { node_id: NodeId, change: InputChange },
    /// The top-level outputs of an iteration node changed.
    OutputsChanged { node_id: NodeId, change: OutputChange },
}

/// Reacts to schema events by adjusting other nodes of the graph.
///
/// Observers run synchronously inside the triggering mutation and return the ids of
/// the nodes they changed, which the store then marks dirty and re-validates.
pub trait SchemaObserver {
    fn on_event(
        &mut self,
        graph: &mut WorkflowGraph,
        config: &EngineConfig,
        event: &SchemaEvent,
    ) -> Vec<NodeId>;
}

/// Keeps the nested start and end nodes of an iteration node aligned with it.
///
/// The start node's outputs follow the iteration's inputs (same ids, names and order,
/// each typed as one array element). The end node's inputs follow the iteration's
/// outputs by position.
#[derive(Debug, Default, Clone, Copy)]
pub struct IterationMirror;

impl SchemaObserver for IterationMirror {
    fn on_event(
        &mut self,
        graph: &mut WorkflowGraph,
        config: &EngineConfig,
        event: &SchemaEvent,
    ) -> Vec<NodeId> {
        let changed = match event {
            SchemaEvent::InputsChanged { node_id, .. } => mirror_iteration_inputs(graph, config, node_id),
            SchemaEvent::OutputsChanged { node_id, change } => {
                mirror_iteration_outputs(graph, config, node_id, change)
            }
        };
        changed.into_iter().collect()
    }
}

/// Rewrites the start node outputs of iteration `compound_id`. Returns the start node id.
pub fn mirror_iteration_inputs(
    graph: &mut WorkflowGraph,
    config: &EngineConfig,
    compound_id: &str,
) -> Option<NodeId> {
    let compound = graph.node(compound_id)?;
    if !compound.is_iteration(config) {
        return None;
    }
    let start_id = graph.iteration_start(compound_id, config)?.id.clone();

    let mut outputs = SchemaTree::new();
    for input in compound.inputs.root_params() {
        let element_type = input.param_type().element_type();
        let mut param = Param::with_id(input.id.clone(), input.name.clone(), element_type);
        param.default = json!("");
        let root_id = outputs.push_root(param);

        // Object items expose the fields of the referenced array element.
        if element_type == ParamType::Object
            && let Some(target) = input.value.as_ref().and_then(|v| v.as_ref_target())
            && let Some(source) = graph.node(&target.node_id)
            && let Some(array) = source.outputs.find_by_reference_path(&target.name)
            && let Some(element) = source.outputs.element_of(&array.id)
        {
            outputs.graft(&root_id, &source.outputs, &element.id, &root_id);
        }
    }

    let start = graph.node_mut(&start_id)?;
    start.outputs = outputs;
    debug!(
        compound_id,
        start_id = %start.id,
        outputs = start.outputs.roots().len(),
        "mirrored iteration inputs"
    );
    Some(start_id)
}

/// Applies an output change of iteration `compound_id` to the inputs of its end node.
/// Returns the end node id when something changed.
pub fn mirror_iteration_outputs(
    graph: &mut WorkflowGraph,
    config: &EngineConfig,
    compound_id: &str,
    change: &OutputChange,
) -> Option<NodeId> {
    if !graph.node(compound_id)?.is_iteration(config) {
        return None;
    }
    let end_id = graph.iteration_end(compound_id, config)?.id.clone();
    let inputs = &graph.node(&end_id)?.inputs;
    let at = |position: usize| inputs.roots().get(position).cloned();

    match change {
        OutputChange::Added => {
            let end = graph.node_mut(&end_id)?;
            end.inputs.push_root(Param::input(""));
        }
        OutputChange::Removed { position } => {
            let param_id = at(*position)?;
            let end = graph.node_mut(&end_id)?;
            end.inputs.remove(&param_id).ok()?;
        }
        OutputChange::Renamed { position, name } => {
            let param_id = at(*position)?;
            let end = graph.node_mut(&end_id)?;
            end.inputs.get_mut(&param_id)?.name = name.clone();
        }
    }
    debug!(compound_id, end_id = %end_id, ?change, "mirrored iteration outputs");
    Some(end_id)
}
